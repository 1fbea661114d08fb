//! Heading arithmetic.
//!
//! Headings travel through the data store in radians and onto the wire in
//! degrees. These helpers are the only place the two meet.

use std::f64::consts::{PI, TAU};

/// Convert radians to degrees
pub fn rads_to_degs(radians: f64) -> f64 {
    radians * 180.0 / PI
}

/// Convert degrees to radians
pub fn degs_to_rads(degrees: f64) -> f64 {
    degrees * (PI / 180.0)
}

/// Wrap a heading in degrees back into `[0, 360)`.
///
/// Only a single correction is applied, so values more than one full turn
/// out of range stay out of range. Adjustments are small nudges from the
/// helm (typically 1 or 10 degrees) so one step is enough in practice.
pub fn wrap_degrees(degrees: f64) -> f64 {
    if degrees < 0.0 {
        degrees + 360.0
    } else if degrees >= 360.0 {
        degrees - 360.0
    } else {
        degrees
    }
}

/// Normalize a heading in radians into `[0, 2π)`.
///
/// Unlike [`wrap_degrees`] this handles any number of turns; it is applied
/// to headings read from the data store, which are not under our control.
pub fn wrap_radians(radians: f64) -> f64 {
    let wrapped = radians.rem_euclid(TAU);
    // rem_euclid rounds tiny negatives up to exactly TAU
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Format a heading in degrees the way it appears in a sentence field.
pub fn format_degrees(degrees: f64) -> String {
    format!("{:.1}", degrees)
}
