//! NMEA 0183 sentence encoding
//!
//! Builds the six autopilot sentences (APB, BOD, BWC, BWR, HSC, XTE) that
//! steer a downstream autopilot computer toward the commanded heading.
//!
//! Sentence format: `$<talker><type>,<field>,<field>...*hh` where `hh` is the
//! XOR of every byte between `$` and `*`, as two uppercase hex digits.
//!
//! Only heading and bearing fields carry live data. Distances, cross-track
//! error and waypoint ids are fixed placeholders: there is no route here,
//! just a heading to hold.

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::angle::format_degrees;
use crate::heading::HeadingReference;

const HEX_DIGITS: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F',
];

/// Default talker id ("MA" - autopilot, magnetic)
pub const DEFAULT_TALKER: &str = "MA";

/// Placeholder cross-track error magnitude
const XTE_MAGNITUDE: &str = "0.0000";
/// Placeholder waypoint id
const WAYPOINT_ID: &str = "999";
/// Placeholder UTC time for BWC/BWR
const FIX_TIME: &str = "192339.00";

// =============================================================================
// Sentence Types
// =============================================================================

/// Sentence types emitted on every broadcast cycle, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum SentenceType {
    /// Heading/track controller (autopilot) sentence B
    Apb,
    /// Bearing, origin to destination
    Bod,
    /// Bearing and distance to waypoint, great circle
    Bwc,
    /// Bearing and distance to waypoint, rhumb line
    Bwr,
    /// Heading steering command
    Hsc,
    /// Cross-track error, measured
    Xte,
}

/// Direction to steer to reach the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    /// Direction from target and measured heading, both in degrees.
    ///
    /// A target below the measured heading gives `R`, anything else `L`.
    /// Without a measured heading the difference is undefined and `L` is used.
    pub fn from_headings(target_degs: f64, measured_degs: Option<f64>) -> Self {
        match measured_degs {
            Some(measured) if target_degs - measured < 0.0 => Direction::Right,
            _ => Direction::Left,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }
}

// =============================================================================
// Heading Fields
// =============================================================================

/// Live values substituted into the sentence templates.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingFields {
    /// Target heading true, degrees
    pub degs_true: Option<f64>,
    /// Target heading magnetic, degrees
    pub degs_magnetic: Option<f64>,
    /// Reference used for the single-heading slots of APB
    pub primary: HeadingReference,
    /// Direction to steer
    pub direction: Direction,
}

impl HeadingFields {
    /// Select the primary reference and steering direction.
    ///
    /// True is preferred, magnetic is the fallback. Returns `None` when there
    /// is no target at all. `measured_*` are the current headings in degrees.
    pub fn select(
        degs_true: Option<f64>,
        degs_magnetic: Option<f64>,
        measured_true: Option<f64>,
        measured_magnetic: Option<f64>,
    ) -> Option<Self> {
        let (primary, degs, measured) = match (degs_true, degs_magnetic) {
            (Some(t), _) => (HeadingReference::True, t, measured_true),
            (None, Some(m)) => (HeadingReference::Magnetic, m, measured_magnetic),
            (None, None) => return None,
        };
        Some(HeadingFields {
            degs_true,
            degs_magnetic,
            primary,
            direction: Direction::from_headings(degs, measured),
        })
    }

    fn primary_degs(&self) -> f64 {
        let degs = match self.primary {
            HeadingReference::True => self.degs_true,
            HeadingReference::Magnetic => self.degs_magnetic,
        };
        degs.unwrap_or_default()
    }

    /// Field values for one sentence type, pre-formatted.
    pub fn fields(&self, sentence: SentenceType) -> Vec<String> {
        let degs = format_degrees(self.primary_degs());
        let kind = self.primary.letter().to_string();
        let degs_t = self.degs_true.map(format_degrees).unwrap_or_default();
        let degs_m = self.degs_magnetic.map(format_degrees).unwrap_or_default();
        let dir = self.direction.as_char().to_string();

        let (degs, kind, dir) = (degs.as_str(), kind.as_str(), dir.as_str());
        let (degs_t, degs_m) = (degs_t.as_str(), degs_m.as_str());

        let fields: Vec<&str> = match sentence {
            SentenceType::Apb => vec![
                "A", "A", XTE_MAGNITUDE, dir, "N", "V", "V", degs, kind, WAYPOINT_ID, degs, kind,
                degs, kind, "A",
            ],
            SentenceType::Bod => vec![degs_t, "T", degs_m, "M", WAYPOINT_ID],
            SentenceType::Bwc | SentenceType::Bwr => vec![
                FIX_TIME, "", "", "", "", degs_t, "T", degs_m, "M", "", "N", WAYPOINT_ID, "A",
            ],
            SentenceType::Hsc => vec![degs_t, "T", degs_m, "M", "C"],
            SentenceType::Xte => vec!["A", "A", XTE_MAGNITUDE, dir, "N", "A"],
        };
        fields.into_iter().map(str::to_string).collect()
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// XOR of every character after the leading `$`.
///
/// The accumulator starts at the character at index 1 and folds in the rest.
/// A body without anything after `$` has checksum 0.
pub fn checksum(body: &str) -> u8 {
    let bytes = body.as_bytes();
    match bytes.get(1) {
        Some(&first) => bytes[2..].iter().fold(first, |acc, b| acc ^ b),
        None => 0,
    }
}

/// Two uppercase hex digits, high nibble first.
pub fn to_hex(value: u8) -> [char; 2] {
    [
        HEX_DIGITS[((value >> 4) & 0x0f) as usize],
        HEX_DIGITS[(value & 0x0f) as usize],
    ]
}

/// Checksum suffix (`*hh`) for a sentence body.
pub fn checksum_suffix(body: &str) -> String {
    let [hi, lo] = to_hex(checksum(body));
    format!("*{}{}", hi, lo)
}

/// Build a complete sentence from talker, type and pre-formatted fields.
pub fn encode(talker: &str, sentence: SentenceType, fields: &[String]) -> String {
    let body = format!("${}{},{}", talker, sentence, fields.join(","));
    let suffix = checksum_suffix(&body);
    body + &suffix
}

/// Encode the full per-cycle sentence set, in emission order.
pub fn heading_sentences(talker: &str, heading: &HeadingFields) -> Vec<String> {
    SentenceType::iter()
        .map(|sentence| encode(talker, sentence, &heading.fields(sentence)))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
