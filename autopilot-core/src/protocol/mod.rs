//! Wire protocol formatting
//!
//! Pure functions that turn autopilot targets into wire strings. Nothing in
//! here performs I/O; the server (or a test) decides where the sentences go.

pub mod nmea0183;

pub use nmea0183::{Direction, HeadingFields, SentenceType};
