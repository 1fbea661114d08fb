//! Error types for autopilot commands

use thiserror::Error;

/// Errors reported back to whoever issued an autopilot command.
///
/// None of these leave the autopilot in a changed state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AutopilotError {
    /// Requested state is not reachable from the current one (e.g. "wind", "track")
    #[error("{0} not supported")]
    InvalidStateTransition(String),

    /// Engage requested while neither a true nor a magnetic heading is known
    #[error("current heading unknown")]
    UnknownCurrentHeading,

    /// Waypoint advance, alarm silencing or an unrecognised action
    #[error("not supported")]
    UnsupportedCommand,

    /// Command value is missing or has the wrong type
    #[error("invalid value for {0}")]
    InvalidCommand(String),
}
