//! Outbound sentence transport abstraction.
//!
//! The core never touches a socket. Completed sentences are handed to a
//! [`SentenceSink`], implemented by the server (event channel, UDP) or by
//! a test double.

use core::fmt;

/// I/O error type for sentence delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoError {
    /// Error code (platform specific, negative for OS errors)
    pub code: i32,
    /// Human-readable error message
    pub message: String,
}

impl IoError {
    /// Create a new I/O error with a code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a "would block" error (socket buffer full, non-blocking).
    pub fn would_block() -> Self {
        Self::new(-11, "Operation would block")
    }

    /// Check if this is a "would block" error.
    pub fn is_would_block(&self) -> bool {
        self.code == -11
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::WouldBlock {
            return IoError::would_block();
        }
        IoError::new(e.raw_os_error().map(|c| -c).unwrap_or(-1), e.to_string())
    }
}

/// Destination for completed NMEA 0183 sentences.
pub trait SentenceSink {
    /// Deliver one sentence, including its `*hh` checksum suffix.
    fn send(&mut self, sentence: &str) -> Result<(), IoError>;
}

/// Collects sentences in memory. Useful for tests and dry runs.
impl SentenceSink for Vec<String> {
    fn send(&mut self, sentence: &str) -> Result<(), IoError> {
        self.push(sentence.to_string());
        Ok(())
    }
}
