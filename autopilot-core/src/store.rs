//! Host data store interface.
//!
//! The autopilot reads measured headings from, and publishes its state and
//! targets to, a path-keyed store shaped like a SignalK vessel tree. The
//! store itself belongs to the host; this module only defines how the core
//! talks to it, plus an in-memory implementation for standalone use and
//! tests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::heading::HeadingReference;

/// Well-known data store paths
pub mod paths {
    /// Measured heading, true north, radians
    pub const HEADING_TRUE: &str = "navigation.headingTrue";
    /// Measured heading, magnetic north, radians
    pub const HEADING_MAGNETIC: &str = "navigation.headingMagnetic";
    /// Commanded target heading, true north, radians
    pub const TARGET_HEADING_TRUE: &str = "steering.autopilot.target.headingTrue";
    /// Commanded target heading, magnetic north, radians
    pub const TARGET_HEADING_MAGNETIC: &str = "steering.autopilot.target.headingMagnetic";
    /// Engagement state, "standby" or "auto"
    pub const STATE: &str = "steering.autopilot.state";
}

/// Path-keyed read / publish interface to the host data store.
pub trait DataStore {
    /// Current value at `path`, if any
    fn get(&self, path: &str) -> Option<Value>;

    /// Publish a new value at `path`
    fn publish(&mut self, path: &str, value: Value);
}

/// Measured headings in radians
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeasuredHeading {
    pub true_heading: Option<f64>,
    pub magnetic_heading: Option<f64>,
}

impl MeasuredHeading {
    pub fn is_known(&self) -> bool {
        self.true_heading.is_some() || self.magnetic_heading.is_some()
    }
}

/// Typed helpers for any [`DataStore`].
pub trait DataStoreExt: DataStore {
    fn get_f64(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(|v| v.as_f64())
    }

    fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(str::to_string))
    }

    fn measured_heading(&self) -> MeasuredHeading {
        MeasuredHeading {
            true_heading: self.get_f64(HeadingReference::True.measured_path()),
            magnetic_heading: self.get_f64(HeadingReference::Magnetic.measured_path()),
        }
    }
}

// Blanket implementation for all DataStore types
impl<T: DataStore + ?Sized> DataStoreExt for T {}

// =============================================================================
// SignalK Delta
// =============================================================================

/// A single path/value pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathValue {
    pub path: String,
    pub value: Value,
}

/// One update within a delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub values: Vec<PathValue>,
}

/// SignalK delta message: `{"updates":[{"values":[{"path":...,"value":...}]}]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub updates: Vec<Update>,
}

impl Delta {
    /// All path/value pairs across all updates
    pub fn values(&self) -> impl Iterator<Item = &PathValue> {
        self.updates.iter().flat_map(|u| u.values.iter())
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// HashMap-backed [`DataStore`].
///
/// A `null` value removes the path, matching how a SignalK source retracts
/// a value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every value in a delta, in order. Returns the number of paths touched.
    pub fn apply_delta(&mut self, delta: &Delta) -> usize {
        let mut count = 0;
        for pv in delta.values() {
            self.publish(&pv.path, pv.value.clone());
            count += 1;
        }
        count
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        self.values.remove(path)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl DataStore for MemoryStore {
    fn get(&self, path: &str) -> Option<Value> {
        self.values.get(path).cloned()
    }

    fn publish(&mut self, path: &str, value: Value) {
        if value.is_null() {
            self.values.remove(path);
        } else {
            self.values.insert(path.to_string(), value);
        }
    }
}
