//! Host data store for standalone operation.
//!
//! When running inside a SignalK server the vessel tree lives there. Running
//! standalone, this in-memory store stands in for it: sensors push deltas
//! over HTTP, the autopilot reads measured headings and publishes its state
//! and targets here.

use log::{debug, trace};
use serde_json::Value;
use std::sync::{Arc, RwLock};

use autopilot_core::store::{DataStore, Delta, MemoryStore};

/// Thread-safe handle to the in-memory vessel data store.
#[derive(Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<MemoryStore>>,
}

impl SharedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a delta from an external source. Returns the number of values applied.
    pub fn apply_delta(&self, delta: &Delta) -> usize {
        let count = match self.inner.write() {
            Ok(mut store) => store.apply_delta(delta),
            Err(poisoned) => poisoned.into_inner().apply_delta(delta),
        };
        debug!("Applied delta with {} values", count);
        count
    }
}

impl DataStore for SharedStore {
    fn get(&self, path: &str) -> Option<Value> {
        match self.inner.read() {
            Ok(store) => store.get(path),
            Err(poisoned) => poisoned.into_inner().get(path),
        }
    }

    fn publish(&mut self, path: &str, value: Value) {
        trace!("publish {} = {}", path, value);
        match self.inner.write() {
            Ok(mut store) => store.publish(path, value),
            Err(poisoned) => poisoned.into_inner().publish(path, value),
        }
    }
}

/// Convert a URL path (`navigation/headingTrue`) to a store path (`navigation.headingTrue`).
///
/// A trailing `/value` or `.value` is accepted and dropped, as SignalK
/// clients commonly address the leaf value that way.
pub fn url_to_path(url_path: &str) -> String {
    let path = url_path.trim_matches('/').replace('/', ".");
    match path.strip_suffix(".value") {
        Some(stripped) => stripped.to_string(),
        None => path,
    }
}
