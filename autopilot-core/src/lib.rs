//! # Autopilot Core
//!
//! Platform-independent control core for an NMEA 0183 autopilot adapter.
//!
//! This crate turns high-level autopilot commands (engage, disengage,
//! adjust heading) into the stream of NMEA 0183 sentences an autopilot
//! computer steers by, while tracking the engagement state and the
//! commanded heading(s). It performs **no I/O**: the host data store, the
//! sentence transport and the broadcast timer are all traits.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  autopilot-core (platform-independent, no tokio/async deps) │
//! │  ├── command/    (ingress decoding & dispatch)             │
//! │  ├── state/      (standby/auto state machine)              │
//! │  ├── heading/    (true/magnetic targets)                   │
//! │  ├── broadcast/  (per-tick sentence cycle, timer trait)    │
//! │  ├── protocol/   (NMEA 0183 encoding & checksum)           │
//! │  ├── store/      (DataStore trait, SignalK delta)          │
//! │  └── io/         (SentenceSink trait)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  autopilot-server       │
//!                 │  (tokio timer, UDP,     │
//!                 │   HTTP command ingress) │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Example: Engage and broadcast
//!
//! ```rust
//! use autopilot_core::{dispatch, Autopilot, Command, DataStore, ManualTimer, MemoryStore};
//! use autopilot_core::store::paths;
//! use serde_json::json;
//!
//! let mut store = MemoryStore::new();
//! store.publish(paths::HEADING_TRUE, json!(0.5));
//!
//! let mut autopilot = Autopilot::new(store, ManualTimer::new());
//! dispatch(&mut autopilot, Command::SetState("auto".into())).unwrap();
//! dispatch(&mut autopilot, Command::ChangeHeading(10.0)).unwrap();
//!
//! let mut sentences: Vec<String> = Vec::new();
//! autopilot.on_tick(&mut sentences);
//! assert!(sentences[0].starts_with("$MAAPB,"));
//! ```

pub mod angle;
pub mod broadcast;
pub mod command;
pub mod error;
pub mod heading;
pub mod io;
pub mod protocol;
pub mod state;
pub mod store;

// Re-export commonly used types
pub use broadcast::{BroadcastTimer, ManualTimer, TickOutcome, BROADCAST_PERIOD};
pub use command::{dispatch, Command, CommandRequest};
pub use error::AutopilotError;
pub use heading::{HeadingReference, HeadingTargetStore, TargetHeading};
pub use io::{IoError, SentenceSink};
pub use state::{Autopilot, EngagementState};
pub use store::{DataStore, DataStoreExt, Delta, MeasuredHeading, MemoryStore};
