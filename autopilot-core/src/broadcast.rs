//! Periodic heading broadcast.
//!
//! While the autopilot is engaged a timer fires every [`BROADCAST_PERIOD`]
//! and each firing runs one [`broadcast_cycle`]: encode the sentence set
//! for the current targets, hand every sentence to the sink, and publish
//! the targets again so the data store stays fresh.
//!
//! The timer itself is platform specific (tokio task on the server, the
//! host's poll loop elsewhere) and is abstracted by [`BroadcastTimer`].

use std::time::Duration;

use crate::angle::{rads_to_degs, wrap_radians};
use crate::heading::{HeadingReference, HeadingTargetStore};
use crate::io::{IoError, SentenceSink};
use crate::protocol::nmea0183::{heading_sentences, HeadingFields};
use crate::store::{DataStore, DataStoreExt};

/// Fixed broadcast period
pub const BROADCAST_PERIOD: Duration = Duration::from_millis(1000);

/// A repeating timer that can be armed and disarmed.
pub trait BroadcastTimer {
    /// Start firing every `period`. Any running timer is stopped first.
    fn arm(&mut self, period: Duration);

    /// Stop firing. Does nothing if the timer is not armed.
    fn disarm(&mut self);

    fn is_armed(&self) -> bool;
}

/// Timer with no clock of its own.
///
/// Records whether it is armed; the owner calls the tick itself. Used by
/// hosts with their own poll loop, and by tests.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    period: Option<Duration>,
    arm_count: u32,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Number of times the timer was armed
    pub fn arm_count(&self) -> u32 {
        self.arm_count
    }
}

impl BroadcastTimer for ManualTimer {
    fn arm(&mut self, period: Duration) {
        self.disarm();
        self.period = Some(period);
        self.arm_count += 1;
    }

    fn disarm(&mut self) {
        self.period = None;
    }

    fn is_armed(&self) -> bool {
        self.period.is_some()
    }
}

/// Result of one broadcast cycle
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No target heading, nothing sent
    Skipped,
    /// Sentences were encoded; `errors` lists the ones the sink refused
    Sent { sentences: usize, errors: Vec<IoError> },
}

impl TickOutcome {
    pub fn errors(&self) -> &[IoError] {
        match self {
            TickOutcome::Skipped => &[],
            TickOutcome::Sent { errors, .. } => errors,
        }
    }
}

/// Run one broadcast cycle.
///
/// A refused sentence does not stop the rest of the set; the next cycle
/// sends current data again anyway.
pub fn broadcast_cycle<S: DataStore, K: SentenceSink>(
    talker: &str,
    targets: &HeadingTargetStore,
    store: &mut S,
    sink: &mut K,
) -> TickOutcome {
    let target_degs = |r: HeadingReference| targets.get(r).map(|t| t.degrees());
    let measured = store.measured_heading();

    let Some(fields) = HeadingFields::select(
        target_degs(HeadingReference::True),
        target_degs(HeadingReference::Magnetic),
        measured.true_heading.map(|r| rads_to_degs(wrap_radians(r))),
        measured.magnetic_heading.map(|r| rads_to_degs(wrap_radians(r))),
    ) else {
        return TickOutcome::Skipped;
    };

    let sentences = heading_sentences(talker, &fields);
    let errors = sentences
        .iter()
        .filter_map(|sentence| sink.send(sentence).err())
        .collect();

    targets.republish(store);

    TickOutcome::Sent {
        sentences: sentences.len(),
        errors,
    }
}
