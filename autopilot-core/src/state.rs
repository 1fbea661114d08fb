//! Autopilot engagement state machine.
//!
//! ```text
//!            request "auto" (heading known)
//!   Standby ─────────────────────────────────▶ Auto
//!      ▲        seed targets, arm broadcast      │
//!      │                                         │
//!      └─────────────────────────────────────────┘
//!            request "standby"
//!            disarm broadcast, clear targets
//! ```
//!
//! Anything else (wind, track, or asking for the state already held) is
//! rejected without side effects.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::broadcast::{broadcast_cycle, BroadcastTimer, TickOutcome, BROADCAST_PERIOD};
use crate::error::AutopilotError;
use crate::heading::{HeadingReference, HeadingTargetStore};
use crate::io::SentenceSink;
use crate::protocol::nmea0183::DEFAULT_TALKER;
use crate::store::{paths, DataStore, DataStoreExt};

/// Engagement state of the autopilot
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EngagementState {
    /// Not steering (initial state)
    #[default]
    Standby,
    /// Holding the commanded heading
    Auto,
}

/// The autopilot control core.
///
/// Owns the engagement state, the heading targets and the broadcast timer.
/// The host store `S` supplies measured headings and receives every change.
#[derive(Debug)]
pub struct Autopilot<S, T> {
    state: EngagementState,
    targets: HeadingTargetStore,
    store: S,
    timer: T,
    talker: String,
}

impl<S: DataStore, T: BroadcastTimer> Autopilot<S, T> {
    pub fn new(store: S, timer: T) -> Self {
        Self::with_talker(store, timer, DEFAULT_TALKER)
    }

    pub fn with_talker(store: S, timer: T, talker: &str) -> Self {
        Autopilot {
            state: EngagementState::Standby,
            targets: HeadingTargetStore::new(),
            store,
            timer,
            talker: talker.to_string(),
        }
    }

    pub fn state(&self) -> EngagementState {
        self.state
    }

    pub fn is_engaged(&self) -> bool {
        self.state == EngagementState::Auto
    }

    pub fn targets(&self) -> &HeadingTargetStore {
        &self.targets
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn talker(&self) -> &str {
        &self.talker
    }

    /// Request a transition to the state named `requested`.
    pub fn request_state(&mut self, requested: &str) -> Result<(), AutopilotError> {
        let target: Option<EngagementState> = requested.parse().ok();
        match (self.state, target) {
            (EngagementState::Standby, Some(EngagementState::Auto)) => self.engage(),
            (EngagementState::Auto, Some(EngagementState::Standby)) => {
                self.disengage();
                Ok(())
            }
            _ => Err(AutopilotError::InvalidStateTransition(requested.to_string())),
        }
    }

    /// Nudge every live target by `delta_degrees`.
    ///
    /// Ignored while in standby.
    pub fn adjust_heading(&mut self, delta_degrees: f64) {
        if !self.is_engaged() {
            return;
        }
        for reference in HeadingReference::ALL {
            self.targets.adjust(&mut self.store, reference, delta_degrees);
        }
    }

    /// One firing of the broadcast timer.
    ///
    /// Does nothing when disengaged, so a tick that was already in flight
    /// when the timer was disarmed is harmless.
    pub fn on_tick<K: SentenceSink>(&mut self, sink: &mut K) -> TickOutcome {
        if !self.is_engaged() {
            return TickOutcome::Skipped;
        }
        broadcast_cycle(&self.talker, &self.targets, &mut self.store, sink)
    }

    /// Stop broadcasting without changing state, for host shutdown.
    pub fn shutdown(&mut self) {
        self.timer.disarm();
    }

    fn engage(&mut self) -> Result<(), AutopilotError> {
        let measured = self.store.measured_heading();
        if !measured.is_known() {
            return Err(AutopilotError::UnknownCurrentHeading);
        }

        self.targets.seed(
            &mut self.store,
            measured.true_heading,
            measured.magnetic_heading,
        );
        self.set_state(EngagementState::Auto);
        self.timer.arm(BROADCAST_PERIOD);
        Ok(())
    }

    fn disengage(&mut self) {
        self.timer.disarm();
        self.targets.clear();
        self.set_state(EngagementState::Standby);
    }

    fn set_state(&mut self, state: EngagementState) {
        self.state = state;
        self.store.publish(paths::STATE, state.to_string().into());
    }
}
