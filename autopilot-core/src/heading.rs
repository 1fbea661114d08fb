//! Commanded heading targets.
//!
//! The autopilot can hold a true target, a magnetic target, or both,
//! mirroring whichever references the compass source provides. Targets are
//! kept in radians, as they are stored and published, and converted to
//! degrees only for arithmetic and display.

use serde::{Deserialize, Serialize};

use crate::angle::{degs_to_rads, rads_to_degs, wrap_degrees, wrap_radians};
use crate::store::{paths, DataStore};

/// North reference of a heading value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingReference {
    True,
    Magnetic,
}

impl HeadingReference {
    pub const ALL: [HeadingReference; 2] = [HeadingReference::True, HeadingReference::Magnetic];

    /// Reference letter used in sentence fields
    pub fn letter(self) -> char {
        match self {
            HeadingReference::True => 'T',
            HeadingReference::Magnetic => 'M',
        }
    }

    /// Data store path of the commanded target for this reference
    pub fn target_path(self) -> &'static str {
        match self {
            HeadingReference::True => paths::TARGET_HEADING_TRUE,
            HeadingReference::Magnetic => paths::TARGET_HEADING_MAGNETIC,
        }
    }

    /// Data store path of the measured heading for this reference
    pub fn measured_path(self) -> &'static str {
        match self {
            HeadingReference::True => paths::HEADING_TRUE,
            HeadingReference::Magnetic => paths::HEADING_MAGNETIC,
        }
    }
}

/// A commanded heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetHeading {
    pub reference: HeadingReference,
    pub angle_radians: f64,
}

impl TargetHeading {
    pub fn new(reference: HeadingReference, angle_radians: f64) -> Self {
        Self {
            reference,
            angle_radians,
        }
    }

    pub fn degrees(&self) -> f64 {
        rads_to_degs(self.angle_radians)
    }
}

/// Holds at most one target per reference.
///
/// Every change is published to the data store so the commanded heading is
/// visible to the rest of the system.
#[derive(Debug, Clone, Default)]
pub struct HeadingTargetStore {
    true_target: Option<TargetHeading>,
    magnetic_target: Option<TargetHeading>,
}

impl HeadingTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a target equal to each measured heading that is known.
    ///
    /// References without a measured value get no target. Measured values
    /// are normalized into `[0, 2π)` first.
    pub fn seed<S: DataStore>(
        &mut self,
        store: &mut S,
        current_true: Option<f64>,
        current_magnetic: Option<f64>,
    ) -> Vec<TargetHeading> {
        let mut seeded = Vec::with_capacity(2);
        for (reference, current) in [
            (HeadingReference::True, current_true),
            (HeadingReference::Magnetic, current_magnetic),
        ] {
            if let Some(angle) = current {
                let target = TargetHeading::new(reference, wrap_radians(angle));
                seeded.push(self.set(store, target));
            }
        }
        seeded
    }

    /// Nudge the target for `reference` by `delta_degrees`.
    ///
    /// Returns `None` if there is no target for that reference; the caller is
    /// expected to have checked engagement first.
    pub fn adjust<S: DataStore>(
        &mut self,
        store: &mut S,
        reference: HeadingReference,
        delta_degrees: f64,
    ) -> Option<TargetHeading> {
        let existing = self.get(reference)?;
        let degrees = wrap_degrees(existing.degrees() + delta_degrees);
        Some(self.set(store, TargetHeading::new(reference, degs_to_rads(degrees))))
    }

    /// Drop all targets. Nothing is published; disengaging publishes the state instead.
    pub fn clear(&mut self) {
        self.true_target = None;
        self.magnetic_target = None;
    }

    pub fn get(&self, reference: HeadingReference) -> Option<TargetHeading> {
        match reference {
            HeadingReference::True => self.true_target,
            HeadingReference::Magnetic => self.magnetic_target,
        }
    }

    /// All live targets, true first
    pub fn targets(&self) -> impl Iterator<Item = TargetHeading> + '_ {
        HeadingReference::ALL.into_iter().filter_map(|r| self.get(r))
    }

    pub fn is_empty(&self) -> bool {
        self.true_target.is_none() && self.magnetic_target.is_none()
    }

    /// Publish every live target again, unchanged.
    pub fn republish<S: DataStore>(&self, store: &mut S) {
        for target in self.targets() {
            store.publish(target.reference.target_path(), target.angle_radians.into());
        }
    }

    fn set<S: DataStore>(&mut self, store: &mut S, target: TargetHeading) -> TargetHeading {
        match target.reference {
            HeadingReference::True => self.true_target = Some(target),
            HeadingReference::Magnetic => self.magnetic_target = Some(target),
        }
        store.publish(target.reference.target_path(), target.angle_radians.into());
        target
    }
}
