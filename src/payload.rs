//! The data package passed through chained treatment steps.
//!
//! A [`SimulationPayload`] bundles the computational unit with its
//! collected reporting data and the history of treatments applied so far.
//! Payloads are duplicated at every branch point of the schedule tree;
//! [`Branchable`] is the hook that keeps that duplication cheap for
//! overlay-wrapped units while still allowing plain deep-copied state.

use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::collected_data::CollectedData;
use crate::overlay::{Attributes, LayeredList, Overlay};
use crate::time::TimePoint;
use crate::value::Parameters;

/// A computational unit that can be duplicated at a branch point.
///
/// Overlay-wrapped units branch in constant time by stacking a new layer;
/// plain units fall back to a deep copy via [`Plain`]. Composite units
/// implement this by re-layering each part.
pub trait Branchable {
    /// Produces an independent duplicate of this unit.
    ///
    /// Writes to the duplicate must never be observable through `self`, and
    /// vice versa.
    fn branch(&self) -> Self;
}

impl<T: Attributes> Branchable for Overlay<T> {
    fn branch(&self) -> Self {
        self.new_layer()
    }
}

impl<T: Attributes> Branchable for LayeredList<T> {
    fn branch(&self) -> Self {
        self.new_layer()
    }
}

/// Deep-copy fallback for computational units that are not overlay-wrapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plain<T>(pub T);

impl<T: Clone> Branchable for Plain<T> {
    fn branch(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Plain<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for Plain<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

/// One entry in a payload's operation history.
///
/// Entries are immutable once appended; a branch shares its prefix with its
/// siblings by plain vector cloning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Time point the treatment ran at.
    pub time_point: TimePoint,
    /// Name of the treatment.
    pub treatment: String,
    /// Parameters the treatment was bound with.
    pub parameters: Parameters,
}

/// Simulation state and progress data for one schedule in the making.
#[derive(Debug)]
pub struct SimulationPayload<U> {
    /// The simulated domain object.
    pub computational_unit: U,
    /// Reporting data collected along this schedule.
    pub collected_data: CollectedData,
    /// Treatments applied so far, in application order.
    pub operation_history: Vec<HistoryEntry>,
}

impl<U: Branchable> SimulationPayload<U> {
    /// Creates a payload with an empty history.
    #[must_use]
    pub fn new(computational_unit: U, collected_data: CollectedData) -> Self {
        Self {
            computational_unit,
            collected_data,
            operation_history: Vec::new(),
        }
    }

    /// Duplicates the payload for one branch of the schedule tree.
    ///
    /// The unit branches per [`Branchable`], the collected-data store is
    /// shallow-cloned and the history vector is copied entry for entry.
    #[must_use]
    pub fn branch(&self) -> Self {
        Self {
            computational_unit: self.computational_unit.branch(),
            collected_data: self.collected_data.clone(),
            operation_history: self.operation_history.clone(),
        }
    }

    /// The latest time point at which `treatment` ran, if it ever did.
    #[must_use]
    pub fn last_run_of(&self, treatment: &str) -> Option<TimePoint> {
        self.operation_history
            .iter()
            .rev()
            .find(|entry| entry.treatment == treatment)
            .map(|entry| entry.time_point)
    }
}
