//! Composable guard predicates over the simulation payload.
//!
//! A [`Condition`] decides whether a treatment step may run (precondition)
//! or whether its result is acceptable (postcondition). Conditions carry a
//! label so that a guard failure can name the condition that rejected the
//! step. Predicates must be pure: no side effects.

use std::fmt;
use std::sync::Arc;

use crate::payload::SimulationPayload;
use crate::time::TimePoint;

type Predicate<U> = dyn Fn(TimePoint, &SimulationPayload<U>) -> bool + Send + Sync;

/// A boolean predicate over `(time point, payload)`.
///
/// Closed under conjunction and disjunction with short-circuit semantics.
///
/// # Examples
///
/// ```
/// use silvasim::{CollectedData, Condition, Plain, SimulationPayload};
///
/// let late = Condition::named("time at least 2", |t, _: &SimulationPayload<Plain<i64>>| t >= 2);
/// let small = Condition::named("unit below 5", |_, p: &SimulationPayload<Plain<i64>>| *p.computational_unit < 5);
/// let both = late.and(&small);
///
/// let payload = SimulationPayload::new(Plain(3), CollectedData::new(0));
/// assert!(both.evaluate(2, &payload));
/// assert!(!both.evaluate(1, &payload));
/// ```
pub struct Condition<U> {
    label: String,
    predicate: Arc<Predicate<U>>,
}

impl<U> Clone for Condition<U> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<U> fmt::Debug for Condition<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<U> fmt::Display for Condition<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

impl<U: 'static> Condition<U> {
    /// Creates an unlabeled condition.
    pub fn new(
        predicate: impl Fn(TimePoint, &SimulationPayload<U>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::named("condition", predicate)
    }

    /// Creates a labeled condition. The label appears in guard-failure
    /// messages.
    pub fn named(
        label: impl Into<String>,
        predicate: impl Fn(TimePoint, &SimulationPayload<U>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// The condition's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Evaluates the predicate.
    #[must_use]
    pub fn evaluate(&self, time_point: TimePoint, payload: &SimulationPayload<U>) -> bool {
        (self.predicate)(time_point, payload)
    }

    /// Conjunction: true when both conditions hold. Short-circuits.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        let a = Arc::clone(&self.predicate);
        let b = Arc::clone(&other.predicate);
        Self {
            label: format!("({} and {})", self.label, other.label),
            predicate: Arc::new(move |t, p| a(t, p) && b(t, p)),
        }
    }

    /// Disjunction: true when either condition holds. Short-circuits.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        let a = Arc::clone(&self.predicate);
        let b = Arc::clone(&other.predicate);
        Self {
            label: format!("({} or {})", self.label, other.label),
            predicate: Arc::new(move |t, p| a(t, p) || b(t, p)),
        }
    }
}

/// Condition that holds until `treatment` has run within the last
/// `minimum` time units.
///
/// Looks the treatment up in the payload's operation history: eligible when
/// it never ran, or when more than `minimum` time units have passed since
/// its latest run.
#[must_use]
pub fn minimum_time_interval<U: crate::payload::Branchable + 'static>(
    minimum: i32,
    treatment: impl Into<String>,
) -> Condition<U> {
    let treatment = treatment.into();
    let label = format!("minimum time interval {minimum} for {treatment}");
    Condition::named(label, move |time_point, payload| {
        match payload.last_run_of(&treatment) {
            None => true,
            Some(last_run) => minimum < time_point - last_run,
        }
    })
}

/// Condition that holds only at the given time points.
#[must_use]
pub fn time_point_in<U: 'static>(points: Vec<TimePoint>) -> Condition<U> {
    let label = format!("time point in {points:?}");
    Condition::named(label, move |time_point, _| points.contains(&time_point))
}
