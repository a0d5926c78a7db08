//! The condition-gated treatment processor.
//!
//! A [`TreatmentProcessor`] wraps one treatment step with its preconditions,
//! postconditions, time stamp and bound parameters. Processing is the
//! atomic state transition of the engine: either the whole step commits and
//! the history records it, or the step aborts and the candidate successor
//! is discarded whole.

use std::fmt;
use std::sync::Arc;

use crate::collected_data::CollectedData;
use crate::condition::Condition;
use crate::error::{ExecutionError, GuardFailure, StepFailure};
use crate::payload::{HistoryEntry, SimulationPayload};
use crate::time::TimePoint;
use crate::value::Parameters;

/// What a treatment returns: the transformed unit and, optionally, a
/// replacement collected-data store. When no replacement is given the store
/// the treatment received (and possibly mutated) is carried forward.
pub type TreatmentOutput<U> = (U, Option<CollectedData>);

/// Result of invoking a treatment function.
pub type TreatmentResult<U> = Result<TreatmentOutput<U>, ExecutionError>;

/// A treatment entrypoint.
///
/// Receives the computational unit by value, mutable access to the
/// schedule's collected-data store and the parameters bound to this step.
pub type TreatmentFn<U> =
    Arc<dyn Fn(U, &mut CollectedData, &Parameters) -> TreatmentResult<U> + Send + Sync>;

/// One prepared, condition-gated treatment step.
///
/// Processing runs the step state machine: preconditions are checked
/// against the input payload, the treatment is invoked on a private clone
/// of the collected-data store, postconditions are checked against the
/// candidate successor, and only then is the step appended to the history.
/// A failed check aborts with a [`GuardFailure`] and leaves the input
/// payload's observable state untouched.
pub struct TreatmentProcessor<U> {
    name: String,
    treatment: TreatmentFn<U>,
    parameters: Parameters,
    time_point: TimePoint,
    preconditions: Vec<Condition<U>>,
    postconditions: Vec<Condition<U>>,
}

impl<U> Clone for TreatmentProcessor<U> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            treatment: Arc::clone(&self.treatment),
            parameters: self.parameters.clone(),
            time_point: self.time_point,
            preconditions: self.preconditions.clone(),
            postconditions: self.postconditions.clone(),
        }
    }
}

impl<U> fmt::Debug for TreatmentProcessor<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreatmentProcessor")
            .field("name", &self.name)
            .field("time_point", &self.time_point)
            .field("parameters", &self.parameters)
            .field("preconditions", &self.preconditions.len())
            .field("postconditions", &self.postconditions.len())
            .finish_non_exhaustive()
    }
}

impl<U: 'static> TreatmentProcessor<U> {
    /// Creates a prepared processor for one step.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        treatment: TreatmentFn<U>,
        parameters: Parameters,
        time_point: TimePoint,
        preconditions: Vec<Condition<U>>,
        postconditions: Vec<Condition<U>>,
    ) -> Self {
        Self {
            name: name.into(),
            treatment,
            parameters,
            time_point,
            preconditions,
            postconditions,
        }
    }

    /// Name of the wrapped treatment.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time point this step is prepared for.
    #[must_use]
    pub const fn time_point(&self) -> TimePoint {
        self.time_point
    }

    /// Parameters bound to this step.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn guard_failure(&self, condition: &Condition<U>) -> GuardFailure {
        GuardFailure {
            treatment: self.name.clone(),
            time_point: self.time_point,
            condition: condition.to_string(),
        }
    }

    /// Runs the step on `payload`, producing the successor payload.
    ///
    /// # Errors
    ///
    /// - [`StepFailure::Guard`] when a precondition or postcondition
    ///   rejects the step; the caller discards this branch only.
    /// - [`StepFailure::Execution`] when the treatment signals it could not
    ///   run; re-raised here with treatment and time-point context.
    /// - [`StepFailure::Attribute`] when the treatment hit a missing
    ///   overlay attribute; propagated as a programming error.
    pub fn process(
        &self,
        payload: SimulationPayload<U>,
    ) -> Result<SimulationPayload<U>, StepFailure> {
        for condition in &self.preconditions {
            if !condition.evaluate(self.time_point, &payload) {
                return Err(self.guard_failure(condition).into());
            }
        }

        // The treatment works on a private clone of the store so that an
        // aborted step cannot leave partial mutations behind.
        let mut store = payload.collected_data.clone();
        store.current_time_point = self.time_point;

        let SimulationPayload {
            computational_unit,
            collected_data: _,
            operation_history,
        } = payload;

        let (unit, replacement) =
            (self.treatment)(computational_unit, &mut store, &self.parameters).map_err(
                |source| match source {
                    ExecutionError::Attribute(source) => StepFailure::Attribute {
                        treatment: self.name.clone(),
                        time_point: self.time_point,
                        source,
                    },
                    source => StepFailure::Execution {
                        treatment: self.name.clone(),
                        time_point: self.time_point,
                        source,
                    },
                },
            )?;

        let mut successor = SimulationPayload {
            computational_unit: unit,
            collected_data: replacement.unwrap_or(store),
            operation_history,
        };

        for condition in &self.postconditions {
            if !condition.evaluate(self.time_point, &successor) {
                return Err(self.guard_failure(condition).into());
            }
        }

        successor.operation_history.push(HistoryEntry {
            time_point: self.time_point,
            treatment: self.name.clone(),
            parameters: self.parameters.clone(),
        });

        Ok(successor)
    }
}
