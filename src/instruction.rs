//! The declarative description of a simulator run.
//!
//! Callers describe what to do as data: treatment steps with parameter
//! sets and guard conditions, composed into sequences and alternative
//! branches, scheduled onto time points. The schedule-tree builder turns
//! these declarations into prepared processors; nothing here executes a
//! treatment.

use std::collections::BTreeSet;

use crate::condition::Condition;
use crate::error::ConfigError;
use crate::registry::TreatmentRegistry;
use crate::time::TimePoint;
use crate::value::Parameters;

/// One declared treatment step.
///
/// A step with more than one parameter set is a branch point: the builder
/// creates one child per set, in declaration order.
pub struct TreatmentStep<U> {
    /// Registered name of the treatment to run.
    pub treatment: String,
    /// Parameter sets; empty means a single run with no parameters.
    pub parameter_sets: Vec<Parameters>,
    /// Conditions checked against the input payload before the treatment.
    pub preconditions: Vec<Condition<U>>,
    /// Conditions checked against the candidate successor after it.
    pub postconditions: Vec<Condition<U>>,
}

impl<U> Clone for TreatmentStep<U> {
    fn clone(&self) -> Self {
        Self {
            treatment: self.treatment.clone(),
            parameter_sets: self.parameter_sets.clone(),
            preconditions: self.preconditions.clone(),
            postconditions: self.postconditions.clone(),
        }
    }
}

impl<U> TreatmentStep<U> {
    /// Declares a step for the named treatment with no parameters and no
    /// conditions.
    #[must_use]
    pub fn new(treatment: impl Into<String>) -> Self {
        Self {
            treatment: treatment.into(),
            parameter_sets: Vec::new(),
            preconditions: Vec::new(),
            postconditions: Vec::new(),
        }
    }

    /// Binds a single parameter set.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameter_sets.push(parameters);
        self
    }

    /// Declares alternative parameter sets, one branch per set.
    #[must_use]
    pub fn with_parameter_sets(mut self, sets: Vec<Parameters>) -> Self {
        self.parameter_sets.extend(sets);
        self
    }

    /// Adds a precondition.
    #[must_use]
    pub fn with_precondition(mut self, condition: Condition<U>) -> Self {
        self.preconditions.push(condition);
        self
    }

    /// Adds a postcondition.
    #[must_use]
    pub fn with_postcondition(mut self, condition: Condition<U>) -> Self {
        self.postconditions.push(condition);
        self
    }
}

/// A composition of treatment steps.
///
/// `Sequence` chains its members one after another; `Alternatives` declares
/// a branch point where every member starts an independent schedule branch.
/// Compositions nest freely.
pub enum Steps<U> {
    /// A single declared step.
    Step(TreatmentStep<U>),
    /// Members run one after another on the same branch.
    Sequence(Vec<Steps<U>>),
    /// Each member continues on its own branch.
    Alternatives(Vec<Steps<U>>),
}

impl<U> Clone for Steps<U> {
    fn clone(&self) -> Self {
        match self {
            Self::Step(step) => Self::Step(step.clone()),
            Self::Sequence(members) => Self::Sequence(members.clone()),
            Self::Alternatives(members) => Self::Alternatives(members.clone()),
        }
    }
}

impl<U> From<TreatmentStep<U>> for Steps<U> {
    fn from(step: TreatmentStep<U>) -> Self {
        Self::Step(step)
    }
}

impl<U> From<Vec<Steps<U>>> for Steps<U> {
    fn from(members: Vec<Steps<U>>) -> Self {
        Self::Sequence(members)
    }
}

/// Repeats a block of step declarations `times` times in sequence.
///
/// # Errors
///
/// Returns `ConfigError::InvalidRepeat` when `times` is zero.
pub fn repeat<U>(times: usize, steps: Vec<Steps<U>>) -> Result<Vec<Steps<U>>, ConfigError> {
    if times == 0 {
        return Err(ConfigError::InvalidRepeat { count: times });
    }
    let mut result = Vec::with_capacity(times * steps.len());
    for _ in 0..times {
        result.extend(steps.iter().cloned());
    }
    Ok(result)
}

/// Steps scheduled onto one or more time points.
pub struct SimulationInstruction<U> {
    /// Time points at which `steps` applies.
    pub time_points: Vec<TimePoint>,
    /// The step composition to attach at each of those time points.
    pub steps: Steps<U>,
}

impl<U> Clone for SimulationInstruction<U> {
    fn clone(&self) -> Self {
        Self {
            time_points: self.time_points.clone(),
            steps: self.steps.clone(),
        }
    }
}

impl<U> SimulationInstruction<U> {
    /// Declares steps for the given time points.
    #[must_use]
    pub fn new(time_points: Vec<TimePoint>, steps: impl Into<Steps<U>>) -> Self {
        Self {
            time_points,
            steps: steps.into(),
        }
    }
}

/// A validated bundle of instructions and the registry resolving their
/// treatment names.
///
/// The time-point axis is derived from the declarations: the sorted union
/// of every instruction's time points.
pub struct SimConfiguration<U> {
    registry: TreatmentRegistry<U>,
    instructions: Vec<SimulationInstruction<U>>,
    time_points: Vec<TimePoint>,
}

impl<U: 'static> SimConfiguration<U> {
    /// Bundles instructions with the registry that resolves them.
    #[must_use]
    pub fn new(registry: TreatmentRegistry<U>, instructions: Vec<SimulationInstruction<U>>) -> Self {
        let time_points: BTreeSet<TimePoint> = instructions
            .iter()
            .flat_map(|instruction| instruction.time_points.iter().copied())
            .collect();
        Self {
            registry,
            instructions,
            time_points: time_points.into_iter().collect(),
        }
    }

    /// The treatment registry.
    #[must_use]
    pub const fn registry(&self) -> &TreatmentRegistry<U> {
        &self.registry
    }

    /// The derived time-point axis, sorted and deduplicated.
    #[must_use]
    pub fn time_points(&self) -> &[TimePoint] {
        &self.time_points
    }

    /// Step compositions declared for `time_point`, in declaration order.
    #[must_use]
    pub fn steps_at(&self, time_point: TimePoint) -> Vec<&Steps<U>> {
        self.instructions
            .iter()
            .filter(|instruction| instruction.time_points.contains(&time_point))
            .map(|instruction| &instruction.steps)
            .collect()
    }
}
