//! Tree formation and evaluation strategies.
//!
//! Formation controls how the declarations become schedule trees: one full
//! tree spanning the whole time axis, or one partial tree per time point
//! with surviving payloads fed forward. Evaluation controls how a tree is
//! walked: depth-first with payload branching, or chain enumeration with
//! one re-run per root-to-leaf chain. All four combinations produce the
//! same alternatives for the same declarations; they trade memory for
//! redundant recomputation differently.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, SimError, SimResult};
use crate::instruction::{SimConfiguration, Steps, TreatmentStep};
use crate::payload::{Branchable, SimulationPayload};
use crate::registry::TreatmentRegistry;
use crate::time::TimePoint;
use crate::tree::{NodeId, ScheduleTree};
use crate::value::Parameters;

/// How the schedule tree is shaped from the declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationStrategy {
    /// One tree spanning every declared time point.
    Full,
    /// One tree per time point, evaluated stepwise with survivors carried
    /// forward. Avoids materializing always-failing whole-axis chains.
    Partial,
}

impl FromStr for FormationStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "partial" => Ok(Self::Partial),
            _ => Err(ConfigError::UnknownStrategy {
                kind: "formation",
                value: value.to_string(),
            }),
        }
    }
}

/// How a schedule tree is walked to produce finished payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStrategy {
    /// Recursive walk branching the payload once per child.
    Depth,
    /// Enumerate root-to-leaf chains and re-run each from the initial
    /// payload.
    Chains,
}

impl FromStr for EvaluationStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "depth" => Ok(Self::Depth),
            "chains" => Ok(Self::Chains),
            _ => Err(ConfigError::UnknownStrategy {
                kind: "evaluation",
                value: value.to_string(),
            }),
        }
    }
}

impl EvaluationStrategy {
    /// Walks `tree` with `payload`, returning the surviving leaf payloads
    /// in declared branch order.
    ///
    /// Prunable failures reduce the result, possibly to nothing.
    ///
    /// # Errors
    ///
    /// Only non-prunable failures (overlay attribute errors) are returned.
    pub fn evaluate<U: Branchable + 'static>(
        self,
        tree: &ScheduleTree<U>,
        payload: SimulationPayload<U>,
    ) -> SimResult<Vec<SimulationPayload<U>>> {
        match self {
            Self::Depth => match tree.evaluate(payload) {
                Ok(results) => Ok(results),
                Err(failure) if failure.is_prunable() => {
                    debug!(%failure, "all schedule branches pruned");
                    Ok(Vec::new())
                }
                Err(failure) => Err(SimError::from(failure)),
            },
            Self::Chains => {
                let mut results = Vec::new();
                for chain in tree.operation_chains() {
                    match Self::run_chain(tree, &chain, payload.branch()) {
                        Ok(result) => results.push(result),
                        Err(failure) if failure.is_prunable() => {
                            debug!(%failure, "chain pruned");
                        }
                        Err(failure) => return Err(SimError::from(failure)),
                    }
                }
                Ok(results)
            }
        }
    }

    fn run_chain<U: Branchable + 'static>(
        tree: &ScheduleTree<U>,
        chain: &[NodeId],
        payload: SimulationPayload<U>,
    ) -> Result<SimulationPayload<U>, crate::error::StepFailure> {
        let mut current = payload;
        for &node in chain {
            if let Some(processor) = tree.processor(node) {
                current = processor.process(current)?;
            }
        }
        Ok(current)
    }
}

fn prepare_step<U: 'static>(
    step: &TreatmentStep<U>,
    registry: &TreatmentRegistry<U>,
    time_point: TimePoint,
) -> Result<Vec<crate::processor::TreatmentProcessor<U>>, ConfigError> {
    let sets: Vec<Parameters> = if step.parameter_sets.is_empty() {
        vec![Parameters::new()]
    } else {
        step.parameter_sets.clone()
    };

    sets.into_iter()
        .map(|parameters| {
            registry.prepare(
                &step.treatment,
                parameters,
                time_point,
                step.preconditions.clone(),
                step.postconditions.clone(),
            )
        })
        .collect()
}

/// Attaches a step composition below every node in `parents`, returning
/// the new leaf frontier.
///
/// A `Sequence` threads the frontier through its members. `Alternatives`
/// attaches every member to the original frontier and unions the results.
/// A step with several parameter sets fans out into one sibling per set.
fn attach_steps<U: 'static>(
    steps: &Steps<U>,
    tree: &mut ScheduleTree<U>,
    parents: &[NodeId],
    registry: &TreatmentRegistry<U>,
    time_point: TimePoint,
) -> Result<Vec<NodeId>, ConfigError> {
    match steps {
        Steps::Step(step) => {
            let processors = prepare_step(step, registry, time_point)?;
            let mut frontier = Vec::with_capacity(parents.len() * processors.len());
            for &parent in parents {
                for processor in &processors {
                    frontier.push(tree.add_child(parent, processor.clone()));
                }
            }
            Ok(frontier)
        }
        Steps::Sequence(members) => {
            let mut frontier = parents.to_vec();
            for member in members {
                frontier = attach_steps(member, tree, &frontier, registry, time_point)?;
            }
            Ok(frontier)
        }
        Steps::Alternatives(members) => {
            let mut frontier = Vec::new();
            for member in members {
                frontier.extend(attach_steps(member, tree, parents, registry, time_point)?);
            }
            Ok(frontier)
        }
    }
}

/// Builds one schedule tree spanning the whole declared time axis.
///
/// # Errors
///
/// Any `ConfigError` from unknown treatment names or rejected parameters;
/// nothing has been evaluated when this fails.
pub fn build_full_tree<U: 'static>(config: &SimConfiguration<U>) -> SimResult<ScheduleTree<U>> {
    let mut tree = ScheduleTree::new();
    let mut frontier = vec![ScheduleTree::<U>::ROOT];
    for &time_point in config.time_points() {
        for steps in config.steps_at(time_point) {
            frontier = attach_steps(steps, &mut tree, &frontier, config.registry(), time_point)?;
        }
    }
    Ok(tree)
}

/// Builds one schedule tree per time point, in axis order.
///
/// # Errors
///
/// Same as [`build_full_tree`].
pub fn build_partial_trees<U: 'static>(
    config: &SimConfiguration<U>,
) -> SimResult<Vec<(TimePoint, ScheduleTree<U>)>> {
    config
        .time_points()
        .iter()
        .map(|&time_point| {
            let mut tree = ScheduleTree::new();
            let mut frontier = vec![ScheduleTree::<U>::ROOT];
            for steps in config.steps_at(time_point) {
                frontier =
                    attach_steps(steps, &mut tree, &frontier, config.registry(), time_point)?;
            }
            Ok((time_point, tree))
        })
        .collect()
}

/// Pre-built schedule trees for one run, shared across units.
pub enum BuiltTrees<U> {
    /// A single whole-axis tree.
    Full(ScheduleTree<U>),
    /// One tree per time point, in axis order.
    Partial(Vec<(TimePoint, ScheduleTree<U>)>),
}

impl FormationStrategy {
    /// Builds the trees for this strategy. Configuration errors surface
    /// here, before any evaluation.
    ///
    /// # Errors
    ///
    /// Any `ConfigError` raised while preparing processors.
    pub fn build<U: 'static>(self, config: &SimConfiguration<U>) -> SimResult<BuiltTrees<U>> {
        match self {
            Self::Full => Ok(BuiltTrees::Full(build_full_tree(config)?)),
            Self::Partial => Ok(BuiltTrees::Partial(build_partial_trees(config)?)),
        }
    }
}

impl<U: Branchable + 'static> BuiltTrees<U> {
    /// Evaluates one unit's payload through the built trees.
    ///
    /// # Errors
    ///
    /// Only non-prunable failures; pruned schedules just shrink the result.
    pub fn evaluate(
        &self,
        payload: SimulationPayload<U>,
        evaluation: EvaluationStrategy,
    ) -> SimResult<Vec<SimulationPayload<U>>> {
        match self {
            Self::Full(tree) => evaluation.evaluate(tree, payload),
            Self::Partial(trees) => {
                let mut survivors = vec![payload];
                for (time_point, tree) in trees {
                    let mut next = Vec::new();
                    for payload in survivors {
                        next.extend(evaluation.evaluate(tree, payload)?);
                    }
                    if next.is_empty() {
                        debug!(time_point = *time_point, "no schedule survived this time point");
                        return Ok(Vec::new());
                    }
                    survivors = next;
                }
                Ok(survivors)
            }
        }
    }
}

/// Builds a full tree and evaluates it in one call.
///
/// # Errors
///
/// Configuration errors from the build, or non-prunable evaluation
/// failures.
pub fn run_full_tree<U: Branchable + 'static>(
    payload: SimulationPayload<U>,
    config: &SimConfiguration<U>,
    evaluation: EvaluationStrategy,
) -> SimResult<Vec<SimulationPayload<U>>> {
    FormationStrategy::Full
        .build(config)?
        .evaluate(payload, evaluation)
}

/// Builds per-time-point trees and evaluates them stepwise in one call.
///
/// # Errors
///
/// Same as [`run_full_tree`].
pub fn run_partial_tree<U: Branchable + 'static>(
    payload: SimulationPayload<U>,
    config: &SimConfiguration<U>,
    evaluation: EvaluationStrategy,
) -> SimResult<Vec<SimulationPayload<U>>> {
    FormationStrategy::Partial
        .build(config)?
        .evaluate(payload, evaluation)
}
