//! The simulation driver.
//!
//! [`SimulationEngine`] turns a batch of computational units into finished
//! schedules: the schedule trees are built once up front (so configuration
//! errors are fatal before anything runs), then every unit is evaluated
//! independently. Units share no mutable state, which is what allows the
//! optional worker pool to fan them out without locking; within one unit
//! the produced alternatives keep their deterministic order either way.

use std::collections::BTreeMap;
use std::fmt;
use std::thread;

use crossbeam_channel::bounded;
use tracing::{debug, info};
use uuid::Uuid;

use crate::collected_data::CollectedData;
use crate::error::SimResult;
use crate::instruction::SimConfiguration;
use crate::payload::{Branchable, SimulationPayload};
use crate::strategy::{BuiltTrees, EvaluationStrategy, FormationStrategy};
use crate::time::TimePoint;

/// Stable identifier for one simulation run, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    /// Creates a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Number of worker threads for evaluating units. With 1 (the default)
    /// everything runs on the calling thread.
    pub workers: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

/// Evaluates batches of computational units into alternative schedules.
pub struct SimulationEngine<U> {
    config: SimConfiguration<U>,
    formation: FormationStrategy,
    evaluation: EvaluationStrategy,
    options: EngineOptions,
}

impl<U> SimulationEngine<U>
where
    U: Branchable + Send + 'static,
{
    /// Creates an engine with full-tree formation, depth-first evaluation
    /// and a single worker.
    #[must_use]
    pub fn new(config: SimConfiguration<U>) -> Self {
        Self {
            config,
            formation: FormationStrategy::Full,
            evaluation: EvaluationStrategy::Depth,
            options: EngineOptions::default(),
        }
    }

    /// Selects the tree formation strategy.
    #[must_use]
    pub fn with_formation(mut self, formation: FormationStrategy) -> Self {
        self.formation = formation;
        self
    }

    /// Selects the tree evaluation strategy.
    #[must_use]
    pub fn with_evaluation(mut self, evaluation: EvaluationStrategy) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Overrides the driver options.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// The wrapped configuration.
    #[must_use]
    pub const fn config(&self) -> &SimConfiguration<U> {
        &self.config
    }

    /// Runs every unit through the declared schedules.
    ///
    /// Returns the finished alternatives keyed by unit identifier; a unit
    /// whose every schedule was pruned maps to an empty list. Duplicate
    /// identifiers keep the last unit's results.
    ///
    /// # Errors
    ///
    /// Configuration errors from building the schedule trees, before any
    /// unit is touched, and non-prunable evaluation failures.
    pub fn simulate(
        &self,
        units: Vec<(String, U)>,
    ) -> SimResult<BTreeMap<String, Vec<SimulationPayload<U>>>> {
        let run_id = RunId::new();
        let trees = self.formation.build(&self.config)?;
        let initial_time_point = self.config.time_points().first().copied().unwrap_or(0);

        info!(
            %run_id,
            units = units.len(),
            workers = self.options.workers,
            "starting simulation run"
        );

        if self.options.workers <= 1 || units.len() <= 1 {
            let mut retval = BTreeMap::new();
            for (identifier, unit) in units {
                let (identifier, schedules) = evaluate_unit(
                    &trees,
                    self.evaluation,
                    run_id,
                    identifier,
                    unit,
                    initial_time_point,
                )?;
                retval.insert(identifier, schedules);
            }
            return Ok(retval);
        }

        self.simulate_parallel(units, &trees, run_id, initial_time_point)
    }

    fn simulate_parallel(
        &self,
        units: Vec<(String, U)>,
        trees: &BuiltTrees<U>,
        run_id: RunId,
        initial_time_point: TimePoint,
    ) -> SimResult<BTreeMap<String, Vec<SimulationPayload<U>>>> {
        let workers = self.options.workers.min(units.len()).max(1);
        let capacity = units.len();
        let evaluation = self.evaluation;

        let (job_tx, job_rx) = bounded::<(String, U)>(capacity);
        let (result_tx, result_rx) =
            bounded::<SimResult<(String, Vec<SimulationPayload<U>>)>>(capacity);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    while let Ok((identifier, unit)) = job_rx.recv() {
                        let outcome = evaluate_unit(
                            trees,
                            evaluation,
                            run_id,
                            identifier,
                            unit,
                            initial_time_point,
                        );
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }

            for job in units {
                // Capacity covers every job; a send only fails when all
                // workers died, and then the results channel closes too.
                let _ = job_tx.send(job);
            }
            drop(job_tx);
            drop(result_tx);

            let mut retval = BTreeMap::new();
            for outcome in result_rx.iter() {
                let (identifier, schedules) = outcome?;
                retval.insert(identifier, schedules);
            }
            Ok(retval)
        })
    }
}

fn evaluate_unit<U: Branchable + 'static>(
    trees: &BuiltTrees<U>,
    evaluation: EvaluationStrategy,
    run_id: RunId,
    identifier: String,
    unit: U,
    initial_time_point: TimePoint,
) -> SimResult<(String, Vec<SimulationPayload<U>>)> {
    debug!(%run_id, unit = %identifier, "evaluating unit");
    let payload = SimulationPayload::new(unit, CollectedData::new(initial_time_point));
    let schedules = trees.evaluate(payload, evaluation)?;
    info!(%run_id, unit = %identifier, alternatives = schedules.len(), "unit evaluated");
    Ok((identifier, schedules))
}

/// Convenience entry point: runs `units` with the given strategies.
///
/// # Errors
///
/// Same as [`SimulationEngine::simulate`].
pub fn simulate_alternatives<U: Branchable + Send + 'static>(
    units: Vec<(String, U)>,
    config: SimConfiguration<U>,
    formation: FormationStrategy,
    evaluation: EvaluationStrategy,
) -> SimResult<BTreeMap<String, Vec<SimulationPayload<U>>>> {
    SimulationEngine::new(config)
        .with_formation(formation)
        .with_evaluation(evaluation)
        .simulate(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::instruction::{SimulationInstruction, Steps, TreatmentStep};
    use crate::payload::Plain;
    use crate::registry::TreatmentRegistry;
    use crate::value::Parameters;

    type Counter = Plain<i64>;

    fn config() -> SimConfiguration<Counter> {
        let mut registry = TreatmentRegistry::new();
        registry.register("add", |mut unit: Counter, _store, params| {
            *unit += params.require_int("amount")?;
            Ok((unit, None))
        });

        SimConfiguration::new(
            registry,
            vec![SimulationInstruction::new(
                vec![0],
                Steps::Step(TreatmentStep::new("add").with_parameter_sets(vec![
                    Parameters::new().with("amount", 1i64),
                    Parameters::new().with("amount", 2i64),
                ])),
            )],
        )
    }

    fn units(count: i64) -> Vec<(String, Counter)> {
        (0..count)
            .map(|i| (format!("unit-{i}"), Plain(i * 100)))
            .collect()
    }

    #[test]
    fn serial_run_keys_results_by_identifier() {
        let engine = SimulationEngine::new(config());
        let results = engine.simulate(units(3)).unwrap();

        assert_eq!(results.len(), 3);
        let unit_1 = &results["unit-1"];
        let values: Vec<i64> = unit_1.iter().map(|p| *p.computational_unit).collect();
        assert_eq!(values, vec![101, 102]);
    }

    #[test]
    fn parallel_run_matches_serial() {
        let serial = SimulationEngine::new(config()).simulate(units(8)).unwrap();
        let parallel = SimulationEngine::new(config())
            .with_options(EngineOptions { workers: 4 })
            .simulate(units(8))
            .unwrap();

        assert_eq!(serial.len(), parallel.len());
        for (identifier, schedules) in &serial {
            let other = &parallel[identifier];
            let left: Vec<i64> = schedules.iter().map(|p| *p.computational_unit).collect();
            let right: Vec<i64> = other.iter().map(|p| *p.computational_unit).collect();
            assert_eq!(left, right, "diverged for {identifier}");
        }
    }

    #[test]
    fn config_error_is_fatal_before_any_unit() {
        let config = SimConfiguration::new(
            TreatmentRegistry::<Counter>::new(),
            vec![SimulationInstruction::new(
                vec![0],
                Steps::Step(TreatmentStep::new("levitate")),
            )],
        );
        let err = SimulationEngine::new(config).simulate(units(2)).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn empty_unit_batch_is_fine() {
        let results = SimulationEngine::new(config()).simulate(vec![]).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }
}
