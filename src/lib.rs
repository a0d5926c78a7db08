//! # silvasim - Branching Treatment-Schedule Simulation
//!
//! silvasim explores alternative multi-year treatment schedules for managed
//! forest stands. A declarative list of treatment steps is compiled into a
//! tree of condition-gated processors; walking that tree applies each step
//! to a copy-on-write payload, branching wherever alternative treatment
//! choices are declared. Every surviving leaf is one complete schedule.
//!
//! ## Core Concepts
//!
//! - **Overlay**: copy-on-write attribute layering that makes branching a
//!   large computational unit cheap
//! - **Payload**: the unit of data flowing through the pipeline: state,
//!   collected reporting data and treatment history
//! - **Treatment processor**: one prepared step with pre/postconditions,
//!   time stamping and parameter binding
//! - **Schedule tree**: the compiled declaration; each root-to-leaf path is
//!   one alternative schedule
//!
//! ## Usage
//!
//! ```rust
//! use silvasim::{
//!     EvaluationStrategy, FormationStrategy, Overlay, Parameters, Record,
//!     SimConfiguration, SimulationInstruction, Steps, TreatmentRegistry,
//!     TreatmentStep, Value, simulate_alternatives,
//! };
//!
//! let mut registry = TreatmentRegistry::new();
//! registry.register("thin", |mut stand: Overlay<Record>, _data, params| {
//!     let fraction = params.require_float("remaining_fraction")?;
//!     let stems = stand.get("stems_per_ha")?.as_float().unwrap_or(0.0);
//!     stand.set("stems_per_ha", Value::Float(stems * fraction));
//!     Ok((stand, None))
//! });
//!
//! let instructions = vec![SimulationInstruction::new(
//!     vec![2025],
//!     Steps::Step(TreatmentStep::new("thin").with_parameter_sets(vec![
//!         Parameters::new().with("remaining_fraction", 0.7),
//!         Parameters::new().with("remaining_fraction", 0.5),
//!     ])),
//! )];
//!
//! let stand = Overlay::new(Record::new().with("stems_per_ha", 1000.0));
//! let results = simulate_alternatives(
//!     vec![("stand-1".to_string(), stand)],
//!     SimConfiguration::new(registry, instructions),
//!     FormationStrategy::Full,
//!     EvaluationStrategy::Depth,
//! )
//! .unwrap();
//!
//! assert_eq!(results["stand-1"].len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Data model
pub mod collected_data;
pub mod columnar;
pub mod error;
pub mod overlay;
pub mod payload;
pub mod time;
pub mod value;

// Step processing
pub mod condition;
pub mod processor;
pub mod registry;

// Tree construction and evaluation
pub mod engine;
pub mod instruction;
pub mod strategy;
pub mod tree;

// Re-export primary types at crate root for convenience
pub use collected_data::{CollectedData, Series};
pub use columnar::ColumnFrame;
pub use condition::{minimum_time_interval, time_point_in, Condition};
pub use engine::{simulate_alternatives, EngineOptions, RunId, SimulationEngine};
pub use error::{
    ConfigError, ExecutionError, GuardFailure, OverlayError, SimError, SimResult, StepFailure,
};
pub use instruction::{repeat, SimConfiguration, SimulationInstruction, Steps, TreatmentStep};
pub use overlay::{Attributes, LayeredList, Overlay, Record};
pub use payload::{Branchable, HistoryEntry, Plain, SimulationPayload};
pub use processor::{TreatmentFn, TreatmentOutput, TreatmentProcessor, TreatmentResult};
pub use registry::{do_nothing, ParameterValidator, TreatmentRegistry};
pub use strategy::{
    build_full_tree, build_partial_trees, run_full_tree, run_partial_tree, BuiltTrees,
    EvaluationStrategy, FormationStrategy,
};
pub use time::{periodic_axis, TimePoint};
pub use tree::{NodeId, ScheduleTree};
pub use value::{Parameters, Value};
