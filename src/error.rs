//! Error types for silvasim.
//!
//! All errors are strongly typed using thiserror. The taxonomy separates
//! failures by blast radius: configuration errors abort a whole run before
//! any evaluation starts, step failures prune exactly one branch of the
//! schedule tree, and overlay attribute errors are programming errors that
//! surface immediately instead of being pruned.

use thiserror::Error;

use crate::time::TimePoint;

/// Errors detected while validating declarations, before any evaluation.
///
/// These are always fatal to the run that produced them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown treatment '{name}'")]
    UnknownTreatment {
        name: String,
    },

    #[error("Required parameter '{name}' is missing")]
    MissingParameter {
        name: String,
    },

    #[error("Parameter '{name}' has type {actual}, expected {expected}")]
    ParameterType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Treatment '{treatment}' rejected its parameters: {reason}")]
    InvalidParameters {
        treatment: String,
        reason: String,
    },

    #[error("Repetition count must be a positive integer, got {count}")]
    InvalidRepeat {
        count: usize,
    },

    #[error("Invalid time axis: initial {initial}, last {last}, step {step}")]
    InvalidTimeAxis {
        initial: TimePoint,
        last: TimePoint,
        step: i32,
    },

    #[error("Unable to resolve {kind} strategy '{value}'")]
    UnknownStrategy {
        kind: &'static str,
        value: String,
    },
}

/// A named precondition or postcondition rejected a treatment step.
///
/// Guard failures are recoverable by construction: the evaluator discards
/// the subtree rooted at the failing step and every sibling branch
/// continues unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{treatment} aborted at time point {time_point}: condition \"{condition}\" failed")]
pub struct GuardFailure {
    /// Name of the treatment whose guard rejected the step.
    pub treatment: String,
    /// Time point at which the step was attempted.
    pub time_point: TimePoint,
    /// Label of the failing condition.
    pub condition: String,
}

/// Attribute lookup failures in the layered overlay.
///
/// Reading an attribute that is absent from the entire layer chain and the
/// base record is a programming error, distinct from a value type mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("attribute '{attribute}' not found in any layer or the base record")]
    AttributeNotFound {
        attribute: String,
    },
}

/// Errors a treatment function may signal to indicate it could not run.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("invalid parameters: {message}")]
    InvalidParameters {
        message: String,
    },

    #[error("invalid state: {message}")]
    InvalidState {
        message: String,
    },

    #[error(transparent)]
    Attribute(#[from] OverlayError),
}

impl ExecutionError {
    /// Creates an invalid-parameters execution error.
    #[must_use]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            message: message.into(),
        }
    }

    /// Creates an invalid-state execution error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }
}

impl From<ConfigError> for ExecutionError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidParameters {
            message: err.to_string(),
        }
    }
}

/// Failure of a single treatment step.
///
/// `Guard` and `Execution` prune exactly one branch. `Attribute` is an
/// overlay lookup failure inside a treatment: it is re-raised through the
/// whole evaluation instead of being treated as a pruned branch.
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error(transparent)]
    Guard(#[from] GuardFailure),

    #[error("unable to perform {treatment} at time point {time_point}: {source}")]
    Execution {
        treatment: String,
        time_point: TimePoint,
        #[source]
        source: ExecutionError,
    },

    #[error("attribute lookup failed in {treatment} at time point {time_point}: {source}")]
    Attribute {
        treatment: String,
        time_point: TimePoint,
        #[source]
        source: OverlayError,
    },
}

impl StepFailure {
    /// Returns true if the failure prunes only the enclosing branch.
    #[must_use]
    pub const fn is_prunable(&self) -> bool {
        !matches!(self, Self::Attribute { .. })
    }

    /// Returns true if this is a guard (pre/postcondition) failure.
    #[must_use]
    pub const fn is_guard(&self) -> bool {
        matches!(self, Self::Guard(_))
    }
}

/// Top-level error type for silvasim.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Evaluation failure: {0}")]
    Step(#[from] StepFailure),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),
}

impl SimError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this error only removes one schedule alternative.
    #[must_use]
    pub const fn is_prunable(&self) -> bool {
        match self {
            Self::Step(failure) => failure.is_prunable(),
            Self::Config(_) | Self::Overlay(_) => false,
        }
    }
}

/// Result type alias for silvasim operations.
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_unknown_treatment_message() {
        let err = ConfigError::UnknownTreatment {
            name: "thinning".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Unknown treatment"));
        assert!(msg.contains("thinning"));
    }

    #[test]
    fn guard_failure_message_carries_context() {
        let err = GuardFailure {
            treatment: "clearcutting".to_string(),
            time_point: 2035,
            condition: "minimum age".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("clearcutting"));
        assert!(msg.contains("2035"));
        assert!(msg.contains("minimum age"));
    }

    #[test]
    fn execution_failure_is_wrapped_with_step_context() {
        let failure = StepFailure::Execution {
            treatment: "planting".to_string(),
            time_point: 2030,
            source: ExecutionError::invalid_state("no saplings"),
        };
        let msg = format!("{failure}");
        assert!(msg.contains("planting"));
        assert!(msg.contains("2030"));
        assert!(msg.contains("no saplings"));
        assert!(failure.is_prunable());
        assert!(!failure.is_guard());
    }

    #[test]
    fn guard_failure_is_prunable() {
        let failure = StepFailure::from(GuardFailure {
            treatment: "t".to_string(),
            time_point: 0,
            condition: "c".to_string(),
        });
        assert!(failure.is_prunable());
        assert!(failure.is_guard());
    }

    #[test]
    fn attribute_failure_is_not_prunable() {
        let failure = StepFailure::Attribute {
            treatment: "t".to_string(),
            time_point: 5,
            source: OverlayError::AttributeNotFound {
                attribute: "area".to_string(),
            },
        };
        assert!(!failure.is_prunable());

        let err: SimError = failure.into();
        assert!(!err.is_prunable());
    }

    #[test]
    fn sim_error_from_config() {
        let err: SimError = ConfigError::InvalidRepeat { count: 0 }.into();
        assert!(err.is_config());
        assert!(!err.is_prunable());
        assert!(format!("{err}").contains("positive integer"));
    }

    #[test]
    fn execution_error_from_config_error() {
        let config = ConfigError::MissingParameter {
            name: "stems_per_ha".to_string(),
        };
        let exec: ExecutionError = config.into();
        assert!(format!("{exec}").contains("stems_per_ha"));
    }
}
