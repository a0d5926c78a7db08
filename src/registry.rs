//! Treatment name resolution and build-time parameter validation.
//!
//! The declarative instruction list names treatments by string tag. The
//! registry binds those tags to entrypoint functions and optionally to a
//! parameter validator that runs when the schedule tree is built, so that
//! a malformed declaration fails the run before any evaluation starts.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::collected_data::CollectedData;
use crate::condition::Condition;
use crate::error::ConfigError;
use crate::processor::{TreatmentFn, TreatmentProcessor, TreatmentResult};
use crate::time::TimePoint;
use crate::value::Parameters;

/// Build-time validator for a treatment's declared parameters.
pub type ParameterValidator = Arc<dyn Fn(&Parameters) -> Result<(), ConfigError> + Send + Sync>;

/// The built-in no-op treatment, registered under `"do_nothing"`.
///
/// Useful as a placeholder step and as the simplest possible treatment.
pub fn do_nothing<U>(
    unit: U,
    _store: &mut CollectedData,
    _parameters: &Parameters,
) -> TreatmentResult<U> {
    Ok((unit, None))
}

struct TreatmentEntry<U> {
    entrypoint: TreatmentFn<U>,
    validator: Option<ParameterValidator>,
}

/// Lookup table from treatment name to entrypoint function.
pub struct TreatmentRegistry<U> {
    entries: BTreeMap<String, TreatmentEntry<U>>,
}

impl<U: 'static> Default for TreatmentRegistry<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U: 'static> TreatmentRegistry<U> {
    /// Creates a registry holding the built-in treatments.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            entries: BTreeMap::new(),
        };
        registry.register("do_nothing", do_nothing);
        registry
    }

    /// Registers a treatment entrypoint under `name`.
    ///
    /// Re-registering a name replaces the earlier entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        entrypoint: impl Fn(U, &mut CollectedData, &Parameters) -> TreatmentResult<U>
            + Send
            + Sync
            + 'static,
    ) {
        self.entries.insert(
            name.into(),
            TreatmentEntry {
                entrypoint: Arc::new(entrypoint),
                validator: None,
            },
        );
    }

    /// Registers a treatment together with a build-time parameter validator.
    pub fn register_validated(
        &mut self,
        name: impl Into<String>,
        entrypoint: impl Fn(U, &mut CollectedData, &Parameters) -> TreatmentResult<U>
            + Send
            + Sync
            + 'static,
        validator: impl Fn(&Parameters) -> Result<(), ConfigError> + Send + Sync + 'static,
    ) {
        self.entries.insert(
            name.into(),
            TreatmentEntry {
                entrypoint: Arc::new(entrypoint),
                validator: Some(Arc::new(validator)),
            },
        );
    }

    /// Returns true if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered treatment names, in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Prepares one processor for `name` at `time_point` with the given
    /// parameters and conditions.
    ///
    /// # Errors
    ///
    /// `ConfigError::UnknownTreatment` for an unregistered name, or
    /// whatever the treatment's validator rejects the parameters with.
    pub fn prepare(
        &self,
        name: &str,
        parameters: Parameters,
        time_point: TimePoint,
        preconditions: Vec<Condition<U>>,
        postconditions: Vec<Condition<U>>,
    ) -> Result<TreatmentProcessor<U>, ConfigError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTreatment {
                name: name.to_string(),
            })?;

        if let Some(validator) = &entry.validator {
            validator(&parameters)?;
        }

        Ok(TreatmentProcessor::new(
            name,
            Arc::clone(&entry.entrypoint),
            parameters,
            time_point,
            preconditions,
            postconditions,
        ))
    }
}
