//! Value types flowing through the simulation.
//!
//! Values cover attribute overrides in the layered overlay, treatment
//! parameters, and results stored in the collected-data store. Primitives,
//! lists, nested records and structured JSON data are supported.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Possible values an attribute, parameter or collected result can hold.
///
/// # Examples
///
/// ```
/// use silvasim::Value;
///
/// let bool_val = Value::Bool(true);
/// let float_val = Value::Float(2.0);
/// let string_val = Value::String("spruce".to_string());
///
/// assert!(bool_val.is_bool());
/// assert!(float_val.is_float());
/// assert!(string_val.is_string());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
    Structured(serde_json::Value),
    Null,
}

impl Value {
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub const fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Record(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Record(_) => "record",
            Self::Structured(_) => "structured",
            Self::Null => "null",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::List(v) => write!(f, "list[{}]", v.len()),
            Self::Record(v) => write!(f, "record[{}]", v.len()),
            Self::Structured(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Record(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Structured(v)
    }
}

/// Named parameters bound to a treatment at preparation time.
///
/// Parameter sets are declared in the simulation instructions and validated
/// when the schedule tree is built, not when a treatment runs. The typed
/// `require_*` accessors produce the configuration errors used for that
/// build-time validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Sets a parameter value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Looks up a parameter value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns true if no parameters are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of bound parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over parameter names and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Requires a float-valued parameter (ints are widened).
    pub fn require_float(&self, name: &str) -> Result<f64, ConfigError> {
        let value = self.require(name)?;
        value.as_float().ok_or_else(|| ConfigError::ParameterType {
            name: name.to_string(),
            expected: "float",
            actual: value.type_name(),
        })
    }

    /// Requires an integer-valued parameter.
    pub fn require_int(&self, name: &str) -> Result<i64, ConfigError> {
        let value = self.require(name)?;
        value.as_int().ok_or_else(|| ConfigError::ParameterType {
            name: name.to_string(),
            expected: "int",
            actual: value.type_name(),
        })
    }

    /// Requires a string-valued parameter.
    pub fn require_str(&self, name: &str) -> Result<&str, ConfigError> {
        let value = self.require(name)?;
        value.as_str().ok_or_else(|| ConfigError::ParameterType {
            name: name.to_string(),
            expected: "string",
            actual: value.type_name(),
        })
    }

    /// Requires a boolean-valued parameter.
    pub fn require_bool(&self, name: &str) -> Result<bool, ConfigError> {
        let value = self.require(name)?;
        value.as_bool().ok_or_else(|| ConfigError::ParameterType {
            name: name.to_string(),
            expected: "bool",
            actual: value.type_name(),
        })
    }

    fn require(&self, name: &str) -> Result<&Value, ConfigError> {
        self.0.get(name).ok_or_else(|| ConfigError::MissingParameter {
            name: name.to_string(),
        })
    }
}

impl FromIterator<(String, Value)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_float_widens_int() {
        let val = Value::Int(42);
        assert!(val.is_int());
        assert_eq!(val.as_int(), Some(42));
        assert_eq!(val.as_float(), Some(42.0));
        assert_eq!(val.type_name(), "int");
    }

    #[test]
    fn value_record_access() {
        let mut fields = BTreeMap::new();
        fields.insert("units".to_string(), Value::Float(2.0));
        let val = Value::Record(fields);
        assert!(val.is_record());
        assert_eq!(
            val.as_record().unwrap().get("units"),
            Some(&Value::Float(2.0))
        );
        assert_eq!(val.type_name(), "record");
    }

    #[test]
    fn value_display() {
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Float(2.5)), "2.5");
        assert_eq!(format!("{}", Value::String("hi".into())), "\"hi\"");
        assert_eq!(format!("{}", Value::Null), "null");
        assert_eq!(
            format!("{}", Value::List(vec![Value::Int(1), Value::Int(2)])),
            "list[2]"
        );
    }

    #[test]
    fn value_from_conversions() {
        let _: Value = true.into();
        let _: Value = 42i32.into();
        let _: Value = 42i64.into();
        let _: Value = 2.5f32.into();
        let _: Value = 2.5f64.into();
        let _: Value = "spruce".into();
        let _: Value = String::from("pine").into();
        let _: Value = vec![Value::Int(1)].into();
        let _: Value = serde_json::json!({"k": 1}).into();
    }

    #[test]
    fn value_serialization_round_trip() {
        let val = Value::List(vec![Value::Float(1.5), Value::String("x".into())]);
        let json = serde_json::to_string(&val).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(val, back);
    }

    #[test]
    fn value_type_mismatch() {
        let val = Value::Bool(true);
        assert!(val.as_int().is_none());
        assert!(val.as_float().is_none());
        assert!(val.as_str().is_none());
    }

    #[test]
    fn parameters_builder_and_lookup() {
        let params = Parameters::new()
            .with("stems_per_ha", 1200i64)
            .with("species", "spruce");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("species"), Some(&Value::String("spruce".into())));
        assert!(params.get("missing").is_none());
    }

    #[test]
    fn parameters_require_float_accepts_int() {
        let params = Parameters::new().with("basal_area", 24i64);
        assert_eq!(params.require_float("basal_area").unwrap(), 24.0);
    }

    #[test]
    fn parameters_require_missing() {
        let params = Parameters::new();
        let err = params.require_float("area").unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter { .. }));
    }

    #[test]
    fn parameters_require_type_mismatch() {
        let params = Parameters::new().with("area", "large");
        let err = params.require_float("area").unwrap_err();
        let ConfigError::ParameterType {
            name,
            expected,
            actual,
        } = err
        else {
            panic!("expected ParameterType, got {err:?}");
        };
        assert_eq!(name, "area");
        assert_eq!(expected, "float");
        assert_eq!(actual, "string");
    }
}
