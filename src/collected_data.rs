//! Time-indexed, append-only storage for per-schedule reporting data.
//!
//! Every payload carries a [`CollectedData`] store. Treatments and
//! reporting operations append result values under string tags, either
//! keyed by time point (series) or as growable lists. Cloning the store at
//! a branch point copies only the tag containers: stored values are shared
//! behind `Arc` and are immutable once stored, which is what makes the
//! shallow copy sound.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::time::TimePoint;
use crate::value::Value;

/// An ordered time-to-value series for one report tag.
pub type Series = BTreeMap<TimePoint, Arc<Value>>;

/// Collected reporting data for one schedule.
///
/// The store holds three independent tag namespaces: time-indexed series,
/// append-only lists and freely nested records. Series and list values are
/// never mutated after storage; nested records are the deep-copy fallback
/// for data that is upserted in place.
#[derive(Debug, Clone)]
pub struct CollectedData {
    series: BTreeMap<String, Series>,
    lists: BTreeMap<String, Vec<Arc<Value>>>,
    records: BTreeMap<String, Value>,
    /// The time point treatments are currently storing under. Set by the
    /// treatment processor immediately before each step.
    pub current_time_point: TimePoint,
    initial_time_point: TimePoint,
}

impl CollectedData {
    /// Creates an empty store positioned at the initial time point.
    #[must_use]
    pub fn new(initial_time_point: TimePoint) -> Self {
        Self {
            series: BTreeMap::new(),
            lists: BTreeMap::new(),
            records: BTreeMap::new(),
            current_time_point: initial_time_point,
            initial_time_point,
        }
    }

    /// The time point the simulation started from.
    #[must_use]
    pub const fn initial_time_point(&self) -> TimePoint {
        self.initial_time_point
    }

    /// Stores `value` under `tag` at the current time point.
    ///
    /// A prior value at the same time point is overwritten.
    pub fn store(&mut self, tag: impl Into<String>, value: Value) {
        self.series
            .entry(tag.into())
            .or_default()
            .insert(self.current_time_point, Arc::new(value));
    }

    /// The time-indexed series stored under `tag`, if any.
    #[must_use]
    pub fn get_series(&self, tag: &str) -> Option<&Series> {
        self.series.get(tag)
    }

    /// The most recently stored value under `tag`.
    ///
    /// "Most recent" is the greatest stored time point; time points only
    /// advance during a run. Absent when the tag is unknown or empty.
    #[must_use]
    pub fn previous(&self, tag: &str) -> Option<&Value> {
        self.series
            .get(tag)?
            .last_key_value()
            .map(|(_, value)| value.as_ref())
    }

    /// The list stored under `tag`, empty if the tag is unknown.
    #[must_use]
    pub fn get_list_result(&self, tag: &str) -> &[Arc<Value>] {
        self.lists.get(tag).map_or(&[], Vec::as_slice)
    }

    /// Appends `values` to the list stored under `tag`, creating it on
    /// first use.
    pub fn extend_list_result(&mut self, tag: impl Into<String>, values: Vec<Value>) {
        self.lists
            .entry(tag.into())
            .or_default()
            .extend(values.into_iter().map(Arc::new));
    }

    /// The nested record stored under `tag`, if any.
    #[must_use]
    pub fn get_record(&self, tag: &str) -> Option<&Value> {
        self.records.get(tag)
    }

    /// Upserts `value` under a key path inside the record stored at `tag`.
    ///
    /// Missing intermediate records are created. When both the existing and
    /// the new value are records they are merged key by key; any other
    /// combination overwrites the existing value. An empty path targets the
    /// tag's root record.
    pub fn upsert_nested(&mut self, tag: impl Into<String>, path: &[&str], value: Value) {
        let root = self
            .records
            .entry(tag.into())
            .or_insert_with(|| Value::Record(BTreeMap::new()));
        upsert(root, path, value);
    }
}

fn upsert(slot: &mut Value, path: &[&str], value: Value) {
    match path.split_first() {
        None => merge(slot, value),
        Some((key, rest)) => {
            if !slot.is_record() {
                *slot = Value::Record(BTreeMap::new());
            }
            let Value::Record(fields) = slot else {
                unreachable!("slot was just coerced to a record");
            };
            let child = fields
                .entry((*key).to_string())
                .or_insert_with(|| Value::Record(BTreeMap::new()));
            upsert(child, rest, value);
        }
    }
}

fn merge(slot: &mut Value, value: Value) {
    match (slot, value) {
        (Value::Record(existing), Value::Record(incoming)) => {
            existing.extend(incoming);
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_inserts_at_current_time_point() {
        let mut data = CollectedData::new(2025);
        data.store("volume", Value::Float(120.0));
        data.current_time_point = 2030;
        data.store("volume", Value::Float(135.0));

        let series = data.get_series("volume").unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[&2025].as_ref(), &Value::Float(120.0));
        assert_eq!(series[&2030].as_ref(), &Value::Float(135.0));
    }

    #[test]
    fn store_overwrites_same_time_point() {
        let mut data = CollectedData::new(0);
        data.store("volume", Value::Float(1.0));
        data.store("volume", Value::Float(2.0));
        assert_eq!(data.get_series("volume").unwrap().len(), 1);
        assert_eq!(data.previous("volume"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn previous_returns_latest_or_absent() {
        let mut data = CollectedData::new(2025);
        assert!(data.previous("volume").is_none());

        data.store("volume", Value::Float(120.0));
        data.current_time_point = 2030;
        data.store("volume", Value::Float(135.0));

        assert_eq!(data.previous("volume"), Some(&Value::Float(135.0)));
        assert!(data.previous("unknown").is_none());
    }

    #[test]
    fn clone_isolates_series() {
        let mut original = CollectedData::new(2025);
        original.store("volume", Value::Float(120.0));

        let mut cloned = original.clone();
        cloned.current_time_point = 2030;
        cloned.store("volume", Value::Float(135.0));
        cloned.store("biomass", Value::Float(40.0));

        assert_eq!(original.get_series("volume").unwrap().len(), 1);
        assert!(original.get_series("biomass").is_none());
        assert_eq!(cloned.get_series("volume").unwrap().len(), 2);
    }

    #[test]
    fn clone_isolates_lists() {
        let mut original = CollectedData::new(0);
        original.extend_list_result("renewal", vec![Value::Float(1.0)]);

        let mut cloned = original.clone();
        cloned.extend_list_result("renewal", vec![Value::Float(2.0)]);

        assert_eq!(original.get_list_result("renewal").len(), 1);
        assert_eq!(cloned.get_list_result("renewal").len(), 2);
    }

    #[test]
    fn list_results_default_to_empty() {
        let data = CollectedData::new(0);
        assert!(data.get_list_result("renewal").is_empty());
    }

    #[test]
    fn initial_time_point_is_preserved() {
        let mut data = CollectedData::new(2025);
        data.current_time_point = 2040;
        assert_eq!(data.initial_time_point(), 2025);
        assert_eq!(data.clone().initial_time_point(), 2025);
    }

    #[test]
    fn upsert_nested_creates_and_merges() {
        let mut data = CollectedData::new(0);
        data.upsert_nested(
            "felled_trees",
            &["2030"],
            Value::Record(BTreeMap::from([(
                "pine".to_string(),
                Value::Float(10.0),
            )])),
        );
        data.upsert_nested(
            "felled_trees",
            &["2030"],
            Value::Record(BTreeMap::from([(
                "spruce".to_string(),
                Value::Float(5.0),
            )])),
        );

        let record = data.get_record("felled_trees").unwrap();
        let per_year = record.as_record().unwrap()["2030"].as_record().unwrap();
        assert_eq!(per_year["pine"], Value::Float(10.0));
        assert_eq!(per_year["spruce"], Value::Float(5.0));
    }

    #[test]
    fn upsert_nested_overwrites_non_record_values() {
        let mut data = CollectedData::new(0);
        data.upsert_nested("npv", &["rate_3"], Value::Float(1.0));
        data.upsert_nested("npv", &["rate_3"], Value::Float(2.0));

        let record = data.get_record("npv").unwrap();
        assert_eq!(record.as_record().unwrap()["rate_3"], Value::Float(2.0));
    }
}
