//! Cumulative data collected from actions, keyed by action name.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Insertion-ordered map of action name to the value its `collect_data` hook returned.
///
/// The map only grows during a run. Storing a second value under the same
/// name replaces the first one in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CollectedData {
    entries: IndexMap<String, Value>,
}

impl CollectedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Deserialize the entry stored under `name`.
    ///
    /// Returns `Ok(None)` when no action stored data under that name.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.entries
            .get(name)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .with_context(|| format!("decode collected data for `{name}`"))
            })
            .transpose()
    }

    /// Look up a string field of an action's entry, e.g. `init.name`.
    pub fn str_field(&self, name: &str, field: &str) -> Option<&str> {
        self.entries.get(name)?.get(field)?.as_str()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for CollectedData {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut data = Self::new();
        for (name, value) in iter {
            data.insert(name, value);
        }
        data
    }
}
