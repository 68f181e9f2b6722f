//! Data handed from one task to a later one within a single run.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Mutable bag passed by reference through one pipeline run.
///
/// Single-threaded: the last task to write a key wins, and every later task
/// sees that value.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SharedState {
    values: BTreeMap<String, Value>,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Serialize `value` and store it under `key`.
    pub fn publish<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| Error::internal_json(e.to_string(), Some(format!("publish {}", key))))?;
        self.values.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.values)
            .map_err(|e| Error::internal_json(e.to_string(), Some("render shared state".to_string())))
    }
}
