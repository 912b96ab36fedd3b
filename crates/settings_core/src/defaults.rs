//! Process-wide fallback values.
//!
//! # Responsibility
//! - Hold key -> value defaults consulted when no record exists.
//!
//! # Invariants
//! - Defaults have no namespace or owner dimension.
//! - Defaults are never persisted and never cached.
//! - A write is visible to the next read on any thread.

use crate::model::value::SettingValue;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

/// Mutable fallback table shared with `SettingsService` through `Arc`.
#[derive(Debug, Default)]
pub struct DefaultsRegistry {
    values: RwLock<BTreeMap<String, SettingValue>>,
}

impl DefaultsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry pre-filled from `(key, value)` pairs.
    pub fn with_defaults<I, K, V>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SettingValue>,
    {
        let values = defaults
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    /// Registers or replaces the default for `key`, returning the old one.
    pub fn set(&self, key: impl Into<String>, value: impl Into<SettingValue>) -> Option<SettingValue> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn remove(&self, key: &str) -> Option<SettingValue> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Copies the current table.
    pub fn snapshot(&self) -> BTreeMap<String, SettingValue> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
