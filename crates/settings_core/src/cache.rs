//! Cache adapter contracts and in-process implementations.
//!
//! # Responsibility
//! - Define the get/set/delete cache contract used by the settings service.
//! - Derive collision-free cache keys from setting addresses.
//! - Provide an in-memory cache and a no-op cache.
//!
//! # Invariants
//! - `CacheEntry::NoValue` marks an explicitly stored null and is distinct
//!   from a miss (`Ok(None)`).
//! - Cache keys are length-prefixed, so two distinct addresses never share
//!   a key regardless of the characters they contain.
//! - Cache failures are recoverable; callers degrade to the store.

use crate::model::setting::Owner;
use crate::model::value::SettingValue;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

const CACHE_KEY_PREFIX: &str = "settings:";

pub type CacheResult<T> = Result<T, CacheError>;

/// Cached state for one setting address.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheEntry {
    /// Decoded non-null value.
    Value(SettingValue),
    /// The store holds an explicit null for this address.
    NoValue,
}

impl CacheEntry {
    /// Builds the entry that represents `value` in the cache.
    pub fn from_value(value: &SettingValue) -> Self {
        if value.is_null() {
            Self::NoValue
        } else {
            Self::Value(value.clone())
        }
    }

    pub fn into_value(self) -> SettingValue {
        match self {
            Self::Value(value) => value,
            Self::NoValue => SettingValue::Null,
        }
    }
}

/// Cache backend failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    Unavailable(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "cache unavailable: {message}"),
        }
    }
}

impl Error for CacheError {}

/// Key-value cache consumed by the settings service.
pub trait SettingsCache {
    /// Returns `Ok(None)` on a miss.
    fn get(&self, cache_key: &str) -> CacheResult<Option<CacheEntry>>;
    fn set(&self, cache_key: &str, entry: CacheEntry) -> CacheResult<()>;
    fn delete(&self, cache_key: &str) -> CacheResult<()>;
}

impl<T: SettingsCache + ?Sized> SettingsCache for &T {
    fn get(&self, cache_key: &str) -> CacheResult<Option<CacheEntry>> {
        (**self).get(cache_key)
    }

    fn set(&self, cache_key: &str, entry: CacheEntry) -> CacheResult<()> {
        (**self).set(cache_key, entry)
    }

    fn delete(&self, cache_key: &str) -> CacheResult<()> {
        (**self).delete(cache_key)
    }
}

/// Derives the cache key for one setting address.
///
/// Layout: `settings:<len>:<key>|<len>:<namespace>` with
/// `|owner:<len>:<type>|<len>:<id>` appended for owned settings.
pub fn cache_key(namespace: &str, key: &str, owner: Option<&Owner>) -> String {
    let mut out = String::with_capacity(
        CACHE_KEY_PREFIX.len() + namespace.len() + key.len() + 16,
    );
    out.push_str(CACHE_KEY_PREFIX);
    push_component(&mut out, key);
    out.push('|');
    push_component(&mut out, namespace);
    if let Some(owner) = owner {
        out.push_str("|owner:");
        push_component(&mut out, &owner.owner_type);
        out.push('|');
        push_component(&mut out, &owner.owner_id);
    }
    out
}

fn push_component(out: &mut String, value: &str) {
    out.push_str(&value.len().to_string());
    out.push(':');
    out.push_str(value);
}

/// Process-local cache backed by a mutex-guarded map.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    available: AtomicBool,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Toggles simulated availability; while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> CacheResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable("in-memory cache disabled".to_string()))
        }
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, HashMap<String, CacheEntry>>> {
        self.ensure_available()?;
        self.entries
            .lock()
            .map_err(|_| CacheError::Unavailable("in-memory cache lock poisoned".to_string()))
    }
}

impl SettingsCache for InMemoryCache {
    fn get(&self, cache_key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.lock()?.get(cache_key).cloned())
    }

    fn set(&self, cache_key: &str, entry: CacheEntry) -> CacheResult<()> {
        self.lock()?.insert(cache_key.to_string(), entry);
        Ok(())
    }

    fn delete(&self, cache_key: &str) -> CacheResult<()> {
        self.lock()?.remove(cache_key);
        Ok(())
    }
}

/// Cache that never stores anything; every read is a miss.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl SettingsCache for NoopCache {
    fn get(&self, _cache_key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(None)
    }

    fn set(&self, _cache_key: &str, _entry: CacheEntry) -> CacheResult<()> {
        Ok(())
    }

    fn delete(&self, _cache_key: &str) -> CacheResult<()> {
        Ok(())
    }
}
