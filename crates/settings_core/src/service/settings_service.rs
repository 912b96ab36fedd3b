//! Settings resolution service.
//!
//! # Responsibility
//! - Resolve reads through cache -> store -> defaults.
//! - Write to the store first, then write through to the cache.
//! - Provide map merge, listing and save-if-absent helpers.
//!
//! # Invariants
//! - A cached `NoValue` (explicit null) is returned as `Null` without
//!   consulting defaults; only a missing record falls through to defaults.
//! - Defaults are never written to the cache.
//! - The cache is only written after the store accepted the write.
//! - Cache failures degrade to store-only operation; store failures surface.
//!
//! # Concurrency
//! - Each call is one short cache/store sequence with no locking across it.
//!   Concurrent `set` calls on one address are last-writer-wins in the store
//!   and may leave the cache briefly stale.
//! - `merge_into` is read-modify-write and can lose updates under concurrent
//!   merges of the same address; callers needing atomic merges must serialize.

use crate::cache::{cache_key, CacheEntry, SettingsCache};
use crate::codec;
use crate::defaults::DefaultsRegistry;
use crate::model::setting::{validate_address, Owner, SettingRecord};
use crate::model::value::{SettingMap, SettingValue};
use crate::repo::setting_repo::{SettingFilter, SettingRepository};
use crate::service::entry::SettingEntry;
use crate::service::error::{SettingsError, SettingsResult};
use crate::service::owner_settings::OwnerSettings;
use log::{debug, error, warn};
use std::sync::Arc;

/// Settings facade over a record store, a cache and a defaults table.
pub struct SettingsService<R: SettingRepository, C: SettingsCache> {
    repo: R,
    cache: C,
    defaults: Arc<DefaultsRegistry>,
}

impl<R: SettingRepository, C: SettingsCache> SettingsService<R, C> {
    /// Creates a service; `defaults` stays shared with the host.
    pub fn new(repo: R, cache: C, defaults: Arc<DefaultsRegistry>) -> Self {
        Self {
            repo,
            cache,
            defaults,
        }
    }

    /// Shared defaults table consulted when no record exists.
    pub fn defaults(&self) -> &Arc<DefaultsRegistry> {
        &self.defaults
    }

    /// Cache sitting in front of the store.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Backing settings store.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Binds a view to one owner.
    pub fn for_owner(&self, owner: Owner) -> SettingsResult<OwnerSettings<'_, R, C>> {
        owner.validate()?;
        Ok(OwnerSettings::new(self, owner))
    }

    /// Accessor for a caller-chosen global key.
    pub fn entry(&self, key: impl Into<String>) -> SettingEntry<'_, R, C> {
        SettingEntry::new(self, key.into(), None)
    }

    /// Reads one setting.
    ///
    /// Returns the stored value, else the registered default for `key`,
    /// else `Null`.
    pub fn get(
        &self,
        namespace: &str,
        key: &str,
        owner: Option<&Owner>,
    ) -> SettingsResult<SettingValue> {
        validate(namespace, key, owner)?;

        if let Some(value) = self.lookup_stored(namespace, key, owner)? {
            return Ok(value);
        }

        let fallback = self.defaults.get(key);
        debug!(
            "event=setting_get module=settings status=ok source={} key={}",
            if fallback.is_some() { "default" } else { "none" },
            key
        );
        Ok(fallback.unwrap_or_default())
    }

    /// Writes one setting and returns the written value.
    ///
    /// # Errors
    /// - `Persist` when the store rejects the write; the cache is untouched.
    pub fn set(
        &self,
        namespace: &str,
        key: &str,
        value: impl Into<SettingValue>,
        owner: Option<&Owner>,
    ) -> SettingsResult<SettingValue> {
        validate(namespace, key, owner)?;
        let value = value.into();
        let encoded = codec::encode(&value)?;

        let mut record = self
            .repo
            .find_one(namespace, key, owner)?
            .unwrap_or_else(|| SettingRecord::new(namespace, key, owner.cloned()));
        record.encoded_value = encoded;

        if let Err(err) = self.repo.create_or_update(&record) {
            error!(
                "event=setting_set module=settings status=error error_code=persist_failed key={} error={}",
                key, err
            );
            return Err(SettingsError::Persist(err));
        }

        self.cache_write(&cache_key(namespace, key, owner), CacheEntry::from_value(&value));
        debug!(
            "event=setting_set module=settings status=ok key={} kind={}",
            key,
            value.kind_name()
        );
        Ok(value)
    }

    /// Deletes one setting record and its cache entry.
    ///
    /// # Errors
    /// - `SettingNotFound` when no record exists for the address.
    pub fn destroy(&self, namespace: &str, key: &str, owner: Option<&Owner>) -> SettingsResult<bool> {
        validate(namespace, key, owner)?;

        let record = self.repo.find_one(namespace, key, owner)?.ok_or_else(|| {
            SettingsError::SettingNotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
                owner: owner.cloned(),
            }
        })?;

        self.repo.delete(&record).map_err(SettingsError::Persist)?;
        self.cache_remove(&cache_key(namespace, key, owner));
        debug!("event=setting_destroy module=settings status=ok key={}", key);
        Ok(true)
    }

    /// Overlays `partial` onto the current map value and returns the result.
    ///
    /// A `Null` current value merges as an empty map. The merged map is only
    /// written when it differs from the current value. Not atomic: two
    /// concurrent merges of one address can lose an update.
    ///
    /// # Errors
    /// - `TypeMismatch` when the current value is neither `Null` nor a map.
    pub fn merge_into(
        &self,
        namespace: &str,
        key: &str,
        partial: SettingMap,
        owner: Option<&Owner>,
    ) -> SettingsResult<SettingMap> {
        let current = match self.get(namespace, key, owner)? {
            SettingValue::Null => SettingMap::new(),
            SettingValue::Map(map) => map,
            other => {
                return Err(SettingsError::TypeMismatch {
                    namespace: namespace.to_string(),
                    key: key.to_string(),
                    found: other.kind_name(),
                });
            }
        };

        let mut merged = current.clone();
        merged.extend(partial);
        if merged != current {
            self.set(namespace, key, SettingValue::Map(merged.clone()), owner)?;
        }

        Ok(merged)
    }

    /// Lists global settings, optionally restricted to one namespace.
    ///
    /// Without a namespace, equal keys from different namespaces collapse
    /// and the record stored last wins.
    pub fn all(&self, namespace: Option<&str>) -> SettingsResult<SettingMap> {
        self.collect(&SettingFilter::global(non_blank(namespace)))
    }

    /// Writes `value` only when nothing non-null is stored yet.
    ///
    /// Registered defaults are ignored by this check. Returns whether a write
    /// happened.
    pub fn save_default(
        &self,
        namespace: &str,
        key: &str,
        value: impl Into<SettingValue>,
        owner: Option<&Owner>,
    ) -> SettingsResult<bool> {
        validate(namespace, key, owner)?;

        let stored = self.lookup_stored(namespace, key, owner)?;
        if stored.is_some_and(|value| !value.is_null()) {
            return Ok(false);
        }

        self.set(namespace, key, value, owner)?;
        Ok(true)
    }

    pub(crate) fn collect(&self, filter: &SettingFilter) -> SettingsResult<SettingMap> {
        let mut values = SettingMap::new();
        for record in self.repo.find_all(filter)? {
            let value = codec::decode(record.encoded_value.as_deref())?;
            values.insert(record.key, value);
        }
        Ok(values)
    }

    /// Cache then store; `None` means no record exists.
    fn lookup_stored(
        &self,
        namespace: &str,
        key: &str,
        owner: Option<&Owner>,
    ) -> SettingsResult<Option<SettingValue>> {
        let cache_key = cache_key(namespace, key, owner);
        if let Some(entry) = self.cache_read(&cache_key) {
            debug!(
                "event=setting_get module=settings status=ok source=cache key={}",
                key
            );
            return Ok(Some(entry.into_value()));
        }

        let Some(record) = self.repo.find_one(namespace, key, owner)? else {
            return Ok(None);
        };

        let value = codec::decode(record.encoded_value.as_deref())?;
        self.cache_write(&cache_key, CacheEntry::from_value(&value));
        debug!(
            "event=setting_get module=settings status=ok source=store key={}",
            key
        );
        Ok(Some(value))
    }

    fn cache_read(&self, cache_key: &str) -> Option<CacheEntry> {
        match self.cache.get(cache_key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("event=cache_get module=settings status=degraded error={err}");
                None
            }
        }
    }

    fn cache_write(&self, cache_key: &str, entry: CacheEntry) {
        if let Err(err) = self.cache.set(cache_key, entry) {
            warn!("event=cache_set module=settings status=degraded error={err}");
        }
    }

    fn cache_remove(&self, cache_key: &str) {
        if let Err(err) = self.cache.delete(cache_key) {
            warn!("event=cache_delete module=settings status=degraded error={err}");
        }
    }
}

fn validate(namespace: &str, key: &str, owner: Option<&Owner>) -> SettingsResult<()> {
    validate_address(namespace, key)?;
    if let Some(owner) = owner {
        owner.validate()?;
    }
    Ok(())
}

pub(crate) fn non_blank(namespace: Option<&str>) -> Option<&str> {
    namespace.filter(|value| !value.trim().is_empty())
}
