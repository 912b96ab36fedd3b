//! Settings view bound to one owning entity.
//!
//! # Responsibility
//! - Expose the service operations with the owner argument fixed.
//! - List only the bound owner's records.
//!
//! # Invariants
//! - Every call addresses records of `owner` only; global records with the
//!   same namespace and key are never read or written through this view.

use crate::cache::SettingsCache;
use crate::model::setting::Owner;
use crate::model::value::{SettingMap, SettingValue};
use crate::repo::setting_repo::{SettingFilter, SettingRepository};
use crate::service::entry::SettingEntry;
use crate::service::error::SettingsResult;
use crate::service::settings_service::{non_blank, SettingsService};

/// Owner-scoped settings collection.
pub struct OwnerSettings<'a, R: SettingRepository, C: SettingsCache> {
    service: &'a SettingsService<R, C>,
    owner: Owner,
}

impl<'a, R: SettingRepository, C: SettingsCache> OwnerSettings<'a, R, C> {
    pub(crate) fn new(service: &'a SettingsService<R, C>, owner: Owner) -> Self {
        Self { service, owner }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn get(&self, namespace: &str, key: &str) -> SettingsResult<SettingValue> {
        self.service.get(namespace, key, Some(&self.owner))
    }

    pub fn set(
        &self,
        namespace: &str,
        key: &str,
        value: impl Into<SettingValue>,
    ) -> SettingsResult<SettingValue> {
        self.service.set(namespace, key, value, Some(&self.owner))
    }

    pub fn destroy(&self, namespace: &str, key: &str) -> SettingsResult<bool> {
        self.service.destroy(namespace, key, Some(&self.owner))
    }

    pub fn merge_into(
        &self,
        namespace: &str,
        key: &str,
        partial: SettingMap,
    ) -> SettingsResult<SettingMap> {
        self.service
            .merge_into(namespace, key, partial, Some(&self.owner))
    }

    pub fn save_default(
        &self,
        namespace: &str,
        key: &str,
        value: impl Into<SettingValue>,
    ) -> SettingsResult<bool> {
        self.service
            .save_default(namespace, key, value, Some(&self.owner))
    }

    /// Lists this owner's settings, optionally restricted to one namespace.
    pub fn all(&self, namespace: Option<&str>) -> SettingsResult<SettingMap> {
        self.service
            .collect(&SettingFilter::owned(&self.owner, non_blank(namespace)))
    }

    pub fn entry(&self, key: impl Into<String>) -> SettingEntry<'_, R, C> {
        SettingEntry::new(self.service, key.into(), Some(&self.owner))
    }
}
