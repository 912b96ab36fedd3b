//! Accessor for settings addressed by a caller-chosen key name.
//!
//! The namespace is passed per call; omitting it is an error because keys
//! alone are ambiguous across namespaces.

use crate::cache::SettingsCache;
use crate::model::setting::Owner;
use crate::model::value::{SettingMap, SettingValue};
use crate::repo::setting_repo::SettingRepository;
use crate::service::error::{SettingsError, SettingsResult};
use crate::service::settings_service::{non_blank, SettingsService};

/// One key bound to a service and an optional owner.
pub struct SettingEntry<'a, R: SettingRepository, C: SettingsCache> {
    service: &'a SettingsService<R, C>,
    key: String,
    owner: Option<&'a Owner>,
}

impl<'a, R: SettingRepository, C: SettingsCache> SettingEntry<'a, R, C> {
    pub(crate) fn new(
        service: &'a SettingsService<R, C>,
        key: String,
        owner: Option<&'a Owner>,
    ) -> Self {
        Self {
            service,
            key,
            owner,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the key in `namespace`.
    ///
    /// # Errors
    /// - `NamespaceNotProvided` when `namespace` is `None` or blank, even if
    ///   a default is registered for the key.
    pub fn get(&self, namespace: Option<&str>) -> SettingsResult<SettingValue> {
        let namespace = require_namespace(namespace)?;
        self.service.get(namespace, &self.key, self.owner)
    }

    /// Assigns the key in `namespace`.
    pub fn set(
        &self,
        namespace: Option<&str>,
        value: impl Into<SettingValue>,
    ) -> SettingsResult<SettingValue> {
        let namespace = require_namespace(namespace)?;
        self.service.set(namespace, &self.key, value, self.owner)
    }

    pub fn destroy(&self, namespace: Option<&str>) -> SettingsResult<bool> {
        let namespace = require_namespace(namespace)?;
        self.service.destroy(namespace, &self.key, self.owner)
    }

    pub fn merge(&self, namespace: Option<&str>, partial: SettingMap) -> SettingsResult<SettingMap> {
        let namespace = require_namespace(namespace)?;
        self.service
            .merge_into(namespace, &self.key, partial, self.owner)
    }
}

fn require_namespace(namespace: Option<&str>) -> SettingsResult<&str> {
    non_blank(namespace).ok_or(SettingsError::NamespaceNotProvided)
}
