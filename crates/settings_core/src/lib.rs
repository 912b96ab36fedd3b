//! Namespaced settings store with a write-through cache.
//!
//! Settings are addressed by `(namespace, key)` and optionally bound to an
//! owning entity. Reads resolve through cache, then SQLite, then a shared
//! defaults table.

pub mod cache;
pub mod codec;
pub mod config;
pub mod db;
pub mod defaults;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use cache::{cache_key, CacheEntry, CacheError, InMemoryCache, NoopCache, SettingsCache};
pub use codec::{decode, encode, CodecError};
pub use config::{ConfigError, CoreConfig};
pub use defaults::DefaultsRegistry;
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::setting::{Owner, SettingId, SettingRecord, SettingScope, SettingValidationError};
pub use model::value::{SettingMap, SettingValue};
pub use repo::setting_repo::{
    RepoError, RepoResult, SettingFilter, SettingRepository, SqliteSettingRepository,
};
pub use service::entry::SettingEntry;
pub use service::error::{SettingsError, SettingsResult};
pub use service::owner_settings::OwnerSettings;
pub use service::settings_service::SettingsService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
