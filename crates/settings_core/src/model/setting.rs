//! Setting record model.
//!
//! # Responsibility
//! - Define the persisted `SettingRecord` shape and owner identity.
//! - Validate addressing fields before they reach storage or cache.
//!
//! # Invariants
//! - `namespace` and `key` are non-empty after trimming.
//! - An owner has both `owner_type` and `owner_id`, never just one.
//! - `encoded_value = None` means an explicitly stored null.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of one persisted setting row.
pub type SettingId = Uuid;

/// Identity of the entity a setting belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Owner {
    /// Entity kind, e.g. `user` or `workspace`.
    pub owner_type: String,
    /// Entity id in string form.
    pub owner_id: String,
}

impl Owner {
    pub fn new(owner_type: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
        }
    }

    pub fn validate(&self) -> Result<(), SettingValidationError> {
        if self.owner_type.trim().is_empty() {
            return Err(SettingValidationError::EmptyOwnerType);
        }
        if self.owner_id.trim().is_empty() {
            return Err(SettingValidationError::EmptyOwnerId);
        }
        Ok(())
    }
}

impl Display for Owner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.owner_type, self.owner_id)
    }
}

/// Which records a query or listing covers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SettingScope {
    /// Records without an owner.
    #[default]
    Global,
    /// Records bound to exactly this owner.
    Owned(Owner),
}

impl SettingScope {
    pub fn owner(&self) -> Option<&Owner> {
        match self {
            Self::Global => None,
            Self::Owned(owner) => Some(owner),
        }
    }
}

impl From<Option<&Owner>> for SettingScope {
    fn from(value: Option<&Owner>) -> Self {
        value.map_or(Self::Global, |owner| Self::Owned(owner.clone()))
    }
}

/// Validation errors for setting addressing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValidationError {
    EmptyNamespace,
    EmptyKey,
    EmptyOwnerType,
    EmptyOwnerId,
}

impl Display for SettingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyNamespace => write!(f, "setting namespace must not be empty"),
            Self::EmptyKey => write!(f, "setting key must not be empty"),
            Self::EmptyOwnerType => write!(f, "owner type must not be empty"),
            Self::EmptyOwnerId => write!(f, "owner id must not be empty"),
        }
    }
}

impl Error for SettingValidationError {}

/// Persisted setting row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingRecord {
    pub id: SettingId,
    pub namespace: String,
    pub key: String,
    /// Codec output; `None` stores an explicit null.
    pub encoded_value: Option<String>,
    /// `None` for global settings.
    pub owner: Option<Owner>,
    /// Epoch milliseconds, assigned by the store.
    pub created_at: i64,
    /// Epoch milliseconds, bumped by the store on every write.
    pub updated_at: i64,
}

impl SettingRecord {
    /// Creates an unsaved record shell with a fresh id.
    ///
    /// Timestamps stay `0` until the store persists the record.
    pub fn new(namespace: impl Into<String>, key: impl Into<String>, owner: Option<Owner>) -> Self {
        Self {
            id: Uuid::new_v4(),
            namespace: namespace.into(),
            key: key.into(),
            encoded_value: None,
            owner,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn is_global(&self) -> bool {
        self.owner.is_none()
    }

    pub fn validate(&self) -> Result<(), SettingValidationError> {
        validate_address(&self.namespace, &self.key)?;
        if let Some(owner) = &self.owner {
            owner.validate()?;
        }
        Ok(())
    }
}

/// Checks the `(namespace, key)` pair used to address a setting.
pub fn validate_address(namespace: &str, key: &str) -> Result<(), SettingValidationError> {
    if namespace.trim().is_empty() {
        return Err(SettingValidationError::EmptyNamespace);
    }
    if key.trim().is_empty() {
        return Err(SettingValidationError::EmptyKey);
    }
    Ok(())
}
