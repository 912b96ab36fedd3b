//! Service-level error taxonomy.

use crate::codec::CodecError;
use crate::model::setting::{Owner, SettingValidationError};
use crate::repo::setting_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors surfaced by `SettingsService` and its views.
#[derive(Debug)]
pub enum SettingsError {
    /// A global accessor was used without naming a namespace.
    NamespaceNotProvided,
    /// Setting key is empty.
    InvalidKey,
    /// Owner identity is incomplete.
    InvalidOwner(SettingValidationError),
    /// `destroy` targeted an address with no record.
    SettingNotFound {
        namespace: String,
        key: String,
        owner: Option<Owner>,
    },
    /// `merge_into` target holds a non-map value.
    TypeMismatch {
        namespace: String,
        key: String,
        found: &'static str,
    },
    /// Stored value could not be encoded or decoded.
    Codec(CodecError),
    /// Store write failed; the cache was left untouched.
    Persist(RepoError),
    /// Store read or delete failed.
    Store(RepoError),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NamespaceNotProvided => write!(f, "setting namespace not provided"),
            Self::InvalidKey => write!(f, "setting key must not be empty"),
            Self::InvalidOwner(err) => write!(f, "{err}"),
            Self::SettingNotFound {
                namespace,
                key,
                owner: None,
            } => write!(
                f,
                "setting `{key}` with namespace `{namespace}` is not found"
            ),
            Self::SettingNotFound {
                namespace,
                key,
                owner: Some(owner),
            } => write!(
                f,
                "setting `{key}` with namespace `{namespace}` for owner `{owner}` is not found"
            ),
            Self::TypeMismatch {
                namespace,
                key,
                found,
            } => write!(
                f,
                "setting `{key}` with namespace `{namespace}` holds a {found}, cannot merge a map into it"
            ),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Persist(err) => write!(f, "failed to persist setting: {err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidOwner(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Persist(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for SettingsError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<SettingValidationError> for SettingsError {
    fn from(value: SettingValidationError) -> Self {
        match value {
            SettingValidationError::EmptyNamespace => Self::NamespaceNotProvided,
            SettingValidationError::EmptyKey => Self::InvalidKey,
            other => Self::InvalidOwner(other),
        }
    }
}

/// Read-side repository failures; write paths map to `Persist` explicitly.
impl From<RepoError> for SettingsError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}
