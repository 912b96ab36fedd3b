//! Setting repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide find/list/upsert/delete APIs over the `settings` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `SettingRecord::validate()` before SQL mutations.
//! - Global lookups only match rows with both owner columns `NULL`.
//! - Listing order is insertion order (`rowid ASC`).
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::setting::{
    Owner, SettingId, SettingRecord, SettingScope, SettingValidationError,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const SETTING_SELECT_SQL: &str = "SELECT
    uuid,
    namespace,
    key,
    value,
    owner_type,
    owner_id,
    created_at,
    updated_at
FROM settings";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for setting persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(SettingValidationError),
    Db(DbError),
    NotFound(SettingId),
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "setting record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted setting data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "setting repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "setting repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<SettingValidationError> for RepoError {
    fn from(value: SettingValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Filter for listing setting records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingFilter {
    /// Restrict to one namespace when set.
    pub namespace: Option<String>,
    /// Global rows or one owner's rows.
    pub scope: SettingScope,
}

impl SettingFilter {
    pub fn global(namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            scope: SettingScope::Global,
        }
    }

    pub fn owned(owner: &Owner, namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            scope: SettingScope::Owned(owner.clone()),
        }
    }
}

/// Record store interface consumed by the settings service.
pub trait SettingRepository {
    /// Finds the record addressed by `(namespace, key, owner)`.
    fn find_one(
        &self,
        namespace: &str,
        key: &str,
        owner: Option<&Owner>,
    ) -> RepoResult<Option<SettingRecord>>;
    /// Lists records matching `filter` in insertion order.
    fn find_all(&self, filter: &SettingFilter) -> RepoResult<Vec<SettingRecord>>;
    /// Inserts or updates `record` by id and returns the stored row.
    fn create_or_update(&self, record: &SettingRecord) -> RepoResult<SettingRecord>;
    /// Deletes `record` by id.
    fn delete(&self, record: &SettingRecord) -> RepoResult<()>;
}

impl<T: SettingRepository + ?Sized> SettingRepository for &T {
    fn find_one(
        &self,
        namespace: &str,
        key: &str,
        owner: Option<&Owner>,
    ) -> RepoResult<Option<SettingRecord>> {
        (**self).find_one(namespace, key, owner)
    }

    fn find_all(&self, filter: &SettingFilter) -> RepoResult<Vec<SettingRecord>> {
        (**self).find_all(filter)
    }

    fn create_or_update(&self, record: &SettingRecord) -> RepoResult<SettingRecord> {
        (**self).create_or_update(record)
    }

    fn delete(&self, record: &SettingRecord) -> RepoResult<()> {
        (**self).delete(record)
    }
}

/// SQLite-backed setting repository.
pub struct SqliteSettingRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// Fails when the connection has not been opened through `db::open_*`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_settings_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn get_by_id(&self, id: SettingId) -> RepoResult<Option<SettingRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SETTING_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_setting_row(row)?));
        }
        Ok(None)
    }
}

impl SettingRepository for SqliteSettingRepository<'_> {
    fn find_one(
        &self,
        namespace: &str,
        key: &str,
        owner: Option<&Owner>,
    ) -> RepoResult<Option<SettingRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SETTING_SELECT_SQL}
             WHERE namespace = ?1
               AND key = ?2
               AND owner_type IS ?3
               AND owner_id IS ?4
             LIMIT 1;"
        ))?;

        let mut rows = stmt.query(params![
            namespace,
            key,
            owner.map(|owner| owner.owner_type.as_str()),
            owner.map(|owner| owner.owner_id.as_str()),
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_setting_row(row)?));
        }

        Ok(None)
    }

    fn find_all(&self, filter: &SettingFilter) -> RepoResult<Vec<SettingRecord>> {
        let mut sql = format!("{SETTING_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        match &filter.scope {
            SettingScope::Global => {
                sql.push_str(" AND owner_type IS NULL AND owner_id IS NULL");
            }
            SettingScope::Owned(owner) => {
                sql.push_str(" AND owner_type = ? AND owner_id = ?");
                bind_values.push(Value::Text(owner.owner_type.clone()));
                bind_values.push(Value::Text(owner.owner_id.clone()));
            }
        }

        if let Some(namespace) = &filter.namespace {
            sql.push_str(" AND namespace = ?");
            bind_values.push(Value::Text(namespace.clone()));
        }

        sql.push_str(" ORDER BY rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            records.push(parse_setting_row(row)?);
        }

        Ok(records)
    }

    fn create_or_update(&self, record: &SettingRecord) -> RepoResult<SettingRecord> {
        record.validate()?;

        let owner_type = record.owner.as_ref().map(|owner| owner.owner_type.as_str());
        let owner_id = record.owner.as_ref().map(|owner| owner.owner_id.as_str());

        self.conn.execute(
            "INSERT INTO settings (
                uuid,
                namespace,
                key,
                value,
                owner_type,
                owner_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(uuid) DO UPDATE SET
                namespace = excluded.namespace,
                key = excluded.key,
                value = excluded.value,
                owner_type = excluded.owner_type,
                owner_id = excluded.owner_id,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                record.id.to_string(),
                record.namespace.as_str(),
                record.key.as_str(),
                record.encoded_value.as_deref(),
                owner_type,
                owner_id,
            ],
        )?;

        self.get_by_id(record.id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("setting `{}` missing after write", record.id))
        })
    }

    fn delete(&self, record: &SettingRecord) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM settings WHERE uuid = ?1;", [record.id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(record.id));
        }

        Ok(())
    }
}

fn parse_setting_row(row: &Row<'_>) -> RepoResult<SettingRecord> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in settings.uuid"))
    })?;

    let owner_type: Option<String> = row.get("owner_type")?;
    let owner_id: Option<String> = row.get("owner_id")?;
    let owner = match (owner_type, owner_id) {
        (None, None) => None,
        (Some(owner_type), Some(owner_id)) => Some(Owner {
            owner_type,
            owner_id,
        }),
        _ => {
            return Err(RepoError::InvalidData(format!(
                "setting `{id}` has a partial owner in settings.owner_type/owner_id"
            )));
        }
    };

    let record = SettingRecord {
        id,
        namespace: row.get("namespace")?,
        key: row.get("key")?,
        encoded_value: row.get("value")?,
        owner,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    record.validate()?;
    Ok(record)
}

fn ensure_settings_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let exists: Option<i64> = conn
        .query_row(
            "SELECT 1
             FROM sqlite_master
             WHERE type = 'table' AND name = 'settings';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(RepoError::MissingRequiredTable("settings"));
    }

    Ok(())
}
