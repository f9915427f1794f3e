// crates/siac-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Widget State Store
// Description: Durable WidgetStateStore backed by SQLite.
// Purpose: Persist per-subject widget preferences across restarts.
// Dependencies: siac-gate-core, rusqlite, serde, thiserror, time
// ============================================================================

//! ## Overview
//! One row per subject holds each preference field next to the RFC 3339
//! timestamp of the write that set it. `set` reads, merges, and writes inside
//! an `IMMEDIATE` transaction so concurrent writers (including other
//! processes sharing the file) serialize on the merge step.
//! Security posture: database contents are untrusted and decoded fail-closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use siac_gate_core::SelectedMetric;
use siac_gate_core::Stamped;
use siac_gate_core::SubjectId;
use siac_gate_core::TimeFilter;
use siac_gate_core::WidgetState;
use siac_gate_core::WidgetStateRecord;
use siac_gate_core::WidgetStateStore;
use siac_gate_core::WidgetStateUpdate;
use siac_gate_core::WidgetStoreError;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    #[default]
    Full,
    /// Normal synchronous mode.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` widget state store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Config with default pragmas for `path`.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store configuration or input.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for WidgetStoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupted(message),
            SqliteStoreError::Db(message)
            | SqliteStoreError::VersionMismatch(message)
            | SqliteStoreError::Invalid(message) => Self::Store(message),
        }
    }
}

/// Maps a rusqlite error into a store error.
fn db(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed widget state store.
#[derive(Clone)]
pub struct SqliteWidgetStateStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteWidgetStateStore {
    /// Opens (creating if needed) the store at `config.path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Loads the stored record for `subject_id`.
    fn load_record(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Option<WidgetStateRecord>, SqliteStoreError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let row = read_row(&guard, subject_id)?;
        drop(guard);
        row.map(|row| row.decode(subject_id)).transpose()
    }

    /// Merges `update` under an immediate transaction.
    fn merge_record(
        &self,
        subject_id: &SubjectId,
        update: &WidgetStateUpdate,
    ) -> Result<WidgetStateRecord, SqliteStoreError> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))?;
        let tx = guard.transaction_with_behavior(TransactionBehavior::Immediate).map_err(db)?;
        let mut record = match read_row(&tx, subject_id)? {
            Some(row) => row.decode(subject_id)?,
            None => WidgetStateRecord::default(),
        };
        if record.merge(update) {
            tx.execute(
                "INSERT INTO widget_state (subject_id, time_filter, time_filter_at, \
                 selected_metric, selected_metric_at) VALUES (?1, ?2, ?3, ?4, ?5) \
                 ON CONFLICT(subject_id) DO UPDATE SET time_filter = excluded.time_filter, \
                 time_filter_at = excluded.time_filter_at, selected_metric = \
                 excluded.selected_metric, selected_metric_at = excluded.selected_metric_at",
                params![
                    subject_id.as_str(),
                    record.time_filter.value.as_str(),
                    format_stamp(record.time_filter.written_at)?,
                    record.selected_metric.value.as_str(),
                    format_stamp(record.selected_metric.written_at)?,
                ],
            )
            .map_err(db)?;
        }
        tx.commit().map_err(db)?;
        drop(guard);
        Ok(record)
    }
}

impl WidgetStateStore for SqliteWidgetStateStore {
    fn get(&self, subject_id: &SubjectId) -> Result<WidgetState, WidgetStoreError> {
        let record = self.load_record(subject_id)?;
        Ok(record.map_or_else(
            || WidgetState::default_for(subject_id.clone()),
            |record| record.to_state(subject_id.clone()),
        ))
    }

    fn set(
        &self,
        subject_id: &SubjectId,
        update: &WidgetStateUpdate,
    ) -> Result<WidgetState, WidgetStoreError> {
        let record = self.merge_record(subject_id, update)?;
        Ok(record.to_state(subject_id.clone()))
    }
}

// ============================================================================
// SECTION: Row Codec
// ============================================================================

/// Raw column values for one subject.
struct StoredRow {
    /// Time filter literal.
    time_filter: String,
    /// Time filter write timestamp.
    time_filter_at: Option<String>,
    /// Selected metric literal.
    selected_metric: String,
    /// Selected metric write timestamp.
    selected_metric_at: Option<String>,
}

impl StoredRow {
    /// Decodes the row, failing closed on unknown literals or timestamps.
    fn decode(self, subject_id: &SubjectId) -> Result<WidgetStateRecord, SqliteStoreError> {
        let corrupt = |field: &str| {
            SqliteStoreError::Corrupt(format!("invalid {field} for subject {subject_id}"))
        };
        let time_filter = TimeFilter::parse(&self.time_filter).ok_or_else(|| corrupt("time_filter"))?;
        let selected_metric =
            SelectedMetric::parse(&self.selected_metric).ok_or_else(|| corrupt("selected_metric"))?;
        Ok(WidgetStateRecord {
            time_filter: Stamped {
                value: time_filter,
                written_at: parse_stamp(self.time_filter_at.as_deref())
                    .map_err(|()| corrupt("time_filter_at"))?,
            },
            selected_metric: Stamped {
                value: selected_metric,
                written_at: parse_stamp(self.selected_metric_at.as_deref())
                    .map_err(|()| corrupt("selected_metric_at"))?,
            },
        })
    }
}

/// Reads the row for `subject_id`.
fn read_row(
    connection: &Connection,
    subject_id: &SubjectId,
) -> Result<Option<StoredRow>, SqliteStoreError> {
    connection
        .query_row(
            "SELECT time_filter, time_filter_at, selected_metric, selected_metric_at FROM \
             widget_state WHERE subject_id = ?1",
            params![subject_id.as_str()],
            |row| {
                Ok(StoredRow {
                    time_filter: row.get(0)?,
                    time_filter_at: row.get(1)?,
                    selected_metric: row.get(2)?,
                    selected_metric_at: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(db)
}

/// Formats an optional timestamp as RFC 3339.
fn format_stamp(value: Option<OffsetDateTime>) -> Result<Option<String>, SqliteStoreError> {
    value
        .map(|at| at.format(&Rfc3339).map_err(|err| SqliteStoreError::Invalid(err.to_string())))
        .transpose()
}

/// Parses an optional RFC 3339 timestamp.
fn parse_stamp(value: Option<&str>) -> Result<Option<OffsetDateTime>, ()> {
    value.map(|text| OffsetDateTime::parse(text, &Rfc3339).map_err(|_| ())).transpose()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db)?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db)?;
    Ok(connection)
}

/// Creates the schema or checks the stored version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db)?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS widget_state (
                    subject_id TEXT PRIMARY KEY,
                    time_filter TEXT NOT NULL,
                    time_filter_at TEXT,
                    selected_metric TEXT NOT NULL,
                    selected_metric_at TEXT
                );",
            )
            .map_err(db)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db)?;
    Ok(())
}
