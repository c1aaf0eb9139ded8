//! Period store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist inventory periods and their open → closed transition.
//! - Act as the authoritative guard for name uniqueness and the single open
//!   period rule, independent of any in-memory pre-checks.
//!
//! # Invariants
//! - Create and close run inside immediate transactions, so two writers on the
//!   same database cannot both pass the open-period check.
//! - Close only transitions rows currently `abierto`; `closed_at` is never
//!   earlier than `created_at`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::{ensure_connection_ready, DbError};
use crate::model::period::{
    normalize_period_name, Period, PeriodId, PeriodStatus, PeriodValidationError,
};
use log::{info, warn};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PERIOD_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    status,
    created_at,
    closed_at,
    created_by,
    total_movements,
    total_books
FROM inventory_periods";

const PERIOD_COLUMNS: &[&str] = &[
    "uuid",
    "name",
    "status",
    "created_at",
    "closed_at",
    "created_by",
    "total_movements",
    "total_books",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Business-rule violation detected by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodConflict {
    /// Another period already uses this name (case-insensitive, trimmed).
    DuplicateName(String),
    /// An open period already exists. Carries its name when known.
    ActivePeriodExists { active_name: Option<String> },
    /// Target period is already closed.
    AlreadyClosed(PeriodId),
}

impl Display for PeriodConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "a period named `{name}` already exists"),
            Self::ActivePeriodExists {
                active_name: Some(name),
            } => write!(f, "period `{name}` is still open; close it first"),
            Self::ActivePeriodExists { active_name: None } => {
                write!(f, "an open period already exists; close it first")
            }
            Self::AlreadyClosed(id) => write!(f, "period already closed: {id}"),
        }
    }
}

/// Generic repository error for period and catalog persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(PeriodValidationError),
    Db(DbError),
    NotFound(Uuid),
    Conflict(PeriodConflict),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Conflict(conflict) => write!(f, "{conflict}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<PeriodValidationError> for RepoError {
    fn from(value: PeriodValidationError) -> Self {
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

/// Persistence collaborator for the period lifecycle.
pub trait PeriodStore {
    /// Lists all periods, newest first.
    fn list_periods(&self) -> RepoResult<Vec<Period>>;
    /// Opens a new period. Rejects blank/duplicate names and a second open period.
    fn create_period(&self, name: &str, created_by: &str) -> RepoResult<Period>;
    /// Closes an open period and returns its updated state.
    fn close_period(&self, id: PeriodId) -> RepoResult<Period>;
}

/// SQLite-backed period store.
pub struct SqlitePeriodRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePeriodRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "inventory_periods", PERIOD_COLUMNS)?;
        Ok(Self { conn })
    }

    /// Gets one period by stable ID.
    pub fn get_period(&self, id: PeriodId) -> RepoResult<Option<Period>> {
        load_period(self.conn, id)
    }
}

impl PeriodStore for SqlitePeriodRepository<'_> {
    fn list_periods(&self) -> RepoResult<Vec<Period>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PERIOD_SELECT_SQL} ORDER BY created_at DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut periods = Vec::new();
        while let Some(row) = rows.next()? {
            periods.push(parse_period_row(row)?);
        }
        Ok(periods)
    }

    fn create_period(&self, name: &str, created_by: &str) -> RepoResult<Period> {
        let name = name.trim();
        let Some(normalized) = normalize_period_name(name) else {
            return Err(RepoError::Validation(PeriodValidationError::BlankName));
        };
        let created_by = created_by.trim();
        if created_by.is_empty() {
            return Err(RepoError::Validation(PeriodValidationError::BlankCreator));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let active_name: Option<String> = tx
            .query_row(
                "SELECT name FROM inventory_periods WHERE status = 'abierto' LIMIT 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(active_name) = active_name {
            return Err(RepoError::Conflict(PeriodConflict::ActivePeriodExists {
                active_name: Some(active_name),
            }));
        }

        if name_taken(&tx, &normalized)? {
            return Err(RepoError::Conflict(PeriodConflict::DuplicateName(
                name.to_string(),
            )));
        }

        let id = Uuid::new_v4();
        tx.execute(
            "INSERT INTO inventory_periods (uuid, name, status, created_by)
             VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), name, PeriodStatus::Open.label(), created_by],
        )
        .map_err(|err| map_insert_error(err, name))?;

        let period = load_period(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("created period {id} not found in read-back"))
        })?;
        tx.commit()?;

        info!(
            "event=period_store_create module=repo status=ok period_id={}",
            period.uuid
        );
        Ok(period)
    }

    fn close_period(&self, id: PeriodId) -> RepoResult<Period> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let Some(current) = load_period(&tx, id)? else {
            return Err(RepoError::NotFound(id));
        };
        if current.status == PeriodStatus::Closed {
            return Err(RepoError::Conflict(PeriodConflict::AlreadyClosed(id)));
        }

        let changed = tx.execute(
            "UPDATE inventory_periods
             SET
                status = ?2,
                closed_at = MAX(strftime('%s', 'now') * 1000, created_at)
             WHERE uuid = ?1
               AND status = ?3;",
            params![
                id.to_string(),
                PeriodStatus::Closed.label(),
                PeriodStatus::Open.label()
            ],
        )?;
        if changed == 0 {
            warn!("event=period_store_close module=repo status=error error_code=lost_update period_id={id}");
            return Err(RepoError::Conflict(PeriodConflict::AlreadyClosed(id)));
        }

        let period = load_period(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;

        info!(
            "event=period_store_close module=repo status=ok period_id={}",
            period.uuid
        );
        Ok(period)
    }
}

fn load_period(conn: &Connection, id: PeriodId) -> RepoResult<Option<Period>> {
    let mut stmt = conn.prepare(&format!("{PERIOD_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_period_row(row)?));
    }
    Ok(None)
}

fn name_taken(conn: &Connection, normalized: &str) -> RepoResult<bool> {
    // NOCASE only folds ASCII, so compare in Rust to cover accented names.
    let mut stmt = conn.prepare("SELECT name FROM inventory_periods;")?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let existing: String = row.get(0)?;
        if normalize_period_name(&existing).as_deref() == Some(normalized) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn map_insert_error(err: rusqlite::Error, name: &str) -> RepoError {
    if let rusqlite::Error::SqliteFailure(ref failure, Some(ref message)) = err {
        if failure.code == ErrorCode::ConstraintViolation {
            if message.contains("inventory_periods.status") {
                return RepoError::Conflict(PeriodConflict::ActivePeriodExists {
                    active_name: None,
                });
            }
            if message.contains("inventory_periods.name") {
                return RepoError::Conflict(PeriodConflict::DuplicateName(name.to_string()));
            }
        }
    }
    err.into()
}

pub(crate) fn parse_period_row(row: &Row<'_>) -> RepoResult<Period> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in inventory_periods.uuid"
        ))
    })?;

    let status_text: String = row.get("status")?;
    let status = PeriodStatus::from_label(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid status `{status_text}` in inventory_periods.status"
        ))
    })?;

    let period = Period {
        uuid,
        name: row.get("name")?,
        status,
        created_at: row.get("created_at")?,
        closed_at: row.get("closed_at")?,
        created_by: row.get("created_by")?,
        total_movements: row.get("total_movements")?,
        total_books: row.get("total_books")?,
    };
    period
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("period {uuid}: {err}")))?;
    Ok(period)
}
