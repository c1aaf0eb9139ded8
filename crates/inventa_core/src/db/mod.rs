//! SQLite storage for periods and the book catalog.
//!
//! # Responsibility
//! - Open configured, fully migrated connections.
//! - Let repositories reject connections that did not come from [`open_db`].
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - No repository reads or writes before migrations succeed.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage bootstrap or schema error.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// On-disk schema was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
    /// Connection was not migrated to the version this build expects.
    SchemaMismatch { expected: u32, found: u32 },
    MissingTable(&'static str),
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "schema version {found} is newer than this build supports ({supported})"
            ),
            Self::SchemaMismatch { expected, found } => write!(
                f,
                "connection is at schema version {found}, expected {expected}; open it with open_db"
            ),
            Self::MissingTable(table) => write!(f, "table `{table}` does not exist"),
            Self::MissingColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        if let Self::Sqlite(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Checks that `conn` is at the current schema version and that `table`
/// carries every name in `columns`.
///
/// Repository constructors call this so a raw connection fails up front.
pub fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> DbResult<()> {
    let expected = migrations::latest_version();
    let found = migrations::schema_version(conn)?;
    if found != expected {
        return Err(DbError::SchemaMismatch { expected, found });
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let present = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if present.is_empty() {
        return Err(DbError::MissingTable(table));
    }
    if let Some(column) = columns
        .iter()
        .copied()
        .find(|column| !present.iter().any(|name| name == column))
    {
        return Err(DbError::MissingColumn { table, column });
    }
    Ok(())
}
