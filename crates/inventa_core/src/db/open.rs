//! Connection opening and per-connection setup.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::logging::log_value;
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Location {
    File(PathBuf),
    Memory,
}

impl Location {
    fn kind(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        match self {
            Self::File(path) => Connection::open(path),
            Self::Memory => Connection::open_in_memory(),
        }
    }
}

/// Opens (creating when missing) the database at `path` and migrates it.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open(Location::File(path.as_ref().to_path_buf()))
}

/// Opens a private in-memory database and migrates it.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open(Location::Memory)
}

fn open(location: Location) -> DbResult<Connection> {
    let started = Instant::now();
    let result = location
        .connect()
        .map_err(DbError::from)
        .and_then(|mut conn| prepare(&mut conn).map(|()| conn));

    let elapsed_ms = started.elapsed().as_millis();
    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} duration_ms={elapsed_ms}",
            location.kind()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={elapsed_ms} error={}",
            location.kind(),
            log_value(&err.to_string())
        ),
    }
    result
}

fn prepare(conn: &mut Connection) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}
