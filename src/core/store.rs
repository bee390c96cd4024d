//! Store access: one-time process initialization and connection opening.
//!
//! Both pipelines share this layer. Every connection leaves here with the
//! UINT collation registered, so schema and queries can rely on it.
use std::path::Path;
use std::sync::OnceLock;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::gri;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Process-wide one-time initialization of the store's extension
/// capabilities. Must run once before any store is opened; failure is fatal
/// to the process. Subsequent calls return the cached outcome.
pub fn init() -> Result<(), Error> {
    INIT.get_or_init(|| probe_capabilities().map_err(|err| err.to_string()))
        .clone()
        .map_err(|message| Error::new(ErrorKind::StoreUnavailable).with_message(message))
}

/// Probe the linked SQLite through a throwaway in-memory connection: the
/// collation must register and actually order chromosome names numerically.
fn probe_capabilities() -> Result<(), Error> {
    let conn = Connection::open_in_memory().map_err(|err| {
        Error::new(ErrorKind::StoreUnavailable)
            .with_message("failed to open in-memory probe connection")
            .with_source(err)
    })?;
    gri::register_collation(&conn)?;
    let ordered: i64 = conn
        .query_row("SELECT 'chr2' < 'chr10' COLLATE UINT", [], |row| row.get(0))
        .map_err(|err| {
            Error::new(ErrorKind::StoreUnavailable)
                .with_message("collation probe query failed")
                .with_source(err)
        })?;
    if ordered != 1 {
        return Err(Error::new(ErrorKind::StoreUnavailable)
            .with_message("UINT collation probe produced wrong ordering"));
    }
    debug!(sqlite = rusqlite::version(), "store capabilities initialized");
    Ok(())
}

/// Open a store for a one-shot bulk load: read-write, created if missing,
/// durability relaxed for the duration. Atomicity is unaffected; the
/// rollback journal and the load transaction still guarantee all-or-nothing.
pub fn open_for_load(path: &Path) -> Result<Connection, Error> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .map_err(|err| {
        Error::new(ErrorKind::StoreUnavailable)
            .with_message("failed to open store for writing")
            .with_path(path)
            .with_source(err)
    })?;
    conn.pragma_update(None, "synchronous", "OFF")
        .map_err(|err| {
            Error::new(ErrorKind::StoreUnavailable)
                .with_message("failed to apply bulk-load settings")
                .with_path(path)
                .with_source(err)
        })?;
    gri::register_collation(&conn)?;
    Ok(conn)
}

/// Open an existing store read-only.
pub fn open_read_only(path: &Path) -> Result<Connection, Error> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(
        |err| {
            Error::new(ErrorKind::StoreUnavailable)
                .with_message("failed to open store read-only")
                .with_path(path)
                .with_source(err)
        },
    )?;
    gri::register_collation(&conn)?;
    Ok(conn)
}
