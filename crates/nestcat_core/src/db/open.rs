//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by tree mutations.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections carry a bounded busy timeout, so a writer waiting
//!   for the tree lock gives up instead of blocking forever.
//! - Returned connections have migrations fully applied and a root category.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use crate::config::{CoreConfig, DEFAULT_BUSY_TIMEOUT_MS};
use crate::model::category::ROOT_CATEGORY_ID;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and applies all pending migrations.
///
/// # Side effects
/// - Performs connection bootstrap and migration checks.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS), || {
        Connection::open(path)
    })
}

/// Opens an in-memory SQLite database and applies all pending migrations.
///
/// Every call returns an independent database seeded with the root category.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with(
        "memory",
        Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        Connection::open_in_memory,
    )
}

/// Opens the database described by `config`.
///
/// Falls back to an in-memory database when `config.db_path` is unset.
pub fn open_db_with_config(config: &CoreConfig) -> DbResult<Connection> {
    let busy_timeout = config.busy_timeout();
    match config.db_path.as_deref() {
        Some(path) => open_with("file", busy_timeout, || Connection::open(path)),
        None => open_with("memory", busy_timeout, Connection::open_in_memory),
    }
}

fn open_with(
    mode: &'static str,
    busy_timeout: Duration,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    apply_migrations(conn)?;
    ensure_root_category(conn)
}

fn ensure_root_category(conn: &Connection) -> DbResult<()> {
    let present: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM categories
            WHERE id = ?1 AND parent_id IS NULL AND lft = 1
        );",
        [ROOT_CATEGORY_ID],
        |row| row.get(0),
    )?;
    if present == 1 {
        Ok(())
    } else {
        Err(DbError::MissingRootCategory)
    }
}
