//! Open the fingerprint store and hand out per-task connections.

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::UniquePolicy;

use super::{SCHEMA, WAL_PRAGMAS, unique_index_sql};

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection, policy: UniquePolicy) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .context("enable WAL")?;
    conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    conn.execute_batch(unique_index_sql(policy))
        .context("create unique index")?;
    Ok(())
}

/// Open or create the store and ensure schema, unique index, and WAL.
pub fn open_db(path: &Path, policy: UniquePolicy) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("open database {}", path.display()))?;
    apply_wal_and_schema(&conn, policy)?;
    Ok(conn)
}

/// Open an in-memory DB with the same schema (tests and one-shot lookups; no WAL needed).
pub fn open_db_in_memory(policy: UniquePolicy) -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory database")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    conn.execute_batch(unique_index_sql(policy))
        .context("create unique index")?;
    Ok(conn)
}

/// Open an existing store for lookups only. Never creates the file or touches the schema; a
/// missing file or a database without the fingerprint table is an error.
pub fn open_db_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(path, read_only_flags())
        .with_context(|| format!("open database {}", path.display()))?;
    let has_table: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'key_hashes')",
            [],
            |row| row.get(0),
        )
        .with_context(|| format!("read schema of {}", path.display()))?;
    if !has_table {
        anyhow::bail!("{} is not a fingerprint store", path.display());
    }
    Ok(conn)
}

fn read_only_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI
}

/// Number of stored fingerprint rows.
pub fn count_rows(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM key_hashes", [], |row| row.get(0))
        .context("count rows")?;
    Ok(n.max(0) as usize)
}

/// Handle to an on-disk store. Each concurrent sub-task calls [`Store::connect`] for its own
/// connection; SQLite serializes writers and reports contention as busy/locked.
#[derive(Clone, Debug)]
pub struct Store {
    path: PathBuf,
    read_only: bool,
}

impl Store {
    /// Create the schema if needed and return a handle plus the setup connection.
    /// Keep the connection open for the run; close it after every sink has finished.
    pub fn open(path: &Path, policy: UniquePolicy) -> Result<(Self, Connection)> {
        let conn = open_db(path, policy)?;
        Ok((
            Self {
                path: path.to_path_buf(),
                read_only: false,
            },
            conn,
        ))
    }

    /// Handle to an existing store for lookups. Connections from [`Store::connect`] are read-only.
    pub fn open_existing(path: &Path) -> Result<(Self, Connection)> {
        let conn = open_db_read_only(path)?;
        Ok((
            Self {
                path: path.to_path_buf(),
                read_only: true,
            },
            conn,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// New connection with no busy wait, so lock contention surfaces to the retry policy.
    pub fn connect(&self) -> Result<Connection> {
        let conn = if self.read_only {
            Connection::open_with_flags(&self.path, read_only_flags())
        } else {
            Connection::open(&self.path)
        }
        .with_context(|| format!("open database {}", self.path.display()))?;
        conn.busy_timeout(Duration::ZERO)
            .context("set busy timeout")?;
        Ok(conn)
    }
}
