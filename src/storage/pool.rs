//! SQLite connection pool
//!
//! Connections are checked out for the duration of one gateway call and
//! returned when the guard drops. Every checkout health-checks the idle
//! connection first and replaces it if it no longer answers.

use crate::storage::schema::initialize_schema;
use crate::storage::{StorageError, StorageResult};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where pooled connections point
#[derive(Debug, Clone)]
enum PoolTarget {
    File(PathBuf),
    /// A private in-memory database; only valid with a pool of one
    Memory,
}

#[derive(Debug)]
struct PoolState {
    idle: Vec<Connection>,
    checked_out: usize,
}

/// Bounded pool of SQLite connections
#[derive(Debug)]
pub struct ConnectionPool {
    target: PoolTarget,
    max_size: usize,
    state: Mutex<PoolState>,
    available: Condvar,
}

impl ConnectionPool {
    /// Opens a pool over the database file at `path`
    ///
    /// One connection is opened eagerly so that schema setup and path
    /// errors surface immediately.
    pub fn open(path: &Path, max_size: usize) -> StorageResult<Self> {
        Self::with_target(PoolTarget::File(path.to_path_buf()), max_size.max(1))
    }

    /// A single-connection pool over a fresh in-memory database
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_target(PoolTarget::Memory, 1)
    }

    fn with_target(target: PoolTarget, max_size: usize) -> StorageResult<Self> {
        let conn = open_connection(&target)?;
        initialize_schema(&conn)?;

        Ok(Self {
            target,
            max_size,
            state: Mutex::new(PoolState {
                idle: vec![conn],
                checked_out: 0,
            }),
            available: Condvar::new(),
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of idle connections
    pub fn idle(&self) -> usize {
        self.lock().map(|state| state.idle.len()).unwrap_or(0)
    }

    /// Checks out a connection, blocking while all of them are in use
    pub fn get(&self) -> StorageResult<PooledConnection<'_>> {
        let mut state = self.lock()?;

        loop {
            if let Some(conn) = state.idle.pop() {
                state.checked_out += 1;
                drop(state);

                if is_healthy(&conn) {
                    return Ok(PooledConnection::new(self, conn));
                }

                tracing::warn!("Replacing unhealthy pooled connection");
                return self.open_checked_out();
            }

            if state.checked_out < self.max_size {
                state.checked_out += 1;
                drop(state);
                return self.open_checked_out();
            }

            state = self
                .available
                .wait(state)
                .map_err(|_| StorageError::Pool("pool lock poisoned".to_string()))?;
        }
    }

    /// Opens a connection for a slot already counted as checked out
    fn open_checked_out(&self) -> StorageResult<PooledConnection<'_>> {
        match open_connection(&self.target) {
            Ok(conn) => Ok(PooledConnection::new(self, conn)),
            Err(e) => {
                self.release(None);
                Err(e)
            }
        }
    }

    /// Returns a slot to the pool, with its connection if still usable
    fn release(&self, conn: Option<Connection>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.checked_out = state.checked_out.saturating_sub(1);
        if let Some(conn) = conn {
            state.idle.push(conn);
        }
        drop(state);
        self.available.notify_one();
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, PoolState>> {
        self.state
            .lock()
            .map_err(|_| StorageError::Pool("pool lock poisoned".to_string()))
    }
}

/// A checked-out connection; returns itself to the pool on drop
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl<'a> PooledConnection<'a> {
    fn new(pool: &'a ConnectionPool, conn: Connection) -> Self {
        Self {
            pool,
            conn: Some(conn),
        }
    }
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection is only taken on drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection is only taken on drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        self.pool.release(self.conn.take());
    }
}

fn open_connection(target: &PoolTarget) -> StorageResult<Connection> {
    let conn = match target {
        PoolTarget::File(path) => {
            let conn = Connection::open(path)?;
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA foreign_keys = ON;
            ",
            )?;
            conn
        }
        PoolTarget::Memory => {
            let conn = Connection::open_in_memory()?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            initialize_schema(&conn)?;
            conn
        }
    };

    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn is_healthy(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map(|one| one == 1)
        .unwrap_or(false)
}
