//! SQLite connection management
//!
//! One `Arc<Mutex<Connection>>` per pool. Several pools may point at the same
//! file; SQLite's own locking and the busy timeout arbitrate between them.

use crate::config::StoreConfig;
use crate::error::{OverlayError, OverlayResult};
use crate::store::schema;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, info};

/// Thread-safe SQLite connection wrapper
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    config: StoreConfig,
}

impl SqlitePool {
    /// Open the database described by `config` and apply migrations
    pub fn new(config: StoreConfig) -> OverlayResult<Self> {
        info!(path = ?config.path, "Opening overlay store");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        OverlayError::Storage(format!("Failed to create directory: {}", e))
                    })?;
                }
            }
            Connection::open(&config.path)?
        };

        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        };
        pool.initialize()?;

        Ok(pool)
    }

    /// In-memory store for tests and dry runs
    pub fn memory() -> OverlayResult<Self> {
        Self::new(StoreConfig::memory())
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> OverlayResult<T>
    where
        F: FnOnce(&Connection) -> OverlayResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Execute a closure with mutable access to the connection (transactions)
    pub fn with_connection_mut<F, T>(&self, f: F) -> OverlayResult<T>
    where
        F: FnOnce(&mut Connection) -> OverlayResult<T>,
    {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }

    fn initialize(&self) -> OverlayResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn)?;
            schema::apply_migrations(conn)?;
            Ok(())
        })
    }

    fn configure_pragmas(&self, conn: &Connection) -> OverlayResult<()> {
        debug!("Configuring SQLite pragmas");

        if self.config.wal_mode && !self.config.is_memory() {
            // journal_mode returns a row, so it cannot go through execute_batch
            let _mode: String =
                conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(std::time::Duration::from_millis(
            self.config.busy_timeout_ms as u64,
        ))?;

        Ok(())
    }
}
