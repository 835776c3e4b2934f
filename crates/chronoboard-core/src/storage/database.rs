//! SQLite connection handle.
//!
//! One [`Database`] owns one connection for the life of the process. Reads go
//! through [`Database::read`]; anything that writes more than one row goes
//! through [`Database::write`], which runs the closure inside a
//! `BEGIN IMMEDIATE` transaction so it is atomic to readers and serialized
//! against other writers, including other processes on the same file.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};

use super::migrations;
use super::DatabaseConfig;
use crate::error::{CoreError, DatabaseError, Result};

/// SQLite database holding tasks and calendar events.
pub struct Database {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Database {
    /// Open the file named by `config`, resolved against the data directory.
    /// A missing file is created and brought to the current schema.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let path = config.path()?;
        Self::open_at(&path, config.busy_timeout())
    }

    /// Same as [`Database::open`] for a path chosen by the caller.
    pub fn open_at(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let open_failed = |source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        };
        let conn = Connection::open(path).map_err(open_failed)?;
        conn.busy_timeout(busy_timeout).map_err(open_failed)?;
        tracing::debug!(path = %path.display(), "opened database");

        let db = Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
            path: None,
        };
        db.migrate()?;
        Ok(db)
    }

    /// Location of the database file, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        let result = conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS tasks (
                    id          INTEGER PRIMARY KEY AUTOINCREMENT,
                    title       TEXT,
                    description TEXT,
                    status      TEXT,
                    priority    TEXT,
                    due_date    TEXT,
                    time_spent  INTEGER DEFAULT 0
                );",
            )
            .and_then(|()| migrations::migrate(&conn));

        result.map_err(|e| DatabaseError::MigrationFailed(e.to_string()).into())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    /// Run read-only work against the connection.
    ///
    /// # Errors
    /// Propagates the closure's error, or a poisoned-lock error.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    /// Run `f` inside an immediate transaction.
    ///
    /// The transaction commits when `f` returns `Ok` and rolls back otherwise.
    ///
    /// # Errors
    /// Propagates the closure's error, or a begin/commit failure.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let mut tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(CoreError::from)?;
        let value = f(&mut tx)?;
        tx.commit().map_err(CoreError::from)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::{schema_version, SCHEMA_VERSION};

    #[test]
    fn open_memory_is_fully_migrated() {
        let db = Database::open_memory().unwrap();
        let version = db.read(|conn| Ok(schema_version(conn))).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        assert!(db.path().is_none());
    }

    #[test]
    fn failed_write_rolls_back() {
        let db = Database::open_memory().unwrap();
        let result: Result<()> = db.write(|tx| {
            tx.execute("INSERT INTO tasks (title) VALUES ('doomed')", [])?;
            Err(CoreError::Custom("abort".into()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn successful_write_commits() {
        let db = Database::open_memory().unwrap();
        db.write(|tx| {
            tx.execute("INSERT INTO tasks (title) VALUES ('kept')", [])?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .read(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn reopening_file_keeps_data() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("board.db");
        {
            let db = Database::open_at(&path, Duration::from_millis(100)).unwrap();
            db.write(|tx| {
                tx.execute("INSERT INTO tasks (title) VALUES ('persisted')", [])?;
                Ok(())
            })
            .unwrap();
        }
        let db = Database::open_at(&path, Duration::from_millis(100)).unwrap();
        assert_eq!(db.path(), Some(path.as_path()));
        let title: String = db
            .read(|conn| Ok(conn.query_row("SELECT title FROM tasks", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(title, "persisted");
    }
}
