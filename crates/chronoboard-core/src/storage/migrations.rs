//! Versioned schema upgrades.
//!
//! `schema_version` holds a single row with the last step applied. Opening a
//! database runs whatever steps are newer than that row, oldest first.

use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};

type Step = fn(&Connection) -> SqliteResult<()>;

const STEPS: [(i32, Step); 3] = [(1, migrate_v1), (2, migrate_v2), (3, migrate_v3)];

/// Version reached once every step has run.
pub const SCHEMA_VERSION: i32 = STEPS[STEPS.len() - 1].0;

/// Bring `conn` up to [`SCHEMA_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY);")?;

    let from = schema_version(conn);
    for (version, step) in STEPS.iter().filter(|(v, _)| *v > from) {
        tracing::debug!(version, "applying schema step");
        step(conn)?;
    }
    Ok(())
}

/// Last applied step, or 0 for a database that predates versioning.
pub fn schema_version(conn: &Connection) -> i32 {
    match conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get::<_, Option<i32>>(0))
        .optional()
    {
        Ok(found) => found.flatten().unwrap_or(0),
        Err(e) => {
            tracing::warn!(error = %e, "schema_version unreadable, assuming 0");
            0
        }
    }
}

fn record_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

// The tasks table predates versioning and is created by the database layer,
// so step one only stamps the version.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    record_version(conn, 1)
}

/// Adds `project_id` to tasks and backfills blank due dates with the
/// `No due date` sentinel.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_project_id: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('tasks') WHERE name = 'project_id'",
            [],
            |row| row.get::<_, i32>(0),
        )
        .unwrap_or(0)
        > 0;

    if !has_project_id {
        tx.execute_batch("ALTER TABLE tasks ADD COLUMN project_id INTEGER;")?;
    }
    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_tasks_project_id ON tasks(project_id);
         UPDATE tasks SET due_date = 'No due date' WHERE due_date IS NULL OR TRIM(due_date) = '';",
    )?;

    record_version(&tx, 2)?;
    tx.commit()
}

/// Calendar events. `task_id` carries no foreign key; the synchronizer owns
/// cleanup.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS calendar_events (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            task_id   INTEGER,
            title     TEXT NOT NULL DEFAULT '',
            \"start\"   TEXT NOT NULL,
            \"end\"     TEXT NOT NULL,
            all_day   INTEGER NOT NULL DEFAULT 0,
            due_flag  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_calendar_events_task ON calendar_events(task_id, due_flag);",
    )?;

    record_version(&tx, 3)?;
    tx.commit()
}
