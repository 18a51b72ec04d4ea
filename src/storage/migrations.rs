//! Database migrations for autorule.
//!
//! Each migration upgrades the schema by one version and runs automatically
//! when the database is opened.

use rusqlite::Connection;

use crate::error::AutoruleError;

/// Current schema version.
const CURRENT_VERSION: i32 = 2;

/// Get the current schema version from the database.
///
/// Returns 0 if no version has been set (new database).
pub fn get_version(conn: &Connection) -> Result<i32, AutoruleError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| AutoruleError::Database(format!("Failed to get schema version: {e}")))
}

fn set_version(conn: &Connection, version: i32) -> Result<(), AutoruleError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| AutoruleError::Database(format!("Failed to set schema version: {e}")))
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<(), AutoruleError> {
    let current = get_version(conn)?;

    if current >= CURRENT_VERSION {
        return Ok(());
    }

    for version in (current + 1)..=CURRENT_VERSION {
        run_migration(conn, version)?;
        set_version(conn, version)?;
    }

    Ok(())
}

fn run_migration(conn: &Connection, version: i32) -> Result<(), AutoruleError> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(AutoruleError::Database(format!(
            "Unknown migration version: {version}"
        ))),
    }
}

/// Migration v1: record storage.
fn migrate_v1(conn: &Connection) -> Result<(), AutoruleError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            model TEXT NOT NULL,
            fields TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_model
        ON records(model);
        ",
    )
    .map_err(|e| AutoruleError::Database(format!("Migration v1 failed: {e}")))
}

/// Migration v2: per-user auto-fill preferences.
fn migrate_v2(conn: &Connection) -> Result<(), AutoruleError> {
    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS user_preferences (
            user_id INTEGER PRIMARY KEY,
            auto_fill INTEGER NOT NULL DEFAULT 0,
            automation_enabled INTEGER NOT NULL DEFAULT 0,
            default_sender_id INTEGER,
            default_courier_type_id INTEGER,
            default_category_id INTEGER,
            default_priority_id INTEGER,
            default_tag_ids TEXT NOT NULL DEFAULT '[]'
        );
        ",
    )
    .map_err(|e| AutoruleError::Database(format!("Migration v2 failed: {e}")))
}
