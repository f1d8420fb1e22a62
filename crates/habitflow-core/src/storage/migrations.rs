//! Database schema migrations for habitflow.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current migration
//! version.

use rusqlite::{Connection, Result as SqliteResult};

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
    }

    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or(0)
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Migration v1: Initial schema (baseline).
///
/// The base tables are created by `Database::migrate()` directly, so this
/// only records the version marker.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    set_schema_version(conn, 1)?;
    Ok(())
}

/// Migration v2: Add habit start dates.
///
/// Habits created before this migration become applicable from their
/// creation day.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_start_date: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('habits') WHERE name = 'start_date'",
            [],
            |row| row.get::<_, i32>(0),
        )
        .unwrap_or(0)
        > 0;

    if !has_start_date {
        tx.execute_batch(
            "ALTER TABLE habits ADD COLUMN start_date TEXT NOT NULL DEFAULT '';",
        )?;
    }

    // Backfill from the creation timestamp's date part.
    tx.execute(
        "UPDATE habits SET start_date = substr(created_at, 1, 10) WHERE start_date = ''",
        [],
    )?;

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [2])?;

    tx.commit()?;
    Ok(())
}

/// Migration v3: Track failed-habit counts in the rollup table.
///
/// `failed_habits` counts complete -> incomplete flips per (habit, day).
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    let has_failed: bool = tx
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('daily_stats') WHERE name = 'failed_habits'",
            [],
            |row| row.get::<_, i32>(0),
        )
        .unwrap_or(0)
        > 0;

    if !has_failed {
        tx.execute_batch(
            "ALTER TABLE daily_stats ADD COLUMN failed_habits INTEGER NOT NULL DEFAULT 0;",
        )?;
    }

    tx.execute("DELETE FROM schema_version", [])?;
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [3])?;

    tx.commit()?;
    Ok(())
}
