//! Database migrations
//!
//! Schema: engines, zoom_levels, settings

use crate::Result;
use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<i32, _> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        });

    match result {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(rusqlite::Error::SqliteFailure(_, _)) => {
            // Table doesn't exist yet
            conn.execute(
                "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
                [],
            )?;
            conn.execute("INSERT INTO schema_version (version) VALUES (0)", [])?;
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    tracing::info!("Running migration v1: Initial schema");

    // Engine catalog; position keeps the user-defined ordering
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS engines (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            origin_url TEXT NOT NULL UNIQUE,
            focus_selector TEXT NOT NULL DEFAULT '',
            friend_domains TEXT NOT NULL DEFAULT '[]',
            action_scripts TEXT NOT NULL DEFAULT '{}',
            activation_shortcut TEXT,
            position INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_engines_position ON engines(position);
    "#,
    )?;

    // Per-engine zoom, keyed by origin URL
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS zoom_levels (
            origin_url TEXT PRIMARY KEY,
            level REAL NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#,
    )?;

    // Settings table
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#,
    )?;

    Ok(())
}
