use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{info, instrument};

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_email TEXT NOT NULL,
    planner_type TEXT NOT NULL,
    task_id INTEGER NOT NULL,
    text TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    minutes REAL,
    time_value INTEGER,
    time_unit TEXT,
    time_display TEXT,
    subject TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (user_email) REFERENCES users(email)
);

CREATE INDEX IF NOT EXISTS tasks_partition ON tasks (user_email, planner_type);
";

/// Opens a pool over the database file and creates the schema.
#[instrument(fields(db = %path.display()))]
pub fn open_pool(path: &Path, max_size: u32) -> anyhow::Result<DbPool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let manager = SqliteConnectionManager::file(path).with_init(init_connection);
    build(manager, max_size)
}

/// Single-connection in-memory database, for tests and throwaway servers.
pub fn open_memory_pool() -> anyhow::Result<DbPool> {
    build(
        SqliteConnectionManager::memory().with_init(init_connection),
        1,
    )
}

fn build(manager: SqliteConnectionManager, max_size: u32) -> anyhow::Result<DbPool> {
    let pool = Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(Duration::from_secs(10))
        .build(manager)
        .context("failed to create database pool")?;

    let conn = pool.get().context("failed to open database connection")?;
    migrate(&conn).context("failed to create schema")?;
    info!(max_size, "database ready");
    Ok(pool)
}

/// Task rows may name emails with no user row, so the `users(email)`
/// reference is documentation only and enforcement stays off.
fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", false)?;
    conn.busy_timeout(Duration::from_secs(5))
}

pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_pool_creates_schema_once() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("data").join("planner.db");

        let pool = open_pool(&path, 2).expect("pool");
        let conn = pool.get().expect("conn");
        migrate(&conn).expect("migrate twice");

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'tasks')",
                [],
                |row| row.get(0),
            )
            .expect("count tables");
        assert_eq!(tables, 2);
        assert!(path.exists());
    }

    #[test]
    fn tasks_accept_emails_without_a_user_row() {
        let pool = open_memory_pool().expect("pool");
        let conn = pool.get().expect("conn");

        let enforced: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .expect("pragma");
        assert_eq!(enforced, 0);

        conn.execute(
            "INSERT INTO tasks (user_email, planner_type, task_id, text, date, time) \
             VALUES ('ghost@x.com', 'generic', 1, 'walk', '2024-03-01T12:00:00.000Z', '09:00')",
            [],
        )
        .expect("insert for unregistered email");
    }
}
