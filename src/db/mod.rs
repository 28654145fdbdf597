pub mod models;

use chrono::{SecondsFormat, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;

use crate::state::DbPool;

pub const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial",
    include_str!("../../migrations/001_initial.sql"),
)];

pub fn create_pool(db_path: &Path) -> anyhow::Result<DbPool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Per-connection pragmas; the pool hands out several connections
    let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )
    });
    let pool = Pool::builder().max_size(8).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;

    // Create migrations tracking table
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_version WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;

        if !already_applied {
            tracing::info!("Applying migration: {}", name);
            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_version (name) VALUES (?1)",
                params![name],
            )?;
        }
    }

    tracing::info!("Database migrations complete");
    Ok(())
}

/// Run `f` inside a `BEGIN IMMEDIATE` transaction: all or nothing.
///
/// The write lock is taken up front, so read-then-write sequences inside `f`
/// cannot interleave with another writer.
pub fn immediate<T, E>(conn: &Connection, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E>
where
    E: From<rusqlite::Error>,
{
    conn.execute_batch("BEGIN IMMEDIATE")?;

    match f(conn) {
        Ok(value) => match conn.execute_batch("COMMIT") {
            Ok(()) => Ok(value),
            Err(e) => {
                rollback(conn);
                Err(e.into())
            }
        },
        Err(e) => {
            rollback(conn);
            Err(e)
        }
    }
}

fn rollback(conn: &Connection) {
    if let Err(e) = conn.execute_batch("ROLLBACK") {
        tracing::warn!("Rollback failed: {}", e);
    }
}

/// True when `err` is a UNIQUE / PRIMARY KEY constraint violation.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Current time as stored in every `created_at` / `updated_at` column.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Fresh migrated database in a temp dir. Keep the `TempDir` alive for the test.
#[cfg(test)]
pub(crate) fn test_pool() -> (DbPool, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let pool = create_pool(&tmp.path().join("test.db")).unwrap();
    run_migrations(&pool).unwrap();
    (pool, tmp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_pool_creates_db_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("sub/dir/test.db");
        let pool = create_pool(&db_path).unwrap();
        assert!(db_path.exists());
        let conn = pool.get().unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode, "wal");
    }

    #[test]
    fn migrations_run_successfully() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();

        let tables: Vec<String> = {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .unwrap();
            stmt.query_map([], |row| row.get(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect()
        };
        for table in [
            "users",
            "videos",
            "watch_history",
            "comments",
            "likes",
            "subscriptions",
            "tweets",
            "playlists",
            "playlist_videos",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn migrations_are_idempotent() {
        let (pool, _tmp) = test_pool();
        run_migrations(&pool).unwrap();

        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn foreign_keys_enforced_on_every_pooled_connection() {
        let (pool, _tmp) = test_pool();

        // Hold one connection so the next one is a different pooled connection
        let _first = pool.get().unwrap();
        let conn = pool.get().unwrap();
        let result = conn.execute(
            "INSERT INTO tweets (id, owner_id, content, created_at, updated_at)
             VALUES ('t1', 'nobody', 'hi', ?1, ?1)",
            params![now()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn self_subscription_rejected_by_schema() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (id, user_name, email, full_name, password_hash, avatar_url, created_at, updated_at)
             VALUES ('u1', 'alice', 'alice@x.com', 'Alice', 'hash', '/a.png', ?1, ?1)",
            params![now()],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at)
             VALUES ('s1', 'u1', 'u1', ?1)",
            params![now()],
        );
        assert!(result.is_err());
    }

    #[test]
    fn immediate_rolls_back_on_error() {
        let (pool, _tmp) = test_pool();
        let conn = pool.get().unwrap();

        let result: Result<(), rusqlite::Error> = immediate(&conn, |conn| {
            conn.execute(
                "INSERT INTO users (id, user_name, email, full_name, password_hash, avatar_url, created_at, updated_at)
                 VALUES ('u1', 'alice', 'alice@x.com', 'Alice', 'hash', '/a.png', ?1, ?1)",
                params![now()],
            )?;
            // Duplicate primary key fails the whole transaction
            conn.execute(
                "INSERT INTO users (id, user_name, email, full_name, password_hash, avatar_url, created_at, updated_at)
                 VALUES ('u1', 'bob', 'bob@x.com', 'Bob', 'hash', '/b.png', ?1, ?1)",
                params![now()],
            )?;
            Ok(())
        });

        let err = result.unwrap_err();
        assert!(is_unique_violation(&err));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn timestamps_sort_in_creation_order() {
        let a = now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = now();
        assert!(a < b);
    }
}
