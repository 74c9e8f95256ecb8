//! Embedded schema migrations.
//!
//! Migration SQL is compiled into the binary and applied in version order.
//! Applied versions are tracked in `schema_migrations`.

use rusqlite::{params, Connection};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration {version} ({name}) failed: {message}")]
    Failed {
        version: u32,
        name: &'static str,
        message: String,
    },
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial",
    sql: include_str!("001_initial.sql"),
}];

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

/// Apply every migration newer than the stored schema version.
///
/// Each migration runs in its own transaction. Returns how many were applied.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    let from = current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS.iter().filter(|m| m.version > from) {
        let failed = |e: rusqlite::Error| MigrationError::Failed {
            version: migration.version,
            name: migration.name,
            message: e.to_string(),
        };

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?, ?)",
            params![migration.version, migration.name],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;

        tracing::debug!(
            version = migration.version,
            name = migration.name,
            "Applied migration"
        );
        applied += 1;
    }

    Ok(applied)
}

/// Highest applied schema version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32, MigrationError> {
    conn.execute(TRACKING_TABLE, [])?;

    let version = conn.query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
        row.get::<_, Option<u32>>(0)
    })?;

    Ok(version.unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_apply_once() {
        let conn = Connection::open_in_memory().unwrap();

        assert_eq!(run_migrations(&conn).unwrap(), MIGRATIONS.len());
        assert_eq!(run_migrations(&conn).unwrap(), 0);
        assert_eq!(current_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_convertables_cascade_with_video() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO videos (id, title, created_at, updated_at) VALUES ('v1', 'a', 'now', 'now')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO convertables (id, video_id, created_at, updated_at) VALUES ('c1', 'v1', 'now', 'now')",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM videos WHERE id = 'v1'", []).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM convertables", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_video_id_is_unique_per_record() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO videos (id, title, created_at, updated_at) VALUES ('v1', 'a', 'now', 'now')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO convertables (id, video_id, created_at, updated_at) VALUES ('c1', 'v1', 'now', 'now')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO convertables (id, video_id, created_at, updated_at) VALUES ('c2', 'v1', 'now', 'now')",
            [],
        );
        assert!(dup.is_err());
    }
}
