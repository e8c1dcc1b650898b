use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use super::DatabaseError;

/// One schema step. Each step inserts its own `schema_version` row.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "logs and knowledge base",
        sql: include_str!("../../resources/migrations/001_initial.sql"),
    },
    Migration {
        version: 2,
        name: "log record versions",
        sql: include_str!("../../resources/migrations/002_record_versions.sql"),
    },
];

pub const LATEST_SCHEMA_VERSION: i64 = 2;

/// Open the log database at `path`, creating and migrating it as needed.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    tracing::debug!(path = %path.display(), "Log database ready");
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;
         PRAGMA busy_timeout=5000;",
    )?;
    Ok(())
}

/// Bring the schema up to [`LATEST_SCHEMA_VERSION`].
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    apply_migrations(conn, MIGRATIONS, LATEST_SCHEMA_VERSION)
}

/// Each pending step runs in its own transaction; a failing step leaves the
/// schema at the previous version.
fn apply_migrations(
    conn: &Connection,
    migrations: &[Migration],
    latest: i64,
) -> Result<(), DatabaseError> {
    let current = schema_version(conn)?;
    if current > latest {
        return Err(DatabaseError::UnsupportedSchema {
            found: current,
            supported: latest,
        });
    }

    for migration in migrations.iter().filter(|m| m.version > current) {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying log database migration"
        );
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| DatabaseError::MigrationFailed {
                version: migration.version,
                reason: e.to_string(),
            })?;
        tx.commit()?;
    }

    Ok(())
}

/// Highest applied schema version; 0 for a fresh database.
pub fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let has_table = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if !has_table {
        return Ok(0);
    }

    let version: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(version.unwrap_or(0))
}

/// User tables, sorted by name.
pub fn table_names(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type='table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_has_log_and_kb_tables() {
        let conn = open_memory_database().unwrap();
        assert_eq!(
            table_names(&conn).unwrap(),
            vec!["kb_documents", "logs", "schema_version"]
        );
    }

    #[test]
    fn schema_version_is_latest() {
        let conn = open_memory_database().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), LATEST_SCHEMA_VERSION);
        assert_eq!(MIGRATIONS.last().unwrap().version, LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn fresh_connection_is_version_zero() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        assert!(run_migrations(&conn).is_ok());
        assert_eq!(schema_version(&conn).unwrap(), LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let conn = open_memory_database().unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (9)", [])
            .unwrap();
        assert!(matches!(
            run_migrations(&conn),
            Err(DatabaseError::UnsupportedSchema { found: 9, supported: 2 })
        ));
    }

    #[test]
    fn failed_step_rolls_back() {
        let conn = open_memory_database().unwrap();
        let broken = [Migration {
            version: 3,
            name: "broken",
            sql: "CREATE TABLE moods (day TEXT); INSERT INTO nowhere VALUES (1);",
        }];
        let err = apply_migrations(&conn, &broken, 3).unwrap_err();
        assert!(matches!(err, DatabaseError::MigrationFailed { version: 3, .. }));
        assert!(!table_names(&conn).unwrap().contains(&"moods".to_string()));
        assert_eq!(schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cadence.db");
        {
            let conn = open_database(&path).unwrap();
            conn.execute(
                "INSERT INTO kb_documents (id, title, source, url, text) VALUES ('a', 't', 's', 'u', 'x')",
                [],
            )
            .unwrap();
        }
        let conn = open_database(&path).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM kb_documents", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }
}
