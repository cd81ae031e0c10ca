use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Schema migrations, applied in order. Each runs in its own transaction.
const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    include_str!("../../resources/migrations/001_records.sql"),
)];

const PRAGMAS: &str = "PRAGMA journal_mode=DELETE;
PRAGMA foreign_keys=ON;";

/// Open the records database at `path`, creating and migrating it as needed.
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    prepare(Connection::open(path)?)
}

/// In-memory records database (tests, deployments without a data volume).
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    prepare(Connection::open_in_memory()?)
}

fn prepare(conn: Connection) -> Result<Connection, DatabaseError> {
    conn.execute_batch(PRAGMAS)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Apply every migration newer than the recorded schema version.
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let applied = schema_version(conn);

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
        tracing::info!(version, "applying records schema migration");
        let failed = |e: rusqlite::Error| DatabaseError::MigrationFailed {
            version,
            reason: e.to_string(),
        };
        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(sql).map_err(failed)?;
        tx.commit().map_err(failed)?;
    }

    Ok(())
}

/// Highest applied migration, 0 on a fresh database.
pub fn schema_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, Option<i64>>(0)
    })
    .ok()
    .flatten()
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_is_fully_migrated() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn), 0);

        run_migrations(&conn).unwrap();
        assert_eq!(schema_version(&conn), MIGRATIONS.len() as i64);
    }

    #[test]
    fn rerunning_migrations_is_a_no_op() {
        let conn = open_memory_database().unwrap();
        run_migrations(&conn).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn file_database_persists_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("records.db");
        drop(open_database(&path).unwrap());

        let conn = open_database(&path).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='records'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }
}
