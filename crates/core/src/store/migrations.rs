//! Schema migrations, tracked in SQLite's `user_version` header field.

use tokio_rusqlite::{Connection, rusqlite};

use crate::Error;

/// Schema steps in version order. `user_version` holds the last one applied.
const STEPS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_stores.sql")),
    (2, include_str!("../../migrations/002_entries.sql")),
];

/// Version a freshly migrated database reports.
pub const SCHEMA_VERSION: i64 = STEPS[STEPS.len() - 1].0;

fn user_version(conn: &rusqlite::Connection) -> Result<i64, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}

/// Bring the schema up to [`SCHEMA_VERSION`]. Each step commits on its own,
/// so a failing step leaves the database at the previous version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    let applied = conn
        .call(|conn| -> Result<Vec<i64>, Error> {
            let mut applied = Vec::new();
            let from = user_version(conn)?;

            for &(version, sql) in STEPS.iter().filter(|(v, _)| *v > from) {
                let tx = conn.transaction()?;
                tx.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
                tx.pragma_update(None, "user_version", version)?;
                tx.commit()?;
                applied.push(version);
            }

            Ok(applied)
        })
        .await?;

    if applied.is_empty() {
        tracing::debug!(version = SCHEMA_VERSION, "schema up to date");
    } else {
        tracing::info!(?applied, version = SCHEMA_VERSION, "schema migrated");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn version(conn: &Connection) -> i64 {
        conn.call(|conn| user_version(conn)).await.unwrap()
    }

    #[tokio::test]
    async fn test_fresh_database_reaches_latest_version() {
        let conn = Connection::open_in_memory().await.unwrap();
        assert_eq!(version(&conn).await, 0);

        run(&conn).await.unwrap();
        assert_eq!(version(&conn).await, SCHEMA_VERSION);

        run(&conn).await.unwrap();
        assert_eq!(version(&conn).await, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_only_pending_steps_run() {
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(STEPS[0].1)?;
            conn.pragma_update(None, "user_version", 1)
        })
        .await
        .unwrap();

        run(&conn).await.unwrap();

        let tables: Vec<String> = conn
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        assert_eq!(tables, vec!["entries".to_string(), "stores".to_string()]);
        assert_eq!(version(&conn).await, 2);
    }

    #[tokio::test]
    async fn test_deleting_store_cascades_to_entries() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        let remaining: i64 = conn
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.execute_batch(
                    "PRAGMA foreign_keys=ON;
                     INSERT INTO stores (name, created_at) VALUES ('s', 'now');
                     INSERT INTO entries VALUES ('s', 'h', 'GET https://example.com/', 'https://example.com/',
                                                 200, '[]', x'', 'now', 'now');
                     DELETE FROM stores WHERE name = 's';",
                )?;
                conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
            })
            .await
            .unwrap();

        assert_eq!(remaining, 0);
    }
}
