//! Database migrations

use libsql::Connection;

use crate::error::Result;
use crate::models::Collection;

/// One schema step; `statements` runs in a single transaction.
struct Migration {
    version: i32,
    description: &'static str,
    statements: fn() -> Vec<String>,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    description: "one JSON record table per collection",
    statements: record_tables,
}];

/// Current schema version
const CURRENT_VERSION: i32 = MIGRATIONS[MIGRATIONS.len() - 1].version;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        (),
    )
    .await?;
    let current = schema_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut statements = (migration.statements)();
        statements.push(format!(
            "INSERT INTO schema_version (version) VALUES ({})",
            migration.version
        ));
        run_in_transaction(conn, &statements).await?;
        tracing::info!(
            "Migrated database to version {} ({})",
            migration.version,
            migration.description
        );
    }

    Ok(())
}

async fn schema_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn run_in_transaction(conn: &Connection, statements: &[String]) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for statement in statements {
        if let Err(error) = conn.execute(statement.as_str(), ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }
    }

    if let Err(error) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(error.into());
    }
    Ok(())
}

fn record_tables() -> Vec<String> {
    Collection::ALL
        .iter()
        .map(|collection| {
            format!(
                "CREATE TABLE IF NOT EXISTS {} (record_key TEXT PRIMARY KEY, data TEXT NOT NULL)",
                collection.table()
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test(flavor = "multi_thread")]
    async fn migrations_are_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        run(db.connection()).await.unwrap();

        assert_eq!(schema_version(db.connection()).await.unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn migrations_are_ordered() {
        assert!(MIGRATIONS.windows(2).all(|pair| pair[0].version < pair[1].version));
        assert_eq!(CURRENT_VERSION, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_step_rolls_back() {
        let db = Database::open_in_memory().await.unwrap();
        let conn = db.connection();
        let statements = vec![
            "CREATE TABLE scratch (id TEXT)".to_string(),
            "INSERT INTO missing_table VALUES (1)".to_string(),
        ];

        assert!(run_in_transaction(conn, &statements).await.is_err());
        let mut rows = conn
            .query("SELECT COUNT(*) FROM sqlite_master WHERE name = 'scratch'", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 0);
    }
}
