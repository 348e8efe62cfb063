//! Database initialization
//!
//! Startup runs in three phases:
//! 1. `CREATE TABLE IF NOT EXISTS` for every table
//! 2. Automatic schema sync (adds columns introduced after a database was created)
//! 3. Versioned manual migrations

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Busy timeout applied to every connection, in milliseconds
const BUSY_TIMEOUT_MS: i64 = 5000;

/// Open (creating if needed) the fault database and bring its schema up to date
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL lets the dashboard read while an upload commits
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query(&format!("PRAGMA busy_timeout = {}", BUSY_TIMEOUT_MS))
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Run all three schema phases against an already-open pool.
///
/// Idempotent; tests call it on in-memory pools.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_fault_records_table(pool).await?;

    crate::db::table_schemas::sync_all_table_schemas(pool).await?;
    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the fault records table.
///
/// `bulletin_number` carries the UNIQUE constraint that makes concurrent
/// uploads of the same key fail at commit time.
pub async fn create_fault_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fault_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bulletin_number TEXT NOT NULL UNIQUE,
            week TEXT,
            region TEXT NOT NULL DEFAULT '',
            province TEXT NOT NULL DEFAULT '',
            route TEXT NOT NULL DEFAULT '',
            location TEXT NOT NULL DEFAULT '',
            start_time TIMESTAMP,
            end_time TIMESTAMP,
            consolidated_root_cause TEXT,
            root_cause TEXT,
            cable_type TEXT,
            sla_breached INTEGER,
            sla_duration TEXT,
            fault_duration TEXT,
            outage_duration TEXT,
            permanent_solution INTEGER,
            materials_used TEXT,
            notes TEXT,
            coordinate_a TEXT,
            coordinate_b TEXT,
            escort_status TEXT,
            service_impact TEXT,
            affected_services TEXT,
            relocation_needed TEXT,
            compensation_process TEXT,
            otdr_measurement TEXT,
            year INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = setup_test_db().await;
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fault_records")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_bulletin_number_is_unique() {
        let pool = setup_test_db().await;
        create_schema(&pool).await.unwrap();

        sqlx::query("INSERT INTO fault_records (bulletin_number) VALUES ('A1')")
            .execute(&pool)
            .await
            .unwrap();
        let dup = sqlx::query("INSERT INTO fault_records (bulletin_number) VALUES ('A1')")
            .execute(&pool)
            .await;
        assert!(dup.is_err());
    }
}
