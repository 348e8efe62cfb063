//! Table schema definitions
//!
//! Expected shape of every table, consumed by the startup schema sync.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// `fault_records` table schema
pub struct FaultRecordsTableSchema;

impl TableSchema for FaultRecordsTableSchema {
    fn table_name() -> &'static str {
        "fault_records"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("bulletin_number", "TEXT").not_null().unique(),
            ColumnDefinition::new("week", "TEXT"),
            ColumnDefinition::new("region", "TEXT").not_null().default("''"),
            ColumnDefinition::new("province", "TEXT").not_null().default("''"),
            ColumnDefinition::new("route", "TEXT").not_null().default("''"),
            ColumnDefinition::new("location", "TEXT").not_null().default("''"),
            ColumnDefinition::new("start_time", "TIMESTAMP"),
            ColumnDefinition::new("end_time", "TIMESTAMP"),
            ColumnDefinition::new("consolidated_root_cause", "TEXT"),
            ColumnDefinition::new("root_cause", "TEXT"),
            ColumnDefinition::new("cable_type", "TEXT"),
            ColumnDefinition::new("sla_breached", "INTEGER"),
            ColumnDefinition::new("sla_duration", "TEXT"),
            ColumnDefinition::new("fault_duration", "TEXT"),
            ColumnDefinition::new("outage_duration", "TEXT"),
            ColumnDefinition::new("permanent_solution", "INTEGER"),
            ColumnDefinition::new("materials_used", "TEXT"),
            ColumnDefinition::new("notes", "TEXT"),
            ColumnDefinition::new("coordinate_a", "TEXT"),
            ColumnDefinition::new("coordinate_b", "TEXT"),
            // Columns added to the sheets after the first databases were created
            ColumnDefinition::new("escort_status", "TEXT"),
            ColumnDefinition::new("service_impact", "TEXT"),
            ColumnDefinition::new("affected_services", "TEXT"),
            ColumnDefinition::new("relocation_needed", "TEXT"),
            ColumnDefinition::new("compensation_process", "TEXT"),
            ColumnDefinition::new("otdr_measurement", "TEXT"),
            ColumnDefinition::new("year", "INTEGER"),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
            ColumnDefinition::new("updated_at", "TIMESTAMP")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        ]
    }
}

/// Synchronize all table schemas (phase 2 of database initialization)
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    let added = SchemaSync::sync_table::<FaultRecordsTableSchema>(pool).await?;
    if added > 0 {
        info!("Schema sync added {} column(s) to fault_records", added);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema_sync::SchemaIntrospector;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[test]
    fn test_key_column_definition() {
        let columns = FaultRecordsTableSchema::expected_columns();
        assert!(columns
            .iter()
            .any(|c| c.name == "bulletin_number" && c.not_null && c.unique));
        assert!(columns.iter().any(|c| c.name == "id" && c.primary_key));
    }

    #[tokio::test]
    async fn test_sync_upgrades_early_table() {
        let pool = setup_test_db().await;

        // Table as it looked before the lifetime columns existed
        sqlx::query(
            r#"
            CREATE TABLE fault_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bulletin_number TEXT NOT NULL UNIQUE,
                region TEXT NOT NULL DEFAULT '',
                province TEXT NOT NULL DEFAULT '',
                route TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT '',
                start_time TIMESTAMP,
                end_time TIMESTAMP,
                coordinate_a TEXT,
                coordinate_b TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        sync_all_table_schemas(&pool).await.unwrap();

        let columns = SchemaIntrospector::introspect_table(&pool, "fault_records")
            .await
            .unwrap();
        for expected in ["otdr_measurement", "escort_status", "year", "created_at"] {
            assert!(
                columns.iter().any(|c| c.name == expected),
                "missing column {}",
                expected
            );
        }
        assert_eq!(
            columns.len(),
            FaultRecordsTableSchema::expected_columns().len()
        );
    }
}
