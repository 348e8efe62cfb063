//! Versioned schema migrations
//!
//! Column additions are handled by schema sync; this module holds the
//! transformations sync cannot express. Each migration is idempotent and
//! recorded in `schema_version`.
//!
//! Never modify an existing migration; add a new one and bump
//! `CURRENT_SCHEMA_VERSION`.

use crate::db::schema_sync::SchemaIntrospector;
use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Table name the Flask-era application used for the same records
const LEGACY_TABLE: &str = "fiber_ariza";

/// Legacy column → current column. Tri-state columns are converted separately.
const LEGACY_COLUMN_MAP: &[(&str, &str)] = &[
    ("bulten_no", "bulletin_number"),
    ("hafta", "week"),
    ("bolge", "region"),
    ("il", "province"),
    ("guzergah", "route"),
    ("lokasyon", "location"),
    ("ariza_baslangic", "start_time"),
    ("ariza_bitis", "end_time"),
    ("ariza_konsolide", "consolidated_root_cause"),
    ("ariza_kok_neden", "root_cause"),
    ("kablo_tipi", "cable_type"),
    ("hags_asildi_mi", "sla_breached"),
    ("hags_suresi", "sla_duration"),
    ("ariza_suresi", "fault_duration"),
    ("kesinti_suresi", "outage_duration"),
    ("kalici_cozum", "permanent_solution"),
    ("kullanilan_malzeme", "materials_used"),
    ("aciklama", "notes"),
    ("kordinat_a", "coordinate_a"),
    ("kordinat_b", "coordinate_b"),
    ("refakat_durumu", "escort_status"),
    ("servis_etkisi", "service_impact"),
    ("serivs_etkisi", "affected_services"),
];

/// Optional text columns where a blank string means "not set"
const NULLABLE_TEXT_COLUMNS: &[&str] = &[
    "week",
    "consolidated_root_cause",
    "root_cause",
    "cable_type",
    "sla_duration",
    "fault_duration",
    "outage_duration",
    "materials_used",
    "notes",
    "coordinate_a",
    "coordinate_b",
    "escort_status",
    "service_impact",
    "affected_services",
    "relocation_needed",
    "compensation_process",
    "otdr_measurement",
];

const TRI_STATE_COLUMNS: &[&str] = &["sla_breached", "permanent_solution"];

/// Get current schema version (0 when nothing has been recorded)
async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    if !SchemaIntrospector::table_exists(pool, "schema_version").await? {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({}); proceeding",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
    }

    if current_version < 3 {
        migrate_v3(pool).await?;
        set_schema_version(pool, 3).await?;
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: copy rows from the Flask-era `fiber_ariza` table.
///
/// Rows whose bulletin number already exists are left alone. The legacy
/// table is kept so the copy can be checked by hand.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if !SchemaIntrospector::table_exists(pool, LEGACY_TABLE).await? {
        return Ok(());
    }

    let legacy_columns = SchemaIntrospector::introspect_table(pool, LEGACY_TABLE).await?;
    let has = |name: &str| legacy_columns.iter().any(|c| c.name == name);

    if !has("bulten_no") {
        warn!("Legacy table {} has no bulten_no column; not imported", LEGACY_TABLE);
        return Ok(());
    }

    let mut targets = Vec::new();
    let mut sources = Vec::new();
    for (legacy, current) in LEGACY_COLUMN_MAP {
        if !has(*legacy) {
            continue;
        }
        targets.push(*current);
        let source = match *current {
            "bulletin_number" => format!("TRIM({})", legacy),
            // NOT NULL text columns in the new table
            "region" | "province" | "route" | "location" => format!("COALESCE({}, '')", legacy),
            _ => legacy.to_string(),
        };
        sources.push(source);
    }

    let sql = format!(
        "INSERT OR IGNORE INTO fault_records ({}) SELECT {} FROM {} WHERE TRIM(COALESCE(bulten_no, '')) <> ''",
        targets.join(", "),
        sources.join(", "),
        LEGACY_TABLE
    );
    let result = sqlx::query(&sql).execute(pool).await?;

    info!(
        "Migration v1: copied {} record(s) from legacy table {}",
        result.rows_affected(),
        LEGACY_TABLE
    );
    Ok(())
}

/// Migration v2: one representation for "not set".
///
/// Blank optional text becomes NULL; tri-state columns holding text
/// (Evet/Hayır, yes/no) become 1/0, anything else NULL.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    for column in NULLABLE_TEXT_COLUMNS {
        sqlx::query(&format!(
            "UPDATE fault_records SET {c} = NULL WHERE {c} IS NOT NULL AND TRIM({c}) = ''",
            c = column
        ))
        .execute(&mut *tx)
        .await?;
    }

    for column in TRI_STATE_COLUMNS {
        sqlx::query(&format!(
            r#"
            UPDATE fault_records SET {c} = CASE
                WHEN LOWER(TRIM({c})) IN ('evet', 'e', 'var', 'yes', 'y', 'true', '1') THEN 1
                WHEN LOWER(TRIM({c})) IN ('hayır', 'hayir', 'h', 'yok', 'no', 'n', 'false', '0') THEN 0
                ELSE NULL
            END
            WHERE typeof({c}) = 'text'
            "#,
            c = column
        ))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("Migration v2: normalized blank and yes/no values");
    Ok(())
}

/// Migration v3: index for "most recent faults" queries
async fn migrate_v3(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_fault_records_start_time ON fault_records(start_time)",
    )
    .execute(pool)
    .await?;

    info!("Migration v3: created start_time index");
    Ok(())
}
