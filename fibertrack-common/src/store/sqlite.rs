//! SQLite-backed record store

use super::RecordStore;
use crate::db::models::{FaultFields, FaultPatch, FaultRecord};
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info};

/// Columns selected for every record read
const RECORD_COLUMNS: &str = "id, bulletin_number, week, region, province, route, location, \
    start_time, end_time, consolidated_root_cause, root_cause, cable_type, sla_breached, \
    sla_duration, fault_duration, outage_duration, permanent_solution, materials_used, notes, \
    coordinate_a, coordinate_b, escort_status, service_impact, affected_services, \
    relocation_needed, compensation_process, otdr_measurement, year";

const INSERT_SQL: &str = r#"
    INSERT INTO fault_records (
        bulletin_number, week, region, province, route, location,
        start_time, end_time, consolidated_root_cause, root_cause, cable_type, sla_breached,
        sla_duration, fault_duration, outage_duration, permanent_solution, materials_used, notes,
        coordinate_a, coordinate_b, escort_status, service_impact, affected_services,
        relocation_needed, compensation_process, otdr_measurement, year
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

const UPDATE_SQL: &str = r#"
    UPDATE fault_records SET
        bulletin_number = ?, week = ?, region = ?, province = ?, route = ?, location = ?,
        start_time = ?, end_time = ?, consolidated_root_cause = ?, root_cause = ?, cable_type = ?,
        sla_breached = ?, sla_duration = ?, fault_duration = ?, outage_duration = ?,
        permanent_solution = ?, materials_used = ?, notes = ?, coordinate_a = ?, coordinate_b = ?,
        escort_status = ?, service_impact = ?, affected_services = ?, relocation_needed = ?,
        compensation_process = ?, otdr_measurement = ?, year = ?,
        updated_at = CURRENT_TIMESTAMP
    WHERE id = ?
"#;

/// Columns a listing may be sorted by
pub const SORTABLE_COLUMNS: &[&str] = &[
    "id",
    "bulletin_number",
    "week",
    "region",
    "province",
    "route",
    "location",
    "start_time",
    "end_time",
    "root_cause",
    "cable_type",
    "year",
];

/// Bound variables per `IN (...)` chunk, well below SQLite's limit
const KEY_CHUNK_SIZE: usize = 500;

/// Listing parameters
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    /// Substring matched against key, region, province, route and location
    pub search: Option<String>,
    /// Must be one of [`SORTABLE_COLUMNS`]; defaults to `id`
    pub sort: Option<String>,
    pub descending: bool,
    pub limit: i64,
    pub offset: i64,
}

/// Fault records in SQLite
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Manual entry. Fails with `KeyConflict` if the key is taken.
    pub async fn create(&self, fields: FaultFields) -> Result<FaultRecord> {
        let fields = fields.normalized();
        fields.validate()?;

        let result = bind_fields(sqlx::query(INSERT_SQL), &fields)
            .execute(&self.pool)
            .await
            .map_err(|e| key_conflict_or(e, &fields.bulletin_number))?;

        let id = result.last_insert_rowid();
        info!(id, bulletin_number = %fields.bulletin_number, "Fault record created");

        Ok(FaultRecord { id, fields })
    }

    pub async fn get(&self, id: i64) -> Result<Option<FaultRecord>> {
        fetch_record(&self.pool, id).await
    }

    /// One page of records plus the total matching count
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<FaultRecord>, i64)> {
        let sort = match query.sort.as_deref() {
            None => "id",
            Some(column) => SORTABLE_COLUMNS
                .iter()
                .copied()
                .find(|c| *c == column)
                .ok_or_else(|| Error::InvalidInput(format!("Invalid sort column: {}", column)))?,
        };
        let order = if query.descending { "DESC" } else { "ASC" };
        let pattern = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let filter = "WHERE (?1 IS NULL OR bulletin_number LIKE ?1 OR region LIKE ?1 \
                      OR province LIKE ?1 OR route LIKE ?1 OR location LIKE ?1)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM fault_records {}", filter))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM fault_records {} ORDER BY {} IS NULL, {} {}, id ASC LIMIT ?2 OFFSET ?3",
            RECORD_COLUMNS, filter, sort, sort, order
        );
        let rows = sqlx::query(&sql)
            .bind(&pattern)
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        let records = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;
        Ok((records, total))
    }

    /// Every record, oldest id first
    pub async fn all(&self) -> Result<Vec<FaultRecord>> {
        let rows = sqlx::query(&format!("SELECT {} FROM fault_records ORDER BY id", RECORD_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Most recent faults by start time; records without a start time last
    pub async fn recent(&self, limit: i64) -> Result<Vec<FaultRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM fault_records ORDER BY start_time IS NULL, start_time DESC, id DESC LIMIT ?",
            RECORD_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(record_from_row).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fault_records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Records still missing a coordinate or a permanent-solution answer
    pub async fn count_incomplete(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fault_records WHERE coordinate_a IS NULL OR permanent_solution IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Delete by id; `false` if there was no such record
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fault_records WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(id, "Fault record deleted");
        }
        Ok(deleted)
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn existing_keys(&self) -> Result<HashSet<String>> {
        let keys: Vec<String> = sqlx::query_scalar("SELECT bulletin_number FROM fault_records")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys.into_iter().collect())
    }

    async fn filter_new_keys(&self, candidates: &HashSet<String>) -> Result<HashSet<String>> {
        let mut new_keys = candidates.clone();
        let candidates: Vec<&String> = candidates.iter().collect();

        for chunk in candidates.chunks(KEY_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT bulletin_number FROM fault_records WHERE bulletin_number IN (");
            let mut separated = builder.separated(", ");
            for key in chunk {
                separated.push_bind(key.as_str());
            }
            separated.push_unseparated(")");

            let found: Vec<String> = builder
                .build_query_scalar()
                .fetch_all(&self.pool)
                .await?;
            for key in found {
                new_keys.remove(&key);
            }
        }

        Ok(new_keys)
    }

    async fn insert_all(&self, records: &[FaultFields]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        for record in records {
            bind_fields(sqlx::query(INSERT_SQL), record)
                .execute(&mut *tx)
                .await
                .map_err(|e| key_conflict_or(e, &record.bulletin_number))?;
        }
        tx.commit().await?;

        debug!(count = records.len(), "Committed fault record batch");
        Ok(records.len() as u64)
    }

    async fn update_by_key(&self, id: i64, patch: &FaultPatch) -> Result<FaultRecord> {
        let mut tx = self.pool.begin().await?;

        let current = fetch_record(&mut *tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Fault record {}", id)))?;
        let next = patch.apply_to(&current.fields)?;

        let taken_by: Option<i64> =
            sqlx::query_scalar("SELECT id FROM fault_records WHERE bulletin_number = ? AND id <> ?")
                .bind(&next.bulletin_number)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(other) = taken_by {
            debug!(id, other, bulletin_number = %next.bulletin_number, "Update rejected: key in use");
            return Err(Error::KeyConflict {
                bulletin_number: next.bulletin_number,
            });
        }

        bind_fields(sqlx::query(UPDATE_SQL), &next)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| key_conflict_or(e, &next.bulletin_number))?;
        tx.commit().await?;

        info!(id, bulletin_number = %next.bulletin_number, "Fault record updated");
        Ok(FaultRecord { id, fields: next })
    }
}

/// Bind every field in column order of `INSERT_SQL` / `UPDATE_SQL`
fn bind_fields<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    f: &'q FaultFields,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(&f.bulletin_number)
        .bind(&f.week)
        .bind(&f.region)
        .bind(&f.province)
        .bind(&f.route)
        .bind(&f.location)
        .bind(f.start_time)
        .bind(f.end_time)
        .bind(&f.consolidated_root_cause)
        .bind(&f.root_cause)
        .bind(&f.cable_type)
        .bind(f.sla_breached)
        .bind(&f.sla_duration)
        .bind(&f.fault_duration)
        .bind(&f.outage_duration)
        .bind(f.permanent_solution)
        .bind(&f.materials_used)
        .bind(&f.notes)
        .bind(&f.coordinate_a)
        .bind(&f.coordinate_b)
        .bind(&f.escort_status)
        .bind(&f.service_impact)
        .bind(&f.affected_services)
        .bind(&f.relocation_needed)
        .bind(&f.compensation_process)
        .bind(&f.otdr_measurement)
        .bind(f.year)
}

/// UNIQUE violations become `KeyConflict`, everything else stays a database error
fn key_conflict_or(err: sqlx::Error, bulletin_number: &str) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Error::KeyConflict {
            bulletin_number: bulletin_number.to_string(),
        },
        _ => Error::Database(err),
    }
}

async fn fetch_record<'e, E>(executor: E, id: i64) -> Result<Option<FaultRecord>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!("SELECT {} FROM fault_records WHERE id = ?", RECORD_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

fn record_from_row(row: &SqliteRow) -> Result<FaultRecord> {
    Ok(FaultRecord {
        id: row.try_get("id")?,
        fields: FaultFields {
            bulletin_number: row.try_get("bulletin_number")?,
            week: row.try_get("week")?,
            region: row.try_get("region")?,
            province: row.try_get("province")?,
            route: row.try_get("route")?,
            location: row.try_get("location")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
            consolidated_root_cause: row.try_get("consolidated_root_cause")?,
            root_cause: row.try_get("root_cause")?,
            cable_type: row.try_get("cable_type")?,
            sla_breached: row.try_get("sla_breached")?,
            sla_duration: row.try_get("sla_duration")?,
            fault_duration: row.try_get("fault_duration")?,
            outage_duration: row.try_get("outage_duration")?,
            permanent_solution: row.try_get("permanent_solution")?,
            materials_used: row.try_get("materials_used")?,
            notes: row.try_get("notes")?,
            coordinate_a: row.try_get("coordinate_a")?,
            coordinate_b: row.try_get("coordinate_b")?,
            escort_status: row.try_get("escort_status")?,
            service_impact: row.try_get("service_impact")?,
            affected_services: row.try_get("affected_services")?,
            relocation_needed: row.try_get("relocation_needed")?,
            compensation_process: row.try_get("compensation_process")?,
            otdr_measurement: row.try_get("otdr_measurement")?,
            year: row.try_get("year")?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_store() -> SqliteRecordStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::create_schema(&pool).await.unwrap();
        SqliteRecordStore::new(pool)
    }

    fn fields(key: &str, region: &str) -> FaultFields {
        FaultFields {
            region: region.to_string(),
            ..FaultFields::new(key)
        }
    }

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let store = setup_store().await;

        let mut input = fields("A1", "Bursa");
        input.start_time = NaiveDate::from_ymd_opt(2025, 1, 3)
            .unwrap()
            .and_hms_opt(8, 15, 0);
        input.sla_breached = Some(true);
        input.permanent_solution = Some(false);
        input.coordinate_a = Some("40,1828".to_string());
        input.year = Some(2025);

        let created = store.create(input.clone()).await.unwrap();
        let loaded = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.fields, input);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_key_conflict() {
        let store = setup_store().await;
        store.create(fields("A1", "Bursa")).await.unwrap();

        let err = store.create(fields(" A1 ", "İzmir")).await.unwrap_err();
        assert!(matches!(err, Error::KeyConflict { bulletin_number } if bulletin_number == "A1"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_all_is_atomic() {
        let store = setup_store().await;
        store.create(fields("B2", "Ankara")).await.unwrap();

        let batch = vec![fields("A1", "X"), fields("B2", "Y"), fields("C3", "Z")];
        let err = store.insert_all(&batch).await.unwrap_err();

        assert!(matches!(err, Error::KeyConflict { bulletin_number } if bulletin_number == "B2"));
        // A1 was inserted before the failure and must have been rolled back
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(!store.existing_keys().await.unwrap().contains("A1"));
    }

    #[tokio::test]
    async fn test_filter_new_keys() {
        let store = setup_store().await;
        store.insert_all(&[fields("A1", ""), fields("B2", "")]).await.unwrap();

        let candidates: HashSet<String> = ["A1", "C3", "D4"].iter().map(|s| s.to_string()).collect();
        let new_keys = store.filter_new_keys(&candidates).await.unwrap();

        let expected: HashSet<String> = ["C3", "D4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(new_keys, expected);
    }

    #[tokio::test]
    async fn test_update_rejects_key_of_other_record() {
        let store = setup_store().await;
        let a = store.create(fields("A1", "Bursa")).await.unwrap();
        store.create(fields("B2", "Ankara")).await.unwrap();

        let patch = FaultPatch {
            bulletin_number: Some("B2".to_string()),
            region: Some("Changed".to_string()),
            ..Default::default()
        };
        let err = store.update_by_key(a.id, &patch).await.unwrap_err();
        assert!(matches!(err, Error::KeyConflict { .. }));

        let unchanged = store.get(a.id).await.unwrap().unwrap();
        assert_eq!(unchanged.fields.bulletin_number, "A1");
        assert_eq!(unchanged.fields.region, "Bursa");
    }

    #[tokio::test]
    async fn test_update_may_keep_own_key() {
        let store = setup_store().await;
        let a = store.create(fields("A1", "Bursa")).await.unwrap();

        let patch = FaultPatch {
            bulletin_number: Some("A1".to_string()),
            notes: Some(Some("Ek kutusu değişti".to_string())),
            ..Default::default()
        };
        let updated = store.update_by_key(a.id, &patch).await.unwrap();
        assert_eq!(updated.fields.notes.as_deref(), Some("Ek kutusu değişti"));
        assert_eq!(store.get(a.id).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = setup_store().await;
        let err = store
            .update_by_key(42, &FaultPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_search_sort_and_page() {
        let store = setup_store().await;
        store
            .insert_all(&[
                fields("A1", "Bursa"),
                fields("A2", "Ankara"),
                fields("A3", "Bursa"),
            ])
            .await
            .unwrap();

        let (page, total) = store
            .list(&ListQuery {
                search: Some("burs".to_string()),
                sort: Some("bulletin_number".to_string()),
                descending: true,
                limit: 1,
                offset: 0,
            })
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].fields.bulletin_number, "A3");

        let bad_sort = store
            .list(&ListQuery {
                sort: Some("id; DROP TABLE fault_records".to_string()),
                limit: 10,
                ..Default::default()
            })
            .await;
        assert!(matches!(bad_sort, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = setup_store().await;
        let a = store.create(fields("A1", "")).await.unwrap();
        assert!(store.delete(a.id).await.unwrap());
        assert!(!store.delete(a.id).await.unwrap());
        assert!(store.get(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_orders_by_start_time() {
        let store = setup_store().await;
        let at = |d: u32| NaiveDate::from_ymd_opt(2025, 2, d).unwrap().and_hms_opt(0, 0, 0);

        let mut early = fields("EARLY", "");
        early.start_time = at(1);
        let mut late = fields("LATE", "");
        late.start_time = at(20);
        let undated = fields("UNDATED", "");
        store.insert_all(&[early, undated, late]).await.unwrap();

        let recent = store.recent(10).await.unwrap();
        let keys: Vec<_> = recent.iter().map(|r| r.fields.bulletin_number.as_str()).collect();
        assert_eq!(keys, vec!["LATE", "EARLY", "UNDATED"]);
    }
}
