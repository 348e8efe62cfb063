//! Record CRUD: paged listing, manual entry, full and partial edits, delete

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use fibertrack_common::db::models::{FaultFields, FaultPatch, FaultRecord};
use fibertrack_common::store::{ListQuery, RecordStore};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::pagination::{Pagination, PAGE_SIZE};
use crate::AppState;

/// Query parameters for the record listing
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,

    /// Column to sort by
    pub sort: Option<String>,

    /// "asc" or "desc"
    #[serde(default = "default_order")]
    pub order: String,

    /// Free-text search
    pub q: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_order() -> String {
    "asc".to_string()
}

#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub total_rows: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub records: Vec<FaultRecord>,
}

/// GET /api/records
pub async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<RecordListResponse>> {
    let descending = match params.order.to_lowercase().as_str() {
        "asc" => false,
        "desc" => true,
        other => return Err(ApiError::BadRequest(format!("Invalid sort order: {}", other))),
    };

    let mut query = ListQuery {
        search: params.q,
        sort: params.sort,
        descending,
        limit: PAGE_SIZE,
        offset: Pagination::offset_of(params.page),
    };
    let (mut records, total_rows) = state.store.list(&query).await?;

    // Past the last page: serve the last page instead
    let pagination = Pagination::clamp(total_rows, params.page);
    if pagination.offset != query.offset {
        query.offset = pagination.offset;
        records = state.store.list(&query).await?.0;
    }

    Ok(Json(RecordListResponse {
        total_rows,
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        records,
    }))
}

/// POST /api/records
pub async fn create_record(
    State(state): State<AppState>,
    Json(fields): Json<FaultFields>,
) -> ApiResult<(StatusCode, Json<FaultRecord>)> {
    let record = state.store.create(fields).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/records/:id
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<FaultRecord>> {
    state
        .store
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Fault record {}", id)))
}

/// PUT /api/records/:id
///
/// Every field is replaced; fields missing from the body are cleared.
pub async fn replace_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(fields): Json<FaultFields>,
) -> ApiResult<Json<FaultRecord>> {
    let record = state
        .store
        .update_by_key(id, &FaultPatch::from(fields))
        .await?;
    Ok(Json(record))
}

/// PATCH /api/records/:id
///
/// Absent fields are kept, `null` clears an optional field.
pub async fn patch_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<FaultPatch>,
) -> ApiResult<Json<FaultRecord>> {
    let record = state.store.update_by_key(id, &patch).await?;
    Ok(Json(record))
}

/// DELETE /api/records/:id
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.store.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Fault record {}", id)))
    }
}
