//! Dashboard summary

use axum::{extract::State, Json};
use fibertrack_common::db::models::FaultRecord;
use serde::Serialize;

use crate::dashboard::{analyze, Analytics};
use crate::error::ApiResult;
use crate::AppState;

/// Most recent faults shown on the dashboard
const RECENT_LIMIT: i64 = 10;

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_records: i64,
    /// Missing coordinate A or an unknown permanent-solution answer
    pub incomplete_records: i64,
    pub recent: Vec<FaultRecord>,
    pub analytics: Analytics,
}

/// GET /api/dashboard
pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardResponse>> {
    let records = state.store.all().await?;

    Ok(Json(DashboardResponse {
        total_records: state.store.count().await?,
        incomplete_records: state.store.count_incomplete().await?,
        recent: state.store.recent(RECENT_LIMIT).await?,
        analytics: analyze(&records),
    }))
}
