//! fibertrack-web library: HTTP surface over the fault record store
//!
//! Record CRUD with paging and search, spreadsheet ingest, the dashboard
//! summary, map points and KML/XLSX downloads.

use std::sync::Arc;

use axum::Router;
use fibertrack_common::config::IngestConfig;
use fibertrack_common::store::SqliteRecordStore;
use fibertrack_ingest::IngestService;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod pagination;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Record store used by CRUD, dashboard and export handlers
    pub store: Arc<SqliteRecordStore>,
    /// Ingest pipeline over the same store
    pub ingest: IngestService,
}

impl AppState {
    /// Fails when the configured column overrides are invalid
    pub fn new(pool: SqlitePool, ingest_config: &IngestConfig) -> fibertrack_common::Result<Self> {
        let store = Arc::new(SqliteRecordStore::new(pool));
        let ingest = IngestService::new(store.clone(), ingest_config)?;
        Ok(Self { store, ingest })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::record_routes())
        .merge(api::ingest_routes())
        .merge(api::report_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
