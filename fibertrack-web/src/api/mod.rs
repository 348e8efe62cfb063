//! HTTP API handlers for fibertrack-web

pub mod dashboard;
pub mod export;
pub mod health;
pub mod ingest;
pub mod records;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::AppState;

pub use health::health_routes;

/// Record CRUD
pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/records",
            get(records::list_records).post(records::create_record),
        )
        .route(
            "/api/records/:id",
            get(records::get_record)
                .put(records::replace_record)
                .patch(records::patch_record)
                .delete(records::delete_record),
        )
}

/// Spreadsheet upload, with a body limit sized for real workbooks
pub fn ingest_routes() -> Router<AppState> {
    Router::new()
        .route("/api/ingest", post(ingest::upload_spreadsheet))
        .layer(DefaultBodyLimit::max(ingest::MAX_UPLOAD_BYTES))
}

/// Dashboard, map and file exports
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard", get(dashboard::get_dashboard))
        .route("/api/map/points", get(export::map_points))
        .route("/api/export/kml", get(export::export_kml))
        .route("/api/export/xlsx", get(export::export_xlsx))
}
