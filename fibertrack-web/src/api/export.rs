//! Map points and file downloads

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiResult;
use crate::export::{kml::render_kml, map_points as to_map_points, xlsx::render_xlsx, MapPoint};
use crate::AppState;

const KML_CONTENT_TYPE: &str = "application/vnd.google-earth.kml+xml";
const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Serialize)]
pub struct MapPointsResponse {
    /// Records left off the map because their coordinates are missing or unreadable
    pub skipped: usize,
    pub points: Vec<MapPoint>,
}

/// GET /api/map/points
pub async fn map_points(State(state): State<AppState>) -> ApiResult<Json<MapPointsResponse>> {
    let records = state.store.all().await?;
    let points = to_map_points(&records);

    Ok(Json(MapPointsResponse {
        skipped: records.len() - points.len(),
        points,
    }))
}

/// GET /api/export/kml
pub async fn export_kml(State(state): State<AppState>) -> ApiResult<Response> {
    let records = state.store.all().await?;
    let points = to_map_points(&records);
    debug!(points = points.len(), records = records.len(), "Rendering KML");

    let body = render_kml("Fiber Arızaları", &points)?;
    Ok(attachment(KML_CONTENT_TYPE, "fiber_arizalar.kml", body))
}

/// GET /api/export/xlsx
pub async fn export_xlsx(State(state): State<AppState>) -> ApiResult<Response> {
    let records = state.store.all().await?;
    let body = render_xlsx(state.ingest.columns(), &records)?;
    Ok(attachment(XLSX_CONTENT_TYPE, "fiber_arizalar.xlsx", body))
}

fn attachment(content_type: &'static str, file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}
