//! Spreadsheet upload

use axum::{
    extract::{Multipart, State},
    Json,
};
use fibertrack_ingest::sheet;
use fibertrack_ingest::Reconciliation;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Multipart field carrying the spreadsheet
const FILE_FIELD: &str = "file";

/// POST /api/ingest
///
/// Reads the `file` field (xlsx, xls, ods or csv) and inserts every row whose
/// bulletin number is new. Responds with the accepted records and the
/// per-row skip list; a missing required column is a 422 and inserts nothing.
pub async fn upload_spreadsheet(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<Reconciliation>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no name".to_string()))?;
        let bytes = field.bytes().await?;
        info!(file_name = %file_name, size = bytes.len(), "Spreadsheet uploaded");

        // Decoding a workbook is CPU-bound
        let batch = tokio::task::spawn_blocking(move || sheet::read_batch(&file_name, bytes.to_vec()))
            .await
            .map_err(|e| ApiError::Internal(format!("Spreadsheet reader failed: {}", e)))??;

        let result = state.ingest.ingest(&batch).await?;
        return Ok(Json(result));
    }

    Err(ApiError::BadRequest(format!(
        "Multipart field '{}' is missing",
        FILE_FIELD
    )))
}
