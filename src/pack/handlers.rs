use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::models::PackMapEntry;
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct PackImportRequest {
    pub maps: Vec<PackMapEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PackImportResponse {
    pub pack_id: i64,
    pub map_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PackRemoveResponse {
    pub pack_id: i64,
    pub removed: u64,
}

/// HTTP handler for bulk-loading a pack's map list and modifier rules
///
/// PUT /packs/{pack_id}/maps
/// Replaces any previously imported rows for the pack.
#[instrument(name = "import_pack", skip(state, request))]
pub async fn import_pack(
    State(state): State<AppState>,
    Path(pack_id): Path<i64>,
    Json(request): Json<PackImportRequest>,
) -> Result<Json<PackImportResponse>, AppError> {
    if request.maps.is_empty() {
        return Err(AppError::BadRequest("pack map list is empty".to_string()));
    }
    for map in &request.maps {
        if let Some(rule) = &map.rule {
            if rule.multiplier <= 0.0 {
                return Err(AppError::BadRequest(format!(
                    "multiplier for map {} must be positive",
                    map.beatmap_id
                )));
            }
        }
    }

    let map_count = request.maps.len();
    state
        .pack_repository
        .replace_pack_maps(pack_id, request.maps)
        .await?;

    info!(pack_id, map_count, "Pack map list imported");

    Ok(Json(PackImportResponse { pack_id, map_count }))
}

/// HTTP handler for removing a pack's map list
///
/// DELETE /packs/{pack_id}
#[instrument(name = "remove_pack", skip(state))]
pub async fn remove_pack(
    State(state): State<AppState>,
    Path(pack_id): Path<i64>,
) -> Result<Json<PackRemoveResponse>, AppError> {
    let removed = state.pack_repository.remove_pack(pack_id).await?;

    info!(pack_id, removed, "Pack removed");

    Ok(Json(PackRemoveResponse { pack_id, removed }))
}
