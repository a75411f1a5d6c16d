use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::models::RegisteredUser;
use crate::score::models::LeaderboardRow;
use crate::shared::{AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub discord_id: i64,
    pub osu_user_id: i64,
}

/// HTTP handler for associating a chat identity with a provider identity
///
/// POST /register
/// Resolves the display name through the provider; last registration wins.
#[instrument(name = "register_user", skip(state))]
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<RegisteredUser>, AppError> {
    if request.osu_user_id <= 0 {
        return Err(AppError::BadRequest("Invalid user ID".to_string()));
    }

    let osu_username = state
        .provider
        .username(request.osu_user_id)
        .await
        .map_err(|e| {
            warn!(error = %e, osu_user_id = request.osu_user_id, "Failed to resolve username");
            AppError::Provider(e.to_string())
        })?;

    let user = RegisteredUser {
        discord_id: request.discord_id,
        osu_user_id: request.osu_user_id,
        osu_username,
    };
    state.user_repository.upsert_registration(&user).await?;

    info!(
        discord_id = user.discord_id,
        osu_user_id = user.osu_user_id,
        osu_username = %user.osu_username,
        "User registered"
    );

    Ok(Json(user))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub pack_id: i64,
    pub rows: Vec<LeaderboardRow>,
}

/// HTTP handler for the per-pack score leaderboard
///
/// GET /leaderboard/{pack_id}
/// Returns per-user total adjusted score, descending.
#[instrument(name = "leaderboard", skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(pack_id): Path<i64>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let rows = state.score_repository.leaderboard(pack_id).await?;

    info!(pack_id, row_count = rows.len(), "Leaderboard fetched");

    Ok(Json(LeaderboardResponse { pack_id, rows }))
}
