use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Best-known score for one (user, beatmap, pack) key.
///
/// `score` holds the adjusted value (post-multiplier). The stored value for
/// a key only ever moves upward; see `ScoreRepository::upsert_if_greater`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: i64,
    pub beatmap_id: i64,
    pub pack_id: i64,
    pub score_id: i64,
    pub score: i64,
    pub combo: i32,
    pub accuracy: f64,
    pub rank: String,
}

/// Result of a conditional best-score write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Whether the candidate replaced the stored record.
    pub applied: bool,
    /// Stored value before the write (0 when no record existed).
    pub previous: i64,
}

/// One leaderboard line: a registered user's total adjusted score in a pack.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub osu_user_id: i64,
    pub osu_username: String,
    pub total_score: i64,
}
