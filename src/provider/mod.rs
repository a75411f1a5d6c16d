pub mod osu;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use osu::OsuClient;

/// One score as returned by the remote provider, newest first in a batch.
#[derive(Debug, Clone)]
pub struct RecentScore {
    pub score_id: i64,
    pub user_id: i64,
    /// Absent for scores without an associated map (e.g. deleted maps).
    pub beatmap_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub score: i64,
    /// Modifier short names; numeric mod settings are not represented.
    pub mods: Vec<String>,
    pub max_combo: i32,
    pub accuracy: f64,
    pub rank: String,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status} for {endpoint}")]
    Status {
        status: reqwest::StatusCode,
        endpoint: String,
    },

    #[error("token request failed: {0}")]
    Token(String),
}

/// Read-only client for the remote score provider.
///
/// All calls are stateless queries; retry policy lives with the caller.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Most recent passed scores for a user, newest first.
    async fn recent_scores(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<RecentScore>, ProviderError>;

    /// Current display name for a provider user id.
    async fn username(&self, user_id: i64) -> Result<String, ProviderError>;

    /// Human-readable title for a map, used in announcements.
    async fn beatmap_display(&self, beatmap_id: i64) -> Result<String, ProviderError>;
}
