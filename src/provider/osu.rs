use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{ProviderError, RecentScore, ScoreProvider};

const OSU_BASE_URL: &str = "https://osu.ppy.sh";

/// Safety margin subtracted from the token lifetime so we refresh before
/// the provider starts rejecting it.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// osu! API v2 client using the client-credentials grant.
///
/// The access token is cached in-process and refreshed when it nears expiry.
pub struct OsuClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct ApiUser {
    username: String,
}

#[derive(Deserialize)]
struct ApiBeatmapRef {
    id: i64,
}

#[derive(Deserialize)]
struct ApiBeatmap {
    version: String,
    beatmapset: Option<ApiBeatmapset>,
}

#[derive(Deserialize)]
struct ApiBeatmapset {
    artist: String,
    title: String,
}

#[derive(Deserialize)]
struct ApiScore {
    id: i64,
    user_id: i64,
    beatmap: Option<ApiBeatmapRef>,
    created_at: DateTime<Utc>,
    score: i64,
    mods: Vec<String>,
    max_combo: i32,
    accuracy: f64,
    rank: String,
}

impl From<ApiScore> for RecentScore {
    fn from(s: ApiScore) -> Self {
        RecentScore {
            score_id: s.id,
            user_id: s.user_id,
            beatmap_id: s.beatmap.map(|b| b.id),
            created_at: s.created_at,
            score: s.score,
            mods: s.mods,
            max_combo: s.max_combo,
            accuracy: s.accuracy,
            rank: s.rank,
        }
    }
}

impl OsuClient {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self::with_base_url(client_id, client_secret, OSU_BASE_URL.to_string())
    }

    pub fn with_base_url(client_id: String, client_secret: String, base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            client_id,
            client_secret,
            token: RwLock::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        {
            let token = self.token.read().await;
            if let Some(cached) = token.as_ref() {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let mut token = self.token.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = token.as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.access_token.clone());
            }
        }

        debug!("Requesting new provider access token");
        let response = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
                "grant_type": "client_credentials",
                "scope": "public",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Token(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }

        let parsed: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(parsed.expires_in)
            .saturating_sub(TOKEN_EXPIRY_MARGIN);
        let access_token = parsed.access_token.clone();
        *token = Some(CachedToken {
            access_token: parsed.access_token,
            expires_at: Instant::now() + lifetime,
        });

        Ok(access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: String,
    ) -> Result<T, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, endpoint))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, endpoint = %endpoint, "Provider request failed");
            return Err(ProviderError::Status { status, endpoint });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ScoreProvider for OsuClient {
    #[instrument(skip(self))]
    async fn recent_scores(
        &self,
        user_id: i64,
        limit: u32,
    ) -> Result<Vec<RecentScore>, ProviderError> {
        let scores: Vec<ApiScore> = self
            .get_json(format!(
                "/api/v2/users/{}/scores/recent?include_fails=0&limit={}",
                user_id, limit
            ))
            .await?;

        debug!(user_id, score_count = scores.len(), "Fetched recent scores");
        Ok(scores.into_iter().map(RecentScore::from).collect())
    }

    #[instrument(skip(self))]
    async fn username(&self, user_id: i64) -> Result<String, ProviderError> {
        let user: ApiUser = self.get_json(format!("/api/v2/users/{}", user_id)).await?;
        Ok(user.username)
    }

    #[instrument(skip(self))]
    async fn beatmap_display(&self, beatmap_id: i64) -> Result<String, ProviderError> {
        let beatmap: ApiBeatmap = self
            .get_json(format!("/api/v2/beatmaps/{}", beatmap_id))
            .await?;

        Ok(match beatmap.beatmapset {
            Some(set) => format!("{} - {} [{}]", set.artist, set.title, beatmap.version),
            None => format!("beatmap {} [{}]", beatmap_id, beatmap.version),
        })
    }
}
