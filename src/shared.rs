use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::pack::repository::PackRepository;
use crate::provider::ScoreProvider;
use crate::score::repository::ScoreRepository;
use crate::user::repository::UserRepository;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub user_repository: Arc<dyn UserRepository>,
    pub pack_repository: Arc<dyn PackRepository>,
    pub score_repository: Arc<dyn ScoreRepository>,
    pub provider: Arc<dyn ScoreProvider>,
}

impl AppState {
    pub fn new(
        user_repository: Arc<dyn UserRepository>,
        pack_repository: Arc<dyn PackRepository>,
        score_repository: Arc<dyn ScoreRepository>,
        provider: Arc<dyn ScoreProvider>,
    ) -> Self {
        Self {
            user_repository,
            pack_repository,
            score_repository,
            provider,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::Provider(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Score provider error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::pack::repository::InMemoryPackRepository;
    use crate::provider::{ProviderError, RecentScore};
    use crate::score::repository::InMemoryScoreRepository;
    use crate::user::repository::InMemoryUserRepository;
    use async_trait::async_trait;

    /// Dummy provider that knows no users - for tests that don't care about the remote API
    pub struct DummyProvider;

    #[async_trait]
    impl ScoreProvider for DummyProvider {
        async fn recent_scores(
            &self,
            _user_id: i64,
            _limit: u32,
        ) -> Result<Vec<RecentScore>, ProviderError> {
            Ok(Vec::new())
        }

        async fn username(&self, user_id: i64) -> Result<String, ProviderError> {
            Ok(format!("user-{}", user_id))
        }

        async fn beatmap_display(&self, beatmap_id: i64) -> Result<String, ProviderError> {
            Ok(format!("map {}", beatmap_id))
        }
    }

    /// Builder for creating AppState with overrides for testing
    pub struct AppStateBuilder {
        user_repository: Option<Arc<dyn UserRepository>>,
        pack_repository: Option<Arc<dyn PackRepository>>,
        score_repository: Option<Arc<dyn ScoreRepository>>,
        provider: Option<Arc<dyn ScoreProvider>>,
    }

    impl AppStateBuilder {
        pub fn new() -> Self {
            Self {
                user_repository: None,
                pack_repository: None,
                score_repository: None,
                provider: None,
            }
        }

        pub fn with_user_repository(
            mut self,
            repo: Arc<dyn UserRepository>,
        ) -> Self {
            self.user_repository = Some(repo);
            self
        }

        pub fn with_pack_repository(
            mut self,
            repo: Arc<dyn PackRepository>,
        ) -> Self {
            self.pack_repository = Some(repo);
            self
        }

        pub fn with_score_repository(
            mut self,
            repo: Arc<dyn ScoreRepository>,
        ) -> Self {
            self.score_repository = Some(repo);
            self
        }

        pub fn with_provider(mut self, provider: Arc<dyn ScoreProvider>) -> Self {
            self.provider = Some(provider);
            self
        }

        pub fn build(self) -> AppState {
            AppState {
                user_repository: self
                    .user_repository
                    .unwrap_or_else(|| Arc::new(InMemoryUserRepository::new())),
                pack_repository: self
                    .pack_repository
                    .unwrap_or_else(|| Arc::new(InMemoryPackRepository::new())),
                score_repository: self
                    .score_repository
                    .unwrap_or_else(|| Arc::new(InMemoryScoreRepository::new())),
                provider: self.provider.unwrap_or_else(|| Arc::new(DummyProvider)),
            }
        }
    }

    impl Default for AppStateBuilder {
        fn default() -> Self {
            Self::new()
        }
    }
}
