use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::RegisteredUser;
use crate::shared::AppError;

/// Trait for registered-user operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Upserts a registration keyed on chat identity; last registration wins.
    async fn upsert_registration(&self, user: &RegisteredUser) -> Result<(), AppError>;
    /// Lists registrations in a stable order for the tracker's user loop.
    async fn list_registered(&self) -> Result<Vec<RegisteredUser>, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
///
/// Preserves registration order, which is the order the tracker walks.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<Vec<RegisteredUser>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository with pre-populated registrations
    pub fn with_users(users: Vec<RegisteredUser>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn upsert_registration(&self, user: &RegisteredUser) -> Result<(), AppError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.discord_id == user.discord_id) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        Ok(())
    }

    async fn list_registered(&self) -> Result<Vec<RegisteredUser>, AppError> {
        Ok(self.users.lock().unwrap().clone())
    }
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user))]
    async fn upsert_registration(&self, user: &RegisteredUser) -> Result<(), AppError> {
        debug!(
            discord_id = user.discord_id,
            osu_user_id = user.osu_user_id,
            "Upserting registration"
        );

        sqlx::query(
            "INSERT INTO registered_users (discord_id, osu_user_id, osu_user_name) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (discord_id) DO UPDATE SET \
                 osu_user_id = excluded.osu_user_id, \
                 osu_user_name = excluded.osu_user_name",
        )
        .bind(user.discord_id)
        .bind(user.osu_user_id)
        .bind(&user.osu_username)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, discord_id = user.discord_id, "Failed to upsert registration");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_registered(&self) -> Result<Vec<RegisteredUser>, AppError> {
        let users = sqlx::query_as::<_, RegisteredUser>(
            "SELECT discord_id, osu_user_id, osu_user_name AS osu_username \
             FROM registered_users ORDER BY discord_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list registered users");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!(user_count = users.len(), "Listed registered users");
        Ok(users)
    }
}
