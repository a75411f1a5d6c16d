use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A chat identity associated with a score-provider identity.
/// One row per chat identity; re-registering overwrites the provider side.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub discord_id: i64,
    pub osu_user_id: i64,
    pub osu_username: String,
}
