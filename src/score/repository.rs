use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};

use super::models::{LeaderboardRow, ScoreRecord, UpsertOutcome};
use crate::shared::AppError;
use crate::user::repository::UserRepository;

/// Trait for best-score operations
#[async_trait]
pub trait ScoreRepository: Send + Sync {
    /// Stored adjusted score for a key, if any.
    async fn best_score(
        &self,
        user_id: i64,
        beatmap_id: i64,
        pack_id: i64,
    ) -> Result<Option<i64>, AppError>;

    /// Writes the record only if its score is strictly greater than the
    /// stored one (absent counts as 0). The write must stay correct under
    /// concurrent callers targeting the same key.
    async fn upsert_if_greater(&self, record: &ScoreRecord) -> Result<UpsertOutcome, AppError>;

    /// Per-user total adjusted score for a pack, descending.
    async fn leaderboard(&self, pack_id: i64) -> Result<Vec<LeaderboardRow>, AppError>;
}

/// In-memory implementation for development and testing
#[derive(Default)]
pub struct InMemoryScoreRepository {
    scores: Mutex<HashMap<(i64, i64, i64), ScoreRecord>>,
    users: Option<Arc<dyn UserRepository>>,
}

impl InMemoryScoreRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a user repository so the leaderboard can resolve display
    /// names the way the SQL join does.
    pub fn with_users(users: Arc<dyn UserRepository>) -> Self {
        Self {
            scores: Mutex::new(HashMap::new()),
            users: Some(users),
        }
    }

    pub fn record_count(&self) -> usize {
        self.scores.lock().unwrap().len()
    }
}

#[async_trait]
impl ScoreRepository for InMemoryScoreRepository {
    async fn best_score(
        &self,
        user_id: i64,
        beatmap_id: i64,
        pack_id: i64,
    ) -> Result<Option<i64>, AppError> {
        let scores = self.scores.lock().unwrap();
        Ok(scores.get(&(user_id, beatmap_id, pack_id)).map(|r| r.score))
    }

    async fn upsert_if_greater(&self, record: &ScoreRecord) -> Result<UpsertOutcome, AppError> {
        let mut scores = self.scores.lock().unwrap();
        let key = (record.user_id, record.beatmap_id, record.pack_id);
        let previous = scores.get(&key).map(|r| r.score).unwrap_or(0);

        if record.score <= previous {
            return Ok(UpsertOutcome {
                applied: false,
                previous,
            });
        }

        scores.insert(key, record.clone());
        Ok(UpsertOutcome {
            applied: true,
            previous,
        })
    }

    async fn leaderboard(&self, pack_id: i64) -> Result<Vec<LeaderboardRow>, AppError> {
        let totals: HashMap<i64, i64> = {
            let scores = self.scores.lock().unwrap();
            scores
                .values()
                .filter(|r| r.pack_id == pack_id)
                .fold(HashMap::new(), |mut acc, r| {
                    *acc.entry(r.user_id).or_default() += r.score;
                    acc
                })
        };

        let mut rows: Vec<LeaderboardRow> = match &self.users {
            Some(users) => users
                .list_registered()
                .await?
                .into_iter()
                .filter_map(|u| {
                    totals.get(&u.osu_user_id).map(|total| LeaderboardRow {
                        osu_user_id: u.osu_user_id,
                        osu_username: u.osu_username,
                        total_score: *total,
                    })
                })
                .collect(),
            None => totals
                .into_iter()
                .map(|(user_id, total)| LeaderboardRow {
                    osu_user_id: user_id,
                    osu_username: user_id.to_string(),
                    total_score: total,
                })
                .collect(),
        };

        rows.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        Ok(rows)
    }
}

/// PostgreSQL implementation of score repository
pub struct PostgresScoreRepository {
    pool: PgPool,
}

impl PostgresScoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreRepository for PostgresScoreRepository {
    #[instrument(skip(self))]
    async fn best_score(
        &self,
        user_id: i64,
        beatmap_id: i64,
        pack_id: i64,
    ) -> Result<Option<i64>, AppError> {
        let row = sqlx::query(
            "SELECT score FROM scores WHERE user_id = $1 AND beatmap_id = $2 AND pack_id = $3",
        )
        .bind(user_id)
        .bind(beatmap_id)
        .bind(pack_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id, beatmap_id, "Failed to fetch best score");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(row.map(|r| r.get("score")))
    }

    #[instrument(skip(self, record), fields(user_id = record.user_id, beatmap_id = record.beatmap_id))]
    async fn upsert_if_greater(&self, record: &ScoreRecord) -> Result<UpsertOutcome, AppError> {
        // The previous value is read first for the announcement delta; the
        // write itself stays conditional so a concurrent improvement on the
        // same key can never be overwritten by a lower score.
        let previous = self
            .best_score(record.user_id, record.beatmap_id, record.pack_id)
            .await?
            .unwrap_or(0);

        let result = sqlx::query(
            "INSERT INTO scores (user_id, beatmap_id, pack_id, score_id, score, combo, accuracy, rank) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id, beatmap_id, pack_id) DO UPDATE SET \
                 score_id = excluded.score_id, \
                 score = excluded.score, \
                 combo = excluded.combo, \
                 accuracy = excluded.accuracy, \
                 rank = excluded.rank \
             WHERE scores.score < excluded.score",
        )
        .bind(record.user_id)
        .bind(record.beatmap_id)
        .bind(record.pack_id)
        .bind(record.score_id)
        .bind(record.score)
        .bind(record.combo)
        .bind(record.accuracy)
        .bind(&record.rank)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = record.user_id, "Failed to upsert score");
            AppError::DatabaseError(e.to_string())
        })?;

        let applied = result.rows_affected() > 0;
        debug!(
            applied,
            previous,
            candidate = record.score,
            "Conditional score upsert finished"
        );

        Ok(UpsertOutcome { applied, previous })
    }

    #[instrument(skip(self))]
    async fn leaderboard(&self, pack_id: i64) -> Result<Vec<LeaderboardRow>, AppError> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(
            "SELECT osu_user_id, osu_user_name AS osu_username, total_score FROM \
                 (SELECT user_id, SUM(score) AS total_score FROM scores \
                  WHERE pack_id = $1 GROUP BY user_id) AS totals \
             JOIN registered_users ON totals.user_id = registered_users.osu_user_id \
             ORDER BY total_score DESC",
        )
        .bind(pack_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, pack_id, "Failed to fetch leaderboard");
            AppError::DatabaseError(e.to_string())
        })?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user_id: i64, beatmap_id: i64, pack_id: i64, score: i64) -> ScoreRecord {
        ScoreRecord {
            user_id,
            beatmap_id,
            pack_id,
            score_id: score,
            score,
            combo: 500,
            accuracy: 0.95,
            rank: "A".to_string(),
        }
    }

    #[tokio::test]
    async fn first_score_for_key_is_applied() {
        let repo = InMemoryScoreRepository::new();

        let outcome = repo.upsert_if_greater(&record(1, 10, 2, 1000)).await.unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.previous, 0);
        assert_eq!(repo.best_score(1, 10, 2).await.unwrap(), Some(1000));
    }

    #[tokio::test]
    async fn equal_score_is_kept_not_replaced() {
        let repo = InMemoryScoreRepository::new();
        repo.upsert_if_greater(&record(1, 10, 2, 1000)).await.unwrap();

        let outcome = repo.upsert_if_greater(&record(1, 10, 2, 1000)).await.unwrap();

        assert!(!outcome.applied);
        assert_eq!(outcome.previous, 1000);
    }

    #[tokio::test]
    async fn lower_score_never_overwrites() {
        let repo = InMemoryScoreRepository::new();
        repo.upsert_if_greater(&record(1, 10, 2, 1000)).await.unwrap();

        let outcome = repo.upsert_if_greater(&record(1, 10, 2, 900)).await.unwrap();

        assert!(!outcome.applied);
        assert_eq!(repo.best_score(1, 10, 2).await.unwrap(), Some(1000));
    }

    #[tokio::test]
    async fn stored_value_is_monotonically_non_decreasing() {
        let repo = InMemoryScoreRepository::new();
        let candidates = [500, 1200, 800, 1200, 1500, 100];
        let mut last_stored = 0;

        for candidate in candidates {
            repo.upsert_if_greater(&record(1, 10, 2, candidate))
                .await
                .unwrap();
            let stored = repo.best_score(1, 10, 2).await.unwrap().unwrap();
            assert!(stored >= last_stored);
            last_stored = stored;
        }

        assert_eq!(last_stored, 1500);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let repo = InMemoryScoreRepository::new();
        repo.upsert_if_greater(&record(1, 10, 2, 1000)).await.unwrap();
        repo.upsert_if_greater(&record(1, 20, 2, 400)).await.unwrap();
        repo.upsert_if_greater(&record(2, 10, 2, 700)).await.unwrap();

        assert_eq!(repo.best_score(1, 10, 2).await.unwrap(), Some(1000));
        assert_eq!(repo.best_score(1, 20, 2).await.unwrap(), Some(400));
        assert_eq!(repo.best_score(2, 10, 2).await.unwrap(), Some(700));
        assert_eq!(repo.record_count(), 3);
    }

    #[tokio::test]
    async fn leaderboard_sums_per_user_and_sorts_descending() {
        let repo = InMemoryScoreRepository::new();
        repo.upsert_if_greater(&record(1, 10, 2, 1000)).await.unwrap();
        repo.upsert_if_greater(&record(1, 20, 2, 500)).await.unwrap();
        repo.upsert_if_greater(&record(2, 10, 2, 2000)).await.unwrap();
        // different pack, must not count
        repo.upsert_if_greater(&record(1, 10, 3, 9999)).await.unwrap();

        let rows = repo.leaderboard(2).await.unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].osu_user_id, 2);
        assert_eq!(rows[0].total_score, 2000);
        assert_eq!(rows[1].osu_user_id, 1);
        assert_eq!(rows[1].total_score, 1500);
    }
}
