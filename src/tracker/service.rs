use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use super::eligibility::{check_score, Eligibility};
use super::errors::SyncError;
use super::retry::{retry_user_sync, RetryPolicy};
use crate::notify::{new_score_message, Notifier};
use crate::pack::models::PackWindow;
use crate::pack::repository::PackRepository;
use crate::provider::{RecentScore, ScoreProvider};
use crate::score::models::ScoreRecord;
use crate::score::multiplier::apply_map_rule;
use crate::score::repository::ScoreRepository;
use crate::shared::AppError;
use crate::user::models::RegisteredUser;
use crate::user::repository::UserRepository;

/// Configuration for the score tracker loop
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub pack_id: i64,
    pub window: PackWindow,
    /// How often a full user pass runs
    pub poll_interval: Duration,
    /// Pause between users within a pass, to pace provider calls
    pub user_delay: Duration,
    /// How many recent scores to fetch per user
    pub fetch_limit: u32,
    pub retry: RetryPolicy,
}

/// Periodic score synchronization driver.
///
/// One pass ("tick") walks every registered user sequentially, pulls their
/// recent scores from the provider and funnels the eligible ones through
/// the multiplier into the best-score store. Ticks never overlap.
pub struct Tracker {
    users: Arc<dyn UserRepository>,
    packs: Arc<dyn PackRepository>,
    scores: Arc<dyn ScoreRepository>,
    provider: Arc<dyn ScoreProvider>,
    notifier: Arc<dyn Notifier>,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(
        users: Arc<dyn UserRepository>,
        packs: Arc<dyn PackRepository>,
        scores: Arc<dyn ScoreRepository>,
        provider: Arc<dyn ScoreProvider>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            users,
            packs,
            scores,
            provider,
            notifier,
            config,
        }
    }

    /// Runs the tracker until the shutdown token fires.
    ///
    /// One pass runs immediately at startup, then the interval schedule
    /// takes over. An error escaping a tick (user listing failed) is not
    /// retried here; the caller treats it as fatal.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), AppError> {
        info!(
            pack_id = self.config.pack_id,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Starting score tracker"
        );

        self.run_tick(&shutdown).await?;

        let mut ticker = interval_at(
            Instant::now() + self.config.poll_interval,
            self.config.poll_interval,
        );
        // A pass longer than the interval delays the next tick instead of
        // bunching ticks together.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Score tracker stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.run_tick(&shutdown).await?;
                }
            }
        }
    }

    /// One full pass over the registered users.
    #[instrument(skip(self, shutdown))]
    pub async fn run_tick(&self, shutdown: &CancellationToken) -> Result<(), AppError> {
        let users = self.users.list_registered().await?;
        info!(user_count = users.len(), "Score sync tick started");

        for user in &users {
            if shutdown.is_cancelled() {
                info!("Shutdown requested, stopping user loop");
                break;
            }

            let result = retry_user_sync(
                self.config.retry,
                &self.notifier,
                user.osu_user_id,
                || self.sync_user(user),
            )
            .await;

            if let Err(e) = result {
                // Exhausted retries: log and move on, one user must never
                // block the rest of the tick.
                error!(
                    osu_user_id = user.osu_user_id,
                    osu_username = %user.osu_username,
                    error = %e,
                    "User sync failed after all retries, skipping user"
                );
            }

            tokio::time::sleep(self.config.user_delay).await;
        }

        info!("Score sync tick finished");
        Ok(())
    }

    /// Synchronizes one user's recent scores into the best-score store.
    ///
    /// The pack map set is re-fetched on every call so map-list edits take
    /// effect without a restart.
    #[instrument(skip(self, user), fields(osu_user_id = user.osu_user_id))]
    pub async fn sync_user(&self, user: &RegisteredUser) -> Result<(), SyncError> {
        let pack_maps = self.packs.active_map_ids(self.config.pack_id).await?;
        let recent = self
            .provider
            .recent_scores(user.osu_user_id, self.config.fetch_limit)
            .await?;

        debug!(score_count = recent.len(), "Fetched recent scores");

        for score in recent {
            match check_score(&score, &self.config.window, &pack_maps) {
                Eligibility::Stop => {
                    debug!(
                        score_id = score.score_id,
                        "Score predates pack start, rest of batch is older"
                    );
                    break;
                }
                Eligibility::Skip => continue,
                Eligibility::Accept => self.process_score(user, score).await?,
            }
        }

        Ok(())
    }

    /// Applies the map rule and commits the score if it beats the stored best.
    async fn process_score(
        &self,
        user: &RegisteredUser,
        score: RecentScore,
    ) -> Result<(), SyncError> {
        let Some(beatmap_id) = score.beatmap_id else {
            return Ok(());
        };

        let rule = self.packs.map_rule(self.config.pack_id, beatmap_id).await?;
        let adjusted = apply_map_rule(score.score, &score.mods, rule.as_ref());

        let record = ScoreRecord {
            user_id: user.osu_user_id,
            beatmap_id,
            pack_id: self.config.pack_id,
            score_id: score.score_id,
            score: adjusted,
            combo: score.max_combo,
            accuracy: score.accuracy,
            rank: score.rank,
        };

        let outcome = self.scores.upsert_if_greater(&record).await?;

        if outcome.applied {
            info!(
                osu_user_id = user.osu_user_id,
                beatmap_id,
                previous = outcome.previous,
                score = adjusted,
                "New best score stored"
            );
            self.spawn_announcement(user, beatmap_id, outcome.previous, adjusted);
        } else {
            debug!(
                osu_user_id = user.osu_user_id,
                beatmap_id,
                kept = outcome.previous,
                candidate = adjusted,
                "Candidate did not beat stored score"
            );
        }

        Ok(())
    }

    /// Announcement runs detached so webhook latency never delays the next
    /// user's check; its failure is logged and otherwise ignored.
    fn spawn_announcement(
        &self,
        user: &RegisteredUser,
        beatmap_id: i64,
        old_score: i64,
        new_score: i64,
    ) {
        let provider = Arc::clone(&self.provider);
        let notifier = Arc::clone(&self.notifier);
        let username = user.osu_username.clone();

        tokio::spawn(async move {
            let map_display = match provider.beatmap_display(beatmap_id).await {
                Ok(display) => display,
                Err(e) => {
                    debug!(error = %e, beatmap_id, "Falling back to bare map id in announcement");
                    format!("map {}", beatmap_id)
                }
            };

            let message = new_score_message(&username, &map_display, old_score, new_score);
            if let Err(e) = notifier.send(&message).await {
                error!(error = %e, "Failed to announce new score");
            }
        });
    }
}
