use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use unpack::notify::NotifyError;
use unpack::provider::{ProviderError, RecentScore};
use unpack::{Notifier, ScoreProvider};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Scriptable score provider: per-user score batches plus an optional
/// number of leading failures to exercise the retry wrapper.
#[derive(Default)]
pub struct MockProvider {
    scores: Mutex<HashMap<i64, Vec<RecentScore>>>,
    failures_remaining: Mutex<HashMap<i64, u32>>,
    fetch_attempts: Mutex<HashMap<i64, u32>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_scores(&self, user_id: i64, scores: Vec<RecentScore>) {
        self.scores.lock().unwrap().insert(user_id, scores);
    }

    /// The next `count` fetches for this user fail before any succeeds.
    pub fn fail_next_fetches(&self, user_id: i64, count: u32) {
        self.failures_remaining
            .lock()
            .unwrap()
            .insert(user_id, count);
    }

    pub fn fetch_attempts(&self, user_id: i64) -> u32 {
        self.fetch_attempts
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ScoreProvider for MockProvider {
    async fn recent_scores(
        &self,
        user_id: i64,
        _limit: u32,
    ) -> Result<Vec<RecentScore>, ProviderError> {
        *self
            .fetch_attempts
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default() += 1;

        {
            let mut failures = self.failures_remaining.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&user_id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(ProviderError::Token("simulated outage".to_string()));
                }
            }
        }

        Ok(self
            .scores
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn username(&self, user_id: i64) -> Result<String, ProviderError> {
        Ok(format!("user-{}", user_id))
    }

    async fn beatmap_display(&self, beatmap_id: i64) -> Result<String, ProviderError> {
        Ok(format!("Mock Artist - Mock Title [{}]", beatmap_id))
    }
}

/// Notifier that records everything it is asked to send.
#[derive(Default)]
pub struct MockNotifier {
    messages: Mutex<Vec<String>>,
    send_count: AtomicU32,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn announcements(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.contains("Score Gained"))
            .collect()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.contains("Score sync failed"))
            .collect()
    }

    pub fn total_sends(&self) -> u32 {
        self.send_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, content: &str) -> Result<(), NotifyError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        self.messages.lock().unwrap().push(content.to_string());
        Ok(())
    }
}
