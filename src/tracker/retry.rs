use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::notify::{sync_failure_alert, Notifier};

/// Exponential backoff policy for per-user synchronization.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Runs one user's synchronization with exponential backoff.
///
/// Before each retry an alert goes to the notification endpoint with the
/// failure details; the alert itself is best-effort and a failed send never
/// interrupts the retry sequence. The error of the final attempt is
/// returned once attempts are exhausted.
pub async fn retry_user_sync<T, E, F, Fut>(
    policy: RetryPolicy,
    notifier: &Arc<dyn Notifier>,
    osu_user_id: i64,
    mut sync: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = policy.base_delay;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match sync().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempt >= policy.max_attempts {
                    return Err(error);
                }

                warn!(
                    osu_user_id,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %error,
                    "User sync failed, backing off before retry"
                );

                let alert = sync_failure_alert(osu_user_id, attempt, &error.to_string());
                if let Err(alert_error) = notifier.send(&alert).await {
                    warn!(error = %alert_error, "Failed to emit retry alert");
                }

                let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                tokio::time::sleep(delay + jitter).await;
                delay *= 2;
            }
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::notify::NotifyError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Notifier that records every message it is asked to send.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub messages: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn sent(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, content: &str) -> Result<(), NotifyError> {
            self.messages.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    /// Notifier whose sends always fail, for the alert-failure path.
    pub struct BrokenNotifier;

    #[async_trait]
    impl Notifier for BrokenNotifier {
        async fn send(&self, _content: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Status(reqwest::StatusCode::BAD_GATEWAY))
        }
    }
}
