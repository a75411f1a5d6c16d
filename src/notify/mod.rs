pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;

pub use webhook::DiscordWebhook;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Fire-and-forget notification sink. Callers treat failures as non-fatal
/// and must never let a failed send abort their own control flow.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, content: &str) -> Result<(), NotifyError>;
}

/// Message announcing a new best score on a map.
pub fn new_score_message(username: &str, map_display: &str, old_score: i64, new_score: i64) -> String {
    format!(
        "New score found for {} on {} :\n{} Score Gained",
        username,
        map_display,
        group_digits(new_score - old_score)
    )
}

/// Side-channel alert emitted before each retry of a failed user sync.
pub fn sync_failure_alert(osu_user_id: i64, attempt: u32, error: &str) -> String {
    format!(
        "Score sync failed for user {} (attempt {}): {}",
        osu_user_id, attempt, error
    )
}

/// Thousands separation for score values in chat messages.
pub fn group_digits(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_digits_in_threes() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234567), "1,234,567");
        assert_eq!(group_digits(-4500), "-4,500");
    }

    #[test]
    fn new_score_message_carries_the_delta() {
        let msg = new_score_message("alice", "Artist - Title [Hard]", 1000, 1080);
        assert!(msg.contains("alice"));
        assert!(msg.contains("Artist - Title [Hard]"));
        assert!(msg.contains("80 Score Gained"));
    }
}
