// Library crate for the unpack score tracker
// This file exposes the public API for integration tests

pub mod config;
pub mod notify;
pub mod pack;
pub mod provider;
pub mod score;
pub mod shared;
pub mod tracker;
pub mod user;

// Re-export commonly used types for easier access in tests
pub use config::{Config, ConfigError};
pub use notify::Notifier;
pub use pack::{models::MapRule, models::PackWindow, repository::PackRepository};
pub use provider::{ProviderError, RecentScore, ScoreProvider};
pub use score::{models::ScoreRecord, repository::ScoreRepository};
pub use shared::AppError;
pub use tracker::{SyncError, Tracker, TrackerConfig};
pub use user::{models::RegisteredUser, repository::UserRepository};
