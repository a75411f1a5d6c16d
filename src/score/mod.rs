pub mod models;
pub mod multiplier;
pub mod repository;

pub use models::{LeaderboardRow, ScoreRecord, UpsertOutcome};
pub use multiplier::apply_map_rule;
pub use repository::{InMemoryScoreRepository, PostgresScoreRepository, ScoreRepository};
