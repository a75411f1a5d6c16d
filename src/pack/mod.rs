pub mod handlers;
pub mod models;
pub mod repository;

pub use models::{MapRule, PackMapEntry, PackWindow};
pub use repository::{InMemoryPackRepository, PackRepository, PostgresPackRepository};
