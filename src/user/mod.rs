pub mod handlers;
pub mod models;
pub mod repository;

pub use models::RegisteredUser;
pub use repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository};
