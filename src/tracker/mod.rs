pub mod eligibility;
pub mod errors;
pub mod retry;
pub mod service;

pub use eligibility::{check_score, Eligibility};
pub use errors::SyncError;
pub use retry::RetryPolicy;
pub use service::{Tracker, TrackerConfig};
