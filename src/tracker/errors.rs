use thiserror::Error;

use crate::provider::ProviderError;
use crate::shared::AppError;

/// Failure inside one user's synchronization. Contained by the retry
/// wrapper; never propagates across users or aborts a tick.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("store error: {0}")]
    Store(#[from] AppError),
}
