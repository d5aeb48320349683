pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod inbox;
pub mod middleware;
pub mod notifier;
pub mod router;
pub mod suggestions;
pub mod validation;
pub mod verification;

use tracing::error;

use crate::error::ApiError;

/// Run blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })?
}
