//! Business flows behind the handlers.

pub mod auth;

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Run a downstream call under `timeout`. Elapsing drops (cancels) the call and
/// yields [`AppError::Timeout`].
pub async fn with_deadline<F, T, E>(timeout: Duration, call: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, E>>,
    AppError: From<E>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result.map_err(AppError::from),
        Err(_) => Err(AppError::Timeout),
    }
}
