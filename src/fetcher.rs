//! Fetcher boundary
//!
//! The cache never talks to the network itself. It hands a resolved
//! [`Request`] to a [`Fetcher`] and stores whatever comes back. Transport,
//! base URL and headers are the fetcher's business.

use crate::cache::config::CacheConfig;
use crate::endpoint::Request;
use crate::error::QueryError;
use futures::future::BoxFuture;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Performs one network call for a resolved request
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Value, QueryError>>;
}

impl<F, Fut> Fetcher for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, QueryError>> + Send + 'static,
{
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Value, QueryError>> {
        Box::pin(self(request))
    }
}

/// Run a query fetch, retrying transient failures per the config
pub(crate) async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    request: Request,
    config: &CacheConfig,
) -> Result<Value, QueryError> {
    let mut attempt = 0;
    loop {
        match fetcher.fetch(request.clone()).await {
            Err(error) if error.is_transient() && attempt < config.max_retries => {
                let delay = config.retry_delay_for(attempt);
                warn!(
                    "Fetch {} {} failed ({}), retry {}/{} in {:?}",
                    request.method,
                    request.path,
                    error,
                    attempt + 1,
                    config.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Base delay doubled per attempt, capped to avoid overflow
pub(crate) fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16))
}
