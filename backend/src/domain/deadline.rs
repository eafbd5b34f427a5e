//! Deadlines for storage calls made by domain services.

use std::future::Future;
use std::time::Duration;

use serde_json::json;
use tracing::warn;

use super::Error;

/// Default upper bound for a single storage call.
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-call deadlines applied by the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTimeouts {
    storage: Duration,
}

impl ServiceTimeouts {
    /// Bound every storage call by `storage`.
    pub fn new(storage: Duration) -> Self {
        Self { storage }
    }

    /// Deadline for one storage call.
    pub fn storage(&self) -> Duration {
        self.storage
    }

    /// Run a storage call under the storage deadline.
    ///
    /// An expired deadline becomes a retryable `service_unavailable` error
    /// naming `operation`; the call's own output is returned untouched.
    pub(crate) async fn run<F>(&self, operation: &'static str, call: F) -> Result<F::Output, Error>
    where
        F: Future,
    {
        tokio::time::timeout(self.storage, call)
            .await
            .map_err(|_| {
                let timeout_ms = u64::try_from(self.storage.as_millis()).unwrap_or(u64::MAX);
                warn!(operation, timeout_ms, "storage call timed out");
                Error::service_unavailable(format!("{operation} timed out"))
                    .with_details(json!({ "operation": operation, "timeoutMs": timeout_ms }))
            })
    }

    /// Run a storage call under the deadline and map its port error.
    pub(crate) async fn bound<T, E, F>(
        &self,
        operation: &'static str,
        call: F,
        map_error: impl FnOnce(E) -> Error,
    ) -> Result<T, Error>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.run(operation, call).await?.map_err(map_error)
    }
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_TIMEOUT)
    }
}
