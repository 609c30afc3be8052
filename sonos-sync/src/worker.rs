//! Bounded pool for blocking device calls

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{Result, SyncError};

/// Runs blocking closures on the blocking thread pool, at most `size` at once
///
/// Device proxies do synchronous network I/O. Running them here keeps event
/// dispatch tasks responsive and caps how hard a household gets hammered
/// during bulk operations.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| SyncError::ShutDown)?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| SyncError::Worker(e.to_string()))
    }

    /// Idle capacity
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Reject all further jobs; jobs already running finish
    pub fn close(&self) {
        self.permits.close();
    }
}
