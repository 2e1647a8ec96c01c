//! A process-level pool for long agentic runs.
//!
//! Work is spawned onto a dedicated multi-threaded runtime and awaited from
//! the caller's runtime with a timeout. No runtime is ever nested inside
//! another. On timeout the caller gets [`Error::Timeout`] and the task keeps
//! running to completion in the pool (it is not cancelled), so the tool
//! session it owns is still closed.

use agentchat_core::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{error, warn};

pub struct TaskPool {
    runtime: Option<Runtime>,
    timeout: Duration,
}

impl TaskPool {
    pub fn new(worker_threads: usize, timeout: Duration) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("agentchat-agentic")
            .enable_all()
            .build()
            .map_err(|e| Error::Internal(format!("failed to start task pool: {e}")))?;

        Ok(Self {
            runtime: Some(runtime),
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn handle(&self) -> Result<&Handle> {
        self.runtime
            .as_ref()
            .map(Runtime::handle)
            .ok_or_else(|| Error::Internal("task pool is shut down".into()))
    }

    /// Run `task` on the pool and wait at most the configured timeout.
    pub async fn run<F, T>(&self, task: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.handle()?.spawn(task);

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                error!(error = %join_err, "Agentic task panicked");
                Err(Error::Internal(format!("agentic task failed: {join_err}")))
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Agentic task timed out, leaving it to finish in the background");
                Err(Error::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // Dropping a runtime from async context would panic.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn runs_work_on_the_pool() {
        let pool = TaskPool::new(1, Duration::from_secs(5)).unwrap();
        let name = pool
            .run(async { Ok(std::thread::current().name().map(str::to_string)) })
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("agentchat-agentic"));
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let pool = TaskPool::new(1, Duration::from_secs(5)).unwrap();
        let err = pool
            .run(async { Err::<(), _>(Error::Internal("nope".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn timeout_surfaces_as_error_and_task_keeps_running() {
        let pool = TaskPool::new(1, Duration::from_millis(50)).unwrap();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let err = pool
            .run(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let pool = TaskPool::new(1, Duration::from_secs(5)).unwrap();
        let err = pool
            .run(async {
                if true {
                    panic!("boom");
                }
                Ok::<(), Error>(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }
}
