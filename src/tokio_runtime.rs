//! Tokio runtime access for background tasks
//!
//! The progress ticker and the WAV backend spawn small tasks. When the caller
//! already runs inside a Tokio runtime those tasks go there; otherwise a
//! lazily built process-wide runtime is used so the controller also works
//! from plain synchronous code.

use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

static TOKIO_RUNTIME: OnceLock<Option<Runtime>> = OnceLock::new();

fn fallback() -> Option<Handle> {
    TOKIO_RUNTIME
        .get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("playrec-worker")
                .enable_all()
                .build()
                .map_err(|e| log::error!("Failed to create Tokio runtime: {}", e))
                .ok()
        })
        .as_ref()
        .map(|rt| rt.handle().clone())
}

/// Get a runtime handle: the current one if any, else the shared fallback
pub fn handle() -> Option<Handle> {
    Handle::try_current().ok().or_else(fallback)
}

/// Spawn a future on the runtime returned by [`handle`]
///
/// Returns `None` only when no runtime could be built at all.
pub fn spawn<F>(future: F) -> Option<JoinHandle<F::Output>>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    handle().map(|handle| handle.spawn(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_runtime_outside_tokio() {
        assert!(Handle::try_current().is_err());
        assert!(handle().is_some());
    }

    #[tokio::test]
    async fn test_uses_current_runtime() {
        let task = spawn(async { 7 }).expect("runtime available");
        assert_eq!(task.await.expect("task completes"), 7);
    }
}
