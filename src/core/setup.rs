//! One-time Shared Setup
//!
//! Single-flight initialization shared by concurrent callers, e.g. creating
//! a test user once for a whole test binary.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::KeycloakError;

/// Runs an async initializer exactly once.
///
/// Concurrent first callers wait for the single in-flight run and all observe
/// its outcome; a failure is shared too and is not retried.
pub struct SharedSetup<T> {
    cell: OnceCell<Result<T, Arc<KeycloakError>>>,
}

impl<T> Default for SharedSetup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SharedSetup<T> {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    /// Value of the completed setup, running `init` if nobody has yet.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<&T, Arc<KeycloakError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, KeycloakError>>,
    {
        self.cell
            .get_or_init(|| async { init().await.map_err(Arc::new) })
            .await
            .as_ref()
            .map_err(Arc::clone)
    }

    /// Outcome of a completed setup, `None` while it has not run.
    pub fn get(&self) -> Option<Result<&T, Arc<KeycloakError>>> {
        self.cell
            .get()
            .map(|outcome| outcome.as_ref().map_err(Arc::clone))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
