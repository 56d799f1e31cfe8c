// Traits for the pluggable parts of the engine - task actions and recovery policy

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;

use crate::engine::types::StateId;

/// A unit of work executed by the task runner
#[async_trait]
pub trait TaskAction: Send + Sync {
    /// Run the action to completion. An `Err` marks the owning task as failed.
    async fn execute(&self) -> Result<()>;
}

/// Recovery policy consulted when a state's work fails.
///
/// The handler only sees the error raised by the failing task. Returning
/// `Ok(Some(state))` asks the engine to resume at `state`; any identifier the
/// machine does not know, or `Ok(None)`, halts the run with a failure outcome.
/// Returning `Err` aborts the run and the error is handed back to the caller
/// of `start()` untouched.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle(&self, error: &anyhow::Error) -> Result<Option<StateId>>;
}

/// Adapter turning a synchronous closure into a [`TaskAction`]
pub struct FnAction<F>(pub F);

#[async_trait]
impl<F> TaskAction for FnAction<F>
where
    F: Fn() -> Result<()> + Send + Sync,
{
    async fn execute(&self) -> Result<()> {
        (self.0)()
    }
}

/// Adapter turning a closure that returns a future into a [`TaskAction`]
pub struct AsyncFnAction<F>(pub F);

#[async_trait]
impl<F, Fut> TaskAction for AsyncFnAction<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn execute(&self) -> Result<()> {
        (self.0)().await
    }
}

/// Adapter turning a synchronous closure into an [`ErrorHandler`]
pub struct FnErrorHandler<F>(pub F);

#[async_trait]
impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(&anyhow::Error) -> Result<Option<StateId>> + Send + Sync,
{
    async fn handle(&self, error: &anyhow::Error) -> Result<Option<StateId>> {
        (self.0)(error)
    }
}
