//! Scoped acquisition with guaranteed release.
//!
//! [`run_scoped`] acquires a resource, runs an async body against the target
//! and releases the resource on every exit path, exactly once. Errors from the
//! body are never swallowed: they are returned after the release.
//!
//! [`HistorySuspension`] is the resource the pipeline uses: it suspends the
//! host's undo history so the whole run collapses into one step, successful or
//! not. [`run_atomic`] wires the two together.

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::error::{ErrorKind, PipelineError, Result};
use crate::host::{Host, SuspensionId};

/// A resource acquired on a target before a body runs and released after.
#[async_trait]
pub trait ScopedResource<T: ?Sized + Send>: Send + Sync {
    type Token: Send;

    async fn acquire(&self, target: &mut T) -> Result<Self::Token>;

    async fn release(&self, target: &mut T, token: Self::Token) -> Result<()>;
}

/// Run `body` inside `scope`.
///
/// - Acquire fails: the body never runs and the acquire error is returned.
/// - Body fails: the scope is still released, then the body error is returned.
///   A release failure on this path is logged, the body error wins.
/// - Body succeeds, release fails: the release error is returned.
pub async fn run_scoped<T, S, R, F>(scope: &S, target: &mut T, body: F) -> Result<R>
where
    T: ?Sized + Send,
    S: ScopedResource<T>,
    F: for<'a> FnOnce(&'a mut T) -> BoxFuture<'a, Result<R>>,
{
    let token = scope.acquire(target).await?;
    let outcome = body(&mut *target).await;
    let released = scope.release(target, token).await;

    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(release_err)) => {
            warn!(error = %release_err, "release failed after body error");
            Err(err)
        }
    }
}

/// Suspends undo history for one document; released by resuming it.
#[derive(Debug, Clone)]
pub struct HistorySuspension {
    name: String,
}

impl HistorySuspension {
    /// `name` labels the single history entry the scope collapses into.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<H: Host> ScopedResource<H> for HistorySuspension {
    type Token = SuspensionId;

    async fn acquire(&self, host: &mut H) -> Result<SuspensionId> {
        let document = host.id();
        let token = host
            .suspend_history(document, &self.name)
            .await
            .map_err(|e| PipelineError::from_host(ErrorKind::TransactionFailed, e))?;
        debug!(%document, suspension = token.0, name = %self.name, "history suspended");
        Ok(token)
    }

    async fn release(&self, host: &mut H, token: SuspensionId) -> Result<()> {
        host.resume_history(token)
            .await
            .map_err(|e| PipelineError::from_host(ErrorKind::TransactionFailed, e))?;
        debug!(suspension = token.0, "history resumed");
        Ok(())
    }
}

/// Run `body` as one undo step named `name`.
pub async fn run_atomic<H, R, F>(host: &mut H, name: &str, body: F) -> Result<R>
where
    H: Host,
    F: for<'a> FnOnce(&'a mut H) -> BoxFuture<'a, Result<R>>,
{
    run_scoped(&HistorySuspension::new(name), host, body).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Lock {
        acquired: usize,
        released: usize,
        body_runs: usize,
        fail_acquire: bool,
        fail_release: bool,
    }

    struct LockScope;

    #[async_trait]
    impl ScopedResource<Lock> for LockScope {
        type Token = usize;

        async fn acquire(&self, lock: &mut Lock) -> Result<usize> {
            if lock.fail_acquire {
                return Err(PipelineError::transaction_failed("acquire"));
            }
            lock.acquired += 1;
            Ok(lock.acquired)
        }

        async fn release(&self, lock: &mut Lock, token: usize) -> Result<()> {
            assert_eq!(token, lock.acquired, "released with a stale token");
            lock.released += 1;
            if lock.fail_release {
                return Err(PipelineError::transaction_failed("release"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_success_releases_once() {
        let mut lock = Lock::default();
        let value = run_scoped(&LockScope, &mut lock, |l| {
            Box::pin(async move {
                l.body_runs += 1;
                Ok(42)
            })
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!((lock.acquired, lock.released, lock.body_runs), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_body_error_still_releases() {
        let mut lock = Lock::default();
        let err = run_scoped(&LockScope, &mut lock, |_| {
            Box::pin(async move { Err::<(), _>(PipelineError::grouping_failed("boom")) })
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::GroupingFailed);
        assert_eq!((lock.acquired, lock.released), (1, 1));
    }

    #[tokio::test]
    async fn test_acquire_failure_skips_body() {
        let mut lock = Lock {
            fail_acquire: true,
            ..Lock::default()
        };
        let err = run_scoped(&LockScope, &mut lock, |l| {
            Box::pin(async move {
                l.body_runs += 1;
                Ok(())
            })
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert_eq!((lock.body_runs, lock.released), (0, 0));
    }

    #[tokio::test]
    async fn test_release_failure_after_success() {
        let mut lock = Lock {
            fail_release: true,
            ..Lock::default()
        };
        let err = run_scoped(&LockScope, &mut lock, |_| Box::pin(async move { Ok(()) }))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransactionFailed);
        assert_eq!(lock.released, 1);
    }

    #[tokio::test]
    async fn test_body_error_wins_over_release_error() {
        let mut lock = Lock {
            fail_release: true,
            ..Lock::default()
        };
        let err = run_scoped(&LockScope, &mut lock, |_| {
            Box::pin(async move { Err::<(), _>(PipelineError::effect_failed("shadow")) })
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EffectApplyFailed);
        assert_eq!(lock.released, 1);
    }
}
