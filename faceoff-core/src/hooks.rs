//! Benchmark bodies and lifecycle hooks
//!
//! Each hook comes in a synchronous and an asynchronous flavor. Async hooks
//! return a boxed future borrowing their arguments and are driven on a
//! current-thread tokio runtime owned by the execution unit.

use crate::error::BoxError;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by async hooks
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

type SyncBody<M, C> = dyn Fn(&M, &mut C) -> Result<(), BoxError>;
type AsyncBody<M, C> = dyn for<'a> Fn(&'a M, &'a mut C) -> BoxFuture<'a, Result<(), BoxError>>;
type SyncSetup<M, C> = dyn Fn(&M, &Path) -> Result<C, BoxError>;
type AsyncSetup<M, C> = dyn for<'a> Fn(&'a M, &'a Path) -> BoxFuture<'a, Result<C, BoxError>>;
type SyncTeardown<M, C> = dyn Fn(&M, C) -> Result<(), BoxError>;
type AsyncTeardown<M, C> = dyn for<'a> Fn(&'a M, C) -> BoxFuture<'a, Result<(), BoxError>>;

/// The code being measured, invoked with the version's module and the context from `setup`
pub enum Body<M, C> {
    /// Plain function
    Sync(Arc<SyncBody<M, C>>),
    /// Function returning a future; each call is awaited before the next starts
    Async(Arc<AsyncBody<M, C>>),
}

/// Produces the per-execution context from the module and its resolved location
pub enum Setup<M, C> {
    /// Plain function
    Sync(Arc<SyncSetup<M, C>>),
    /// Function returning a future
    Async(Arc<AsyncSetup<M, C>>),
}

/// Releases the context once timing is over, whether or not the body failed
pub enum Teardown<M, C> {
    /// Plain function
    Sync(Arc<SyncTeardown<M, C>>),
    /// Function returning a future
    Async(Arc<AsyncTeardown<M, C>>),
}

impl<M, C> Body<M, C> {
    /// Wrap a synchronous body
    pub fn sync(f: impl Fn(&M, &mut C) -> Result<(), BoxError> + 'static) -> Self {
        Body::Sync(Arc::new(f))
    }

    /// Wrap an asynchronous body
    pub fn future(
        f: impl for<'a> Fn(&'a M, &'a mut C) -> BoxFuture<'a, Result<(), BoxError>> + 'static,
    ) -> Self {
        Body::Async(Arc::new(f))
    }

    /// Invoke the body `iterations` times back to back.
    pub(crate) fn run_batch(
        &self,
        driver: &mut AsyncDriver,
        module: &M,
        context: &mut C,
        iterations: u64,
    ) -> Result<(), BoxError> {
        match self {
            Body::Sync(f) => {
                for _ in 0..iterations {
                    f(module, context)?;
                }
                Ok(())
            }
            Body::Async(f) => driver.block_on(async {
                for _ in 0..iterations {
                    f(module, &mut *context).await?;
                }
                Ok::<(), BoxError>(())
            })?,
        }
    }
}

impl<M, C> Setup<M, C> {
    /// Wrap a synchronous setup
    pub fn sync(f: impl Fn(&M, &Path) -> Result<C, BoxError> + 'static) -> Self {
        Setup::Sync(Arc::new(f))
    }

    /// Wrap an asynchronous setup
    pub fn future(
        f: impl for<'a> Fn(&'a M, &'a Path) -> BoxFuture<'a, Result<C, BoxError>> + 'static,
    ) -> Self {
        Setup::Async(Arc::new(f))
    }

    pub(crate) fn call(
        &self,
        driver: &mut AsyncDriver,
        module: &M,
        location: &Path,
    ) -> Result<C, BoxError> {
        match self {
            Setup::Sync(f) => f(module, location),
            Setup::Async(f) => driver.block_on(f(module, location))?,
        }
    }
}

impl<M, C> Teardown<M, C> {
    /// Wrap a synchronous teardown
    pub fn sync(f: impl Fn(&M, C) -> Result<(), BoxError> + 'static) -> Self {
        Teardown::Sync(Arc::new(f))
    }

    /// Wrap an asynchronous teardown
    pub fn future(
        f: impl for<'a> Fn(&'a M, C) -> BoxFuture<'a, Result<(), BoxError>> + 'static,
    ) -> Self {
        Teardown::Async(Arc::new(f))
    }

    pub(crate) fn call(
        &self,
        driver: &mut AsyncDriver,
        module: &M,
        context: C,
    ) -> Result<(), BoxError> {
        match self {
            Teardown::Sync(f) => f(module, context),
            Teardown::Async(f) => driver.block_on(f(module, context))?,
        }
    }
}

// Arc-backed, so cloning never requires M: Clone or C: Clone

impl<M, C> Clone for Body<M, C> {
    fn clone(&self) -> Self {
        match self {
            Body::Sync(f) => Body::Sync(Arc::clone(f)),
            Body::Async(f) => Body::Async(Arc::clone(f)),
        }
    }
}

impl<M, C> Clone for Setup<M, C> {
    fn clone(&self) -> Self {
        match self {
            Setup::Sync(f) => Setup::Sync(Arc::clone(f)),
            Setup::Async(f) => Setup::Async(Arc::clone(f)),
        }
    }
}

impl<M, C> Clone for Teardown<M, C> {
    fn clone(&self) -> Self {
        match self {
            Teardown::Sync(f) => Teardown::Sync(Arc::clone(f)),
            Teardown::Async(f) => Teardown::Async(Arc::clone(f)),
        }
    }
}

impl<M, C> std::fmt::Debug for Body<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Sync(_) => f.write_str("Body::Sync"),
            Body::Async(_) => f.write_str("Body::Async"),
        }
    }
}

impl<M, C> std::fmt::Debug for Setup<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Setup::Sync(_) => f.write_str("Setup::Sync"),
            Setup::Async(_) => f.write_str("Setup::Async"),
        }
    }
}

impl<M, C> std::fmt::Debug for Teardown<M, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Teardown::Sync(_) => f.write_str("Teardown::Sync"),
            Teardown::Async(_) => f.write_str("Teardown::Async"),
        }
    }
}

/// Lazily-built current-thread runtime for async hooks.
///
/// Synchronous benchmarks never pay for runtime construction.
#[derive(Default)]
pub(crate) struct AsyncDriver {
    runtime: Option<tokio::runtime::Runtime>,
}

impl AsyncDriver {
    pub(crate) fn block_on<F: Future>(&mut self, future: F) -> Result<F::Output, BoxError> {
        if self.runtime.is_none() {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            self.runtime = Some(runtime);
        }
        match &self.runtime {
            Some(runtime) => Ok(runtime.block_on(future)),
            None => Err("async runtime unavailable".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_body_runs_each_iteration() {
        let body: Body<(), u64> = Body::sync(|_, count| {
            *count += 1;
            Ok(())
        });
        let mut driver = AsyncDriver::default();
        let mut count = 0;

        body.run_batch(&mut driver, &(), &mut count, 25).unwrap();
        assert_eq!(count, 25);
        assert!(driver.runtime.is_none());
    }

    #[test]
    fn test_async_body_awaits_in_sequence() {
        let body: Body<(), Vec<u64>> = Body::future(|_, seen: &mut Vec<u64>| {
            Box::pin(async move {
                tokio::task::yield_now().await;
                let next = seen.len() as u64;
                seen.push(next);
                Ok::<(), BoxError>(())
            })
        });
        let mut driver = AsyncDriver::default();
        let mut seen = Vec::new();

        body.run_batch(&mut driver, &(), &mut seen, 5).unwrap();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_body_error_stops_batch() {
        let body: Body<(), u64> = Body::sync(|_, count| {
            *count += 1;
            if *count == 3 {
                return Err("third call fails".into());
            }
            Ok(())
        });
        let mut driver = AsyncDriver::default();
        let mut count = 0;

        let err = body.run_batch(&mut driver, &(), &mut count, 10).unwrap_err();
        assert_eq!(err.to_string(), "third call fails");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_async_setup_and_teardown() {
        let setup: Setup<u64, u64> = Setup::future(|module, _| {
            Box::pin(async move { Ok::<_, BoxError>(*module * 2) })
        });
        let teardown: Teardown<u64, u64> = Teardown::future(|_, ctx| {
            Box::pin(async move {
                if ctx == 14 {
                    Ok::<(), BoxError>(())
                } else {
                    Err(format!("unexpected context {ctx}").into())
                }
            })
        });
        let mut driver = AsyncDriver::default();

        let ctx = setup.call(&mut driver, &7, Path::new("/tmp")).unwrap();
        assert_eq!(ctx, 14);
        teardown.call(&mut driver, &7, ctx).unwrap();
    }
}
