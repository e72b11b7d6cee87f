//! Dependency descriptors and request-scoped teardown.
//!
//! A [`Dependency`] wraps a zero-argument producer tagged with a
//! [`DependencyKind`] chosen when the descriptor is built:
//!
//! | Kind | Producer | Teardown |
//! |------|----------|----------|
//! | [`Sync`](DependencyKind::Sync) | plain closure, called inline | none |
//! | [`Async`](DependencyKind::Async) | closure returning a future | none |
//! | [`Scoped`](DependencyKind::Scoped) | `acquire` future + `release` future | `release(value)` |
//!
//! Scoped teardowns are owned by the request's [`ScopeStack`], which
//! releases them in reverse acquisition order on every exit path.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tessera_core::{Dependency, ScopeStack};
//!
//! struct Session {
//!     user: String,
//! }
//!
//! # tokio_test::block_on(async {
//! let session = Dependency::scoped(
//!     || async { Ok(Session { user: "ada".to_string() }) },
//!     |session: Arc<Session>| async move {
//!         // close the session
//!         let _ = &session.user;
//!         Ok(())
//!     },
//! );
//!
//! let mut scope = ScopeStack::new();
//! let value = scope.resolve(&session).await.unwrap();
//! let session = value.downcast::<Session>().unwrap();
//! assert_eq!(session.user, "ada");
//! assert_eq!(scope.close().await, 1);
//! # });
//! ```

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use metrics::counter;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A resolved dependency value.
pub type DependencyValue = Arc<dyn Any + Send + Sync>;

type SyncProducer = Arc<dyn Fn() -> anyhow::Result<DependencyValue> + Send + Sync>;
type AsyncProducer =
    Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<DependencyValue>> + Send + Sync>;
type ScopedProducer = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Resolved>> + Send + Sync>;

/// How a dependency is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Called inline.
    Sync,
    /// Awaited.
    Async,
    /// Acquired, then released when the request ends.
    Scoped,
}

#[derive(Clone)]
enum Producer {
    Sync(SyncProducer),
    Async(AsyncProducer),
    Scoped(ScopedProducer),
}

/// A dependency descriptor.
///
/// Cloning is cheap; the producer is shared.
#[derive(Clone)]
pub struct Dependency {
    name: Cow<'static, str>,
    producer: Producer,
}

impl Dependency {
    /// A synchronous producer.
    pub fn sync<T, F>(produce: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let producer: SyncProducer =
            Arc::new(move || produce().map(|value| Arc::new(value) as DependencyValue));
        Self {
            name: Cow::Borrowed(std::any::type_name::<T>()),
            producer: Producer::Sync(producer),
        }
    }

    /// An asynchronous producer.
    pub fn asynchronous<T, F, Fut>(produce: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let producer: AsyncProducer = Arc::new(move || {
            let fut = produce();
            async move { fut.await.map(|value| Arc::new(value) as DependencyValue) }.boxed()
        });
        Self {
            name: Cow::Borrowed(std::any::type_name::<T>()),
            producer: Producer::Async(producer),
        }
    }

    /// A scoped resource: `acquire` yields the value once per request and
    /// `release` is handed the same value when the request ends.
    pub fn scoped<T, A, AFut, R, RFut>(acquire: A, release: R) -> Self
    where
        T: Send + Sync + 'static,
        A: Fn() -> AFut + Send + Sync + 'static,
        AFut: Future<Output = anyhow::Result<T>> + Send + 'static,
        R: Fn(Arc<T>) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let label = std::any::type_name::<T>();
        let release = Arc::new(release);
        let producer: ScopedProducer = Arc::new(move || {
            let fut = acquire();
            let release = Arc::clone(&release);
            async move {
                let value = Arc::new(fut.await?);
                let handle = Arc::clone(&value);
                Ok::<_, anyhow::Error>(Resolved {
                    value,
                    teardown: Some(Teardown::new(label, move || release(handle))),
                })
            }
            .boxed()
        });
        Self {
            name: Cow::Borrowed(label),
            producer: Producer::Scoped(producer),
        }
    }

    /// Overrides the name used in logs. Defaults to the produced type name.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns the name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resolution kind.
    #[must_use]
    pub fn kind(&self) -> DependencyKind {
        match self.producer {
            Producer::Sync(_) => DependencyKind::Sync,
            Producer::Async(_) => DependencyKind::Async,
            Producer::Scoped(_) => DependencyKind::Scoped,
        }
    }

    /// Produces the value and, for scoped dependencies, its teardown.
    ///
    /// Prefer [`ScopeStack::resolve`], which takes ownership of the teardown.
    pub async fn resolve(&self) -> anyhow::Result<Resolved> {
        match &self.producer {
            Producer::Sync(produce) => Ok(Resolved::plain(produce()?)),
            Producer::Async(produce) => Ok(Resolved::plain(produce().await?)),
            Producer::Scoped(produce) => produce().await,
        }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// A resolved value and its optional teardown.
pub struct Resolved {
    /// The produced value.
    pub value: DependencyValue,
    /// The release step for scoped dependencies.
    pub teardown: Option<Teardown>,
}

impl Resolved {
    fn plain(value: DependencyValue) -> Self {
        Self {
            value,
            teardown: None,
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("teardown", &self.teardown)
            .finish_non_exhaustive()
    }
}

/// A pending release step.
pub struct Teardown {
    label: Cow<'static, str>,
    release: Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>,
}

impl Teardown {
    /// Wraps a release closure.
    pub fn new<F, Fut>(label: impl Into<Cow<'static, str>>, release: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            label: label.into(),
            release: Box::new(move || release().boxed()),
        }
    }

    /// Returns the label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the release step. Failures and panics are logged and absorbed.
    pub async fn run(self) {
        let Self { label, release } = self;
        match AssertUnwindSafe(async move { release().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => debug!(dependency = %label, "released scoped dependency"),
            Ok(Err(err)) => {
                counter!("tessera_teardown_failures_total").increment(1);
                warn!(dependency = %label, error = %err, "scoped dependency release failed");
            }
            Err(_) => {
                counter!("tessera_teardown_failures_total").increment(1);
                warn!(dependency = %label, "scoped dependency release panicked");
            }
        }
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// The teardowns acquired while serving one request.
///
/// Call [`close`](Self::close) once the handler has finished. If the stack is
/// dropped first (for example because the request future was cancelled), the
/// remaining teardowns are moved onto the current tokio runtime and still run
/// in reverse order.
#[derive(Debug, Default)]
pub struct ScopeStack {
    teardowns: Vec<Teardown>,
    acquired: usize,
}

impl ScopeStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of a teardown.
    pub fn push(&mut self, teardown: Teardown) {
        self.acquired += 1;
        self.teardowns.push(teardown);
    }

    /// Resolves a dependency, keeping its teardown on this stack.
    pub async fn resolve(&mut self, dependency: &Dependency) -> anyhow::Result<DependencyValue> {
        let Resolved { value, teardown } = dependency.resolve().await?;
        if let Some(teardown) = teardown {
            debug!(dependency = %dependency.name(), "acquired scoped dependency");
            self.push(teardown);
        }
        Ok(value)
    }

    /// Number of teardowns ever pushed.
    #[must_use]
    pub fn acquired(&self) -> usize {
        self.acquired
    }

    /// Number of teardowns not yet run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.teardowns.len()
    }

    /// Runs every pending teardown, last acquired first. Returns how many ran.
    pub async fn close(mut self) -> usize {
        let mut released = 0;
        while let Some(teardown) = self.teardowns.pop() {
            teardown.run().await;
            released += 1;
        }
        released
    }
}

impl Drop for ScopeStack {
    fn drop(&mut self) {
        if self.teardowns.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.teardowns);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(
                    pending = pending.len(),
                    "request scope dropped before close, releasing in background"
                );
                handle.spawn(async move {
                    for teardown in pending.into_iter().rev() {
                        teardown.run().await;
                    }
                });
            }
            Err(_) => {
                error!(
                    pending = pending.len(),
                    "request scope dropped outside a tokio runtime, teardowns skipped"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    type Log = Arc<Mutex<Vec<String>>>;

    fn explode() -> anyhow::Result<()> {
        panic!("boom")
    }

    fn tracked(log: &Log, name: &'static str) -> Dependency {
        let acquire_log = Arc::clone(log);
        let release_log = Arc::clone(log);
        Dependency::scoped(
            move || {
                let log = Arc::clone(&acquire_log);
                async move {
                    log.lock().unwrap().push(format!("acquire {name}"));
                    Ok(name)
                }
            },
            move |value: Arc<&'static str>| {
                let log = Arc::clone(&release_log);
                async move {
                    log.lock().unwrap().push(format!("release {value}"));
                    Ok(())
                }
            },
        )
    }

    #[tokio::test]
    async fn test_sync_dependency() {
        let dep = Dependency::sync(|| Ok(41_i64 + 1));
        assert_eq!(dep.kind(), DependencyKind::Sync);
        assert_eq!(dep.name(), "i64");

        let resolved = dep.resolve().await.unwrap();
        assert!(resolved.teardown.is_none());
        assert_eq!(*resolved.value.downcast::<i64>().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_async_dependency() {
        let dep = Dependency::asynchronous(|| async { Ok("token".to_string()) }).named("token");
        assert_eq!(dep.kind(), DependencyKind::Async);
        assert_eq!(dep.name(), "token");

        let mut scope = ScopeStack::new();
        let value = scope.resolve(&dep).await.unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "token");
        assert_eq!(scope.acquired(), 0);
    }

    #[tokio::test]
    async fn test_failed_producer_has_no_teardown() {
        let dep = Dependency::sync::<i64, _>(|| Err(anyhow::anyhow!("offline")));
        let mut scope = ScopeStack::new();
        assert!(scope.resolve(&dep).await.is_err());
        assert_eq!(scope.pending(), 0);
    }

    #[tokio::test]
    async fn test_scoped_released_in_reverse_order() {
        let log: Log = Arc::default();
        let mut scope = ScopeStack::new();
        for name in ["db", "cache", "lock"] {
            scope.resolve(&tracked(&log, name)).await.unwrap();
        }
        assert_eq!(scope.acquired(), 3);
        assert_eq!(scope.close().await, 3);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "acquire db",
                "acquire cache",
                "acquire lock",
                "release lock",
                "release cache",
                "release db",
            ]
        );
    }

    #[tokio::test]
    async fn test_release_failure_does_not_stop_other_releases() {
        let log: Log = Arc::default();
        let mut scope = ScopeStack::new();
        scope.resolve(&tracked(&log, "first")).await.unwrap();
        scope.push(Teardown::new("broken", || async {
            Err(anyhow::anyhow!("connection reset"))
        }));
        scope.push(Teardown::new("panicking", || async { explode() }));

        assert_eq!(scope.close().await, 3);
        assert_eq!(log.lock().unwrap().last().unwrap(), "release first");
    }

    #[tokio::test]
    async fn test_dropped_scope_still_releases() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut scope = ScopeStack::new();
            for label in ["outer", "inner"] {
                let tx = tx.clone();
                scope.push(Teardown::new(label, move || async move {
                    tx.send(label).ok();
                    Ok(())
                }));
            }
        }
        assert_eq!(rx.recv().await, Some("inner"));
        assert_eq!(rx.recv().await, Some("outer"));
    }
}
