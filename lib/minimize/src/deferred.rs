//! Values that are either known up front or computed when a chunk is rendered.
use std::{fmt, future::Future, sync::Arc};

use futures::future::{BoxFuture, FutureExt as _};

type Producer<T> = Arc<dyn Fn() -> BoxFuture<'static, T> + Send + Sync>;

/// A literal value or a zero-argument producer of one.
///
/// Banners and footers use this so that text depending on build metadata can be supplied at
/// configuration time and computed at render time.
pub enum Deferred<T> {
    Literal(T),
    Producer(Producer<T>),
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// Wrap a synchronous producer.
    pub fn from_fn<F>(produce: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let produce = Arc::new(produce);
        Deferred::Producer(Arc::new(move || {
            let value = produce();
            async move { value }.boxed()
        }))
    }

    /// Wrap an asynchronous producer.
    pub fn from_async<F, Fut>(produce: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Deferred::Producer(Arc::new(move || produce().boxed()))
    }

    /// Obtain the concrete value, invoking the producer once if there is one.
    pub async fn resolve(&self) -> T {
        match self {
            Deferred::Literal(value) => value.clone(),
            Deferred::Producer(produce) => produce().await,
        }
    }
}

impl<T> Clone for Deferred<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Deferred::Literal(value) => Deferred::Literal(value.clone()),
            Deferred::Producer(produce) => Deferred::Producer(Arc::clone(produce)),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Deferred::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

impl From<String> for Deferred<String> {
    fn from(value: String) -> Self {
        Deferred::Literal(value)
    }
}

impl From<&str> for Deferred<String> {
    fn from(value: &str) -> Self {
        Deferred::Literal(value.to_owned())
    }
}

/// Resolve an optional deferred value.
pub async fn resolve<T: Clone + Send + 'static>(value: Option<&Deferred<T>>) -> Option<T> {
    match value {
        Some(value) => Some(value.resolve().await),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn literal_is_returned_unchanged() {
        let value = Deferred::from("/*! banner */");
        assert_eq!(pollster::block_on(value.resolve()), "/*! banner */");
    }

    #[test]
    fn sync_producer_is_invoked() {
        let value = Deferred::from_fn(|| String::from("X"));
        assert_eq!(pollster::block_on(value.resolve()), "X");
    }

    #[test]
    fn async_producer_is_awaited() {
        let value = Deferred::from_async(|| async { String::from("X") });
        assert_eq!(pollster::block_on(value.resolve()), "X");
    }

    #[test]
    fn producer_runs_once_per_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let value = Deferred::from_fn(move || counter.fetch_add(1, Ordering::SeqCst));

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(pollster::block_on(value.resolve()), 0);
        assert_eq!(pollster::block_on(value.resolve()), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_value_resolves_to_none() {
        assert_eq!(pollster::block_on(resolve::<String>(None)), None);

        let footer = Deferred::from("f");
        assert_eq!(
            pollster::block_on(resolve(Some(&footer))),
            Some(String::from("f"))
        );
    }
}
