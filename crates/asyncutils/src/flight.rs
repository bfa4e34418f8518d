//! In-flight request deduplication.
//!
//! A [`SingleFlight`] is a mutex-guarded map from key to a [`Shared`] future.
//! The first caller for a key registers the work; every caller that arrives
//! while it is still running gets a clone of the same shared future, so the
//! work runs exactly once and everybody observes the same output (including
//! a failure, if `V` is a `Result`).
//!
//! The map entry is removed by the future itself at the moment it settles,
//! before the output is handed to any waiter. The next call for that key
//! after that point starts a brand new flight.

use futures::future::{BoxFuture, FutureExt, Shared};
use pin_project_lite::pin_project;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll, ready};

/// A handle to (possibly shared) in-flight work. Await it like any future.
pub type Flight<V> = Shared<BoxFuture<'static, V>>;

type FlightMap<K, V> = Mutex<HashMap<K, Flight<V>>>;

// Nothing in here can leave the map half-updated, so a poisoned lock is
// still perfectly usable.
fn lock<K, V>(map: &FlightMap<K, V>) -> MutexGuard<'_, HashMap<K, Flight<V>>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Deduplicates concurrent async work by key.
///
/// # Examples
///
/// ```
/// use reel_asyncutils::SingleFlight;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let flights: SingleFlight<&'static str, u64> = SingleFlight::new();
/// let a = flights.run("movie.mkv", || async { 42 });
/// // Joins the first flight, so this closure never runs.
/// let b = flights.run("movie.mkv", || async { 0 });
/// assert_eq!(futures::join!(a, b), (42, 42));
/// # }
/// ```
pub struct SingleFlight<K, V> {
    flights: Arc<FlightMap<K, V>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self { flights: Arc::new(Mutex::new(HashMap::new())) }
    }
}

/// Clones share the same set of flights.
impl<K, V> Clone for SingleFlight<K, V> {
    fn clone(&self) -> Self {
        Self { flights: Arc::clone(&self.flights) }
    }
}

impl<K, V> std::fmt::Debug for SingleFlight<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").field("in_flight", &lock(&self.flights).len()).finish()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the flight registered for `key`, or start a new one from `work`.
    ///
    /// `work` is only invoked when no flight exists; it should build the
    /// future and return immediately (it is called while the map is locked).
    /// The returned future is lazy like any other: the work makes progress
    /// when at least one of the handles is polled.
    pub fn run<F, Fut>(&self, key: K, work: F) -> Flight<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let mut flights = lock(&self.flights);
        if let Some(flight) = flights.get(&key) {
            return flight.clone();
        }
        let landing = Landing {
            work: work(),
            key: Some(key.clone()),
            flights: Arc::downgrade(&self.flights),
        };
        let flight = landing.boxed().shared();
        flights.insert(key, flight.clone());
        flight
    }

    /// Whether work for `key` is currently registered.
    pub fn is_in_flight(&self, key: &K) -> bool {
        lock(&self.flights).contains_key(key)
    }

    /// Number of keys with work currently registered.
    pub fn len(&self) -> usize {
        lock(&self.flights).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pin_project! {
    /// Wraps the caller's future and deregisters the flight when it settles.
    struct Landing<K, V, F> {
        #[pin]
        work: F,
        key: Option<K>,
        flights: Weak<FlightMap<K, V>>,
    }
}

impl<K, V, F> Future for Landing<K, V, F>
where
    K: Eq + Hash,
    F: Future<Output = V>,
{
    type Output = V;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<V> {
        let this = self.project();
        let output = ready!(this.work.poll(cx));
        if let Some(key) = this.key.take()
            && let Some(flights) = this.flights.upgrade()
        {
            lock(&flights).remove(&key);
        }
        Poll::Ready(output)
    }
}
