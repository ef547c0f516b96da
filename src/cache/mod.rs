//! Client-side keyed query cache with optimistic mutations.
//!
//! The one piece of shared mutable state in the core. UI-facing reads go
//! through [`QueryCache::query`], which serves a cached value while it is
//! fresh and re-fetches otherwise; writes go through [`QueryCache::mutate`],
//! which supports an optimistic provisional value with snapshot rollback and
//! always invalidates dependent keys on settlement. All mutation of cached
//! state happens here; callers never overwrite entries directly, which is
//! what keeps the rollback contract intact.

use crate::errors::CoreResult;
use std::{
    any::Any,
    collections::HashMap,
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// Semantic cache key: a tuple of string segments, e.g.
/// `QueryKey::new(["userCars", user_id])`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// True when `prefix` matches the leading segments of this key.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

type Stored = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
struct Entry {
    value: Stored,
    stored_at: Instant,
    invalidated: bool,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<QueryKey, Entry>,
    /// Fetch generation per key; a completed fetch only lands if its
    /// generation is still current, so a superseded fetch stores nothing.
    generations: HashMap<QueryKey, u64>,
}

/// An optimistic provisional value for one key, applied before the mutation
/// resolves and rolled back if it fails.
pub struct OptimisticUpdate {
    key: QueryKey,
    value: Stored,
}

impl OptimisticUpdate {
    pub fn new<T: Send + Sync + 'static>(key: QueryKey, value: T) -> Self {
        Self {
            key,
            value: Arc::new(value),
        }
    }
}

/// Keyed request cache with staleness windows, invalidation, and reversible
/// optimistic writes.
pub struct QueryCache {
    state: Mutex<CacheState>,
    /// Per-key async locks serializing optimistic apply/rollback, so two
    /// concurrent mutations on the same key cannot interleave a rollback
    /// from one with the provisional value of the other.
    mutation_locks: Mutex<HashMap<QueryKey, Arc<AsyncMutex<()>>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            mutation_locks: Mutex::new(HashMap::new()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().expect("cache state poisoned")
    }

    /// Serve the cached value for `key` if it is present, not invalidated,
    /// and younger than `stale_time`; otherwise run `fetch` and store the
    /// result. A fetch that was superseded by a newer one for the same key
    /// still returns its own value but does not overwrite the cache.
    pub async fn query<T, F, Fut>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        fetch: F,
    ) -> CoreResult<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        if let Some(value) = self.fresh::<T>(key, stale_time) {
            return Ok(value);
        }

        let generation = {
            let mut state = self.state();
            let generation = state.generations.entry(key.clone()).or_insert(0);
            *generation += 1;
            *generation
        };

        let value = fetch().await?;

        let mut state = self.state();
        if state.generations.get(key) == Some(&generation) {
            state.entries.insert(
                key.clone(),
                Entry {
                    value: Arc::new(value.clone()),
                    stored_at: Instant::now(),
                    invalidated: false,
                },
            );
        } else {
            debug!(%key, "discarding superseded fetch result");
        }
        Ok(value)
    }

    fn fresh<T: Clone + Send + Sync + 'static>(
        &self,
        key: &QueryKey,
        stale_time: Duration,
    ) -> Option<T> {
        let state = self.state();
        let entry = state.entries.get(key)?;
        if entry.invalidated || entry.stored_at.elapsed() >= stale_time {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Last-known value for `key`, regardless of staleness.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &QueryKey) -> Option<T> {
        let state = self.state();
        state
            .entries
            .get(key)
            .and_then(|entry| entry.value.downcast_ref::<T>().cloned())
    }

    /// Run a mutation. With an optimistic update, the provisional value is
    /// written first and the prior entry snapshotted as rollback context;
    /// on failure the snapshot is restored. The keys in `invalidates` are
    /// marked stale on settlement, success or failure alike. Unlike
    /// superseded queries, mutations are never discarded mid-flight.
    pub async fn mutate<R, F, Fut>(
        &self,
        optimistic: Option<OptimisticUpdate>,
        invalidates: &[QueryKey],
        run: F,
    ) -> CoreResult<R>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CoreResult<R>>,
    {
        let result = match optimistic {
            Some(update) => {
                let lock = self.mutation_lock(&update.key);
                let _guard = lock.lock().await;

                let snapshot = self.state().entries.get(&update.key).cloned();
                {
                    let mut state = self.state();
                    state.entries.insert(
                        update.key.clone(),
                        Entry {
                            value: update.value,
                            stored_at: Instant::now(),
                            invalidated: false,
                        },
                    );
                }

                let result = run().await;
                if result.is_err() {
                    debug!(key = %update.key, "mutation failed, rolling back optimistic value");
                    let mut state = self.state();
                    match snapshot {
                        Some(entry) => {
                            state.entries.insert(update.key.clone(), entry);
                        }
                        None => {
                            state.entries.remove(&update.key);
                        }
                    }
                }
                result
            }
            None => run().await,
        };

        for key in invalidates {
            self.invalidate(key);
        }
        result
    }

    /// Mark `key` stale; the next `query` re-fetches regardless of its
    /// staleness window.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut state = self.state();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.invalidated = true;
        }
    }

    /// Invalidate every key that starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) {
        let mut state = self.state();
        for (key, entry) in state.entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.invalidated = true;
            }
        }
    }

    fn mutation_lock(&self, key: &QueryKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .mutation_locks
            .lock()
            .expect("mutation lock table poisoned");
        Arc::clone(
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}
