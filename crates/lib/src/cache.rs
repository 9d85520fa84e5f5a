//! # Result and Assistant Caches
//!
//! Two caches back the orchestration layer:
//!
//! - [`ResultCache`] maps `(function, arguments)` to a previously computed result.
//!   Each entry carries the [`CachePolicy`] it was stored with.
//! - [`AssistantSlot`] holds the single assistant instance and rebuilds it once its
//!   time-to-live has elapsed. Construction happens under a lock, so every caller
//!   within one window observes the same instance.
//!
//! Time is measured with `tokio::time::Instant` so expiry can be driven by a
//! paused clock in tests.

use crate::{assistant::SqlAssistant, errors::ChatError};
use serde::Serialize;
use std::{any::Any, collections::HashMap, future::Future, sync::Arc, time::Duration};
use tokio::{
    sync::{Mutex, RwLock},
    time::Instant,
};
use tracing::{debug, info};

/// Identifies one cached call: the function and its canonical JSON arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub function: &'static str,
    pub args: String,
}

impl CacheKey {
    pub fn new<A: Serialize + ?Sized>(function: &'static str, args: &A) -> Result<Self, ChatError> {
        Ok(Self {
            function,
            args: serde_json::to_string(args)?,
        })
    }
}

/// How long an entry stays valid. `ttl: None` keeps it until invalidated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Option<Duration>,
}

impl CachePolicy {
    pub const fn forever() -> Self {
        Self { ttl: None }
    }

    pub const fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }

    fn is_expired(&self, stored_at: Instant) -> bool {
        self.ttl.is_some_and(|ttl| stored_at.elapsed() >= ttl)
    }
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
    policy: CachePolicy,
}

/// A type-erased, argument-keyed result cache.
#[derive(Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `key` if present, unexpired and of type `T`.
    /// An expired entry is removed.
    pub async fn get<T>(&self, key: &CacheKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        {
            let entries = self.entries.read().await;
            let entry = entries.get(key)?;
            if !entry.policy.is_expired(entry.stored_at) {
                return entry.value.downcast_ref::<T>().cloned();
            }
        }
        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.policy.is_expired(entry.stored_at))
        {
            entries.remove(key);
            debug!(function = key.function, "Dropped expired cache entry.");
        }
        None
    }

    pub async fn insert<T>(&self, key: CacheKey, value: T, policy: CachePolicy)
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| !entry.policy.is_expired(entry.stored_at));
        entries.insert(
            key,
            CacheEntry {
                value: Arc::new(value),
                stored_at: Instant::now(),
                policy,
            },
        );
    }

    /// Returns the cached value or computes, stores and returns a fresh one.
    ///
    /// Errors are returned to the caller and nothing is stored for them.
    pub async fn get_or_try_insert_with<T, F, Fut>(
        &self,
        key: CacheKey,
        policy: CachePolicy,
        compute: F,
    ) -> Result<T, ChatError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ChatError>>,
    {
        if let Some(value) = self.get::<T>(&key).await {
            debug!(function = key.function, "Cache hit.");
            return Ok(value);
        }
        debug!(function = key.function, "Cache miss.");
        let value = compute().await?;
        self.insert(key, value.clone(), policy).await;
        Ok(value)
    }

    /// Drops every entry stored for `function`, returning how many were removed.
    pub async fn invalidate(&self, function: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|key, _| key.function != function);
        before - entries.len()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of stored entries. Expired entries count until the next read of
    /// their key or the next insert.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Holds the current assistant and the instant it was built.
pub struct AssistantSlot {
    ttl: Duration,
    current: Mutex<Option<(Arc<SqlAssistant>, Instant)>>,
}

impl AssistantSlot {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            current: Mutex::new(None),
        }
    }

    /// Returns the live assistant, building a new one if none exists or it expired.
    pub async fn get_or_try_init<F, Fut>(&self, build: F) -> Result<Arc<SqlAssistant>, ChatError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SqlAssistant, ChatError>>,
    {
        let mut current = self.current.lock().await;
        if let Some((assistant, built_at)) = current.as_ref() {
            if built_at.elapsed() < self.ttl {
                return Ok(assistant.clone());
            }
            info!("Assistant expired after {:?}, rebuilding.", self.ttl);
        }

        let assistant = Arc::new(build().await?);
        *current = Some((assistant.clone(), Instant::now()));
        Ok(assistant)
    }

    /// Forgets the current assistant so the next call rebuilds it.
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}
