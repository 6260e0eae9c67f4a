use crate::cache::{CacheKey, Clock};
use crate::models::CrawlResult;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// A cached crawl result and its expiry
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: CrawlResult,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// An entry is valid strictly before its expiry instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// A cache hit handed back to the caller
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub result: CrawlResult,
    pub expires_at: DateTime<Utc>,
}

/// In-process TTL cache of crawl results
///
/// Entries are exclusively owned by the store: callers receive clones and
/// never mutate stored payloads. Nothing survives a restart; a cold store
/// behaves like a miss.
pub struct CacheStore {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
    max_entries: usize,
}

impl CacheStore {
    /// Creates a store bounded to `max_entries` results (at least one)
    pub fn new(clock: Arc<dyn Clock>, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            max_entries: max_entries.max(1),
        }
    }

    /// Looks up a key, evicting the entry if it has expired
    ///
    /// The check and the eviction happen under one lock, so an expired entry
    /// is never returned.
    pub fn get(&self, key: &CacheKey) -> Result<Option<CacheHit>, CacheError> {
        let now = self.clock.now();
        let mut entries = self.lock()?;

        match entries.get(key) {
            Some(entry) if entry.is_valid_at(now) => Ok(Some(CacheHit {
                result: entry.payload.clone(),
                expires_at: entry.expires_at,
            })),
            Some(_) => {
                entries.remove(key);
                tracing::trace!("Evicted expired cache entry {}", key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Stores a result under `key` for `ttl`, replacing any previous entry
    ///
    /// When the store is full, expired entries are dropped first and then
    /// the entry closest to expiry is evicted.
    ///
    /// # Returns
    ///
    /// The expiry instant of the new entry
    pub fn put(
        &self,
        key: CacheKey,
        result: CrawlResult,
        ttl: Duration,
    ) -> Result<DateTime<Utc>, CacheError> {
        let now = self.clock.now();
        let expires_at = now + ttl;
        let mut entries = self.lock()?;

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.is_valid_at(now));

            if entries.len() >= self.max_entries {
                let soonest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(k, _)| k.clone());
                if let Some(victim) = soonest {
                    entries.remove(&victim);
                    tracing::debug!("Cache full, evicted {}", victim);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                payload: result,
                expires_at,
            },
        );

        Ok(expires_at)
    }

    /// Removes every entry
    ///
    /// # Returns
    ///
    /// The number of entries removed
    pub fn clear_all(&self) -> Result<usize, CacheError> {
        let mut entries = self.lock()?;
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    /// Removes every entry whose expiry has passed
    ///
    /// # Returns
    ///
    /// The number of entries removed
    pub fn clear_expired(&self) -> Result<usize, CacheError> {
        let now = self.clock.now();
        let mut entries = self.lock()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid_at(now));
        Ok(before - entries.len())
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<CacheKey, CacheEntry>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::LockPoisoned)
    }
}
