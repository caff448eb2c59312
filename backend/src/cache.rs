//! In-memory result cache in front of the ERP
//!
//! Entries carry an expiry fixed at write time and are dropped lazily on read; a
//! periodic sweep bounds memory. There is no invalidation from the ERP side, so a
//! result can be up to one TTL stale. Concurrent misses on the same key may each
//! hit the ERP; the last write wins.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;

use crate::config::CacheConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
    pub max_entries: usize,
}

impl From<&CacheConfig> for CacheSettings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            ttl: config.ttl(),
            max_entries: config.max_entries,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings::from(&CacheConfig::default())
    }
}

/// Cache statistics for operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub count: usize,
    pub enabled: bool,
}

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Shared, cloneable handle; clones see the same entries
#[derive(Clone)]
pub struct ResultCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    settings: CacheSettings,
}

impl ResultCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            settings,
        }
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(CacheSettings {
            enabled: false,
            ..CacheSettings::default()
        })
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Cached value for `key`, or `None` on miss, expiry or type mismatch
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        if !self.settings.enabled {
            return None;
        }
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        if entry.is_expired(now) {
            drop(entry);
            self.entries.remove_if(key, |_, e| e.is_expired(now));
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// Store `value` with the configured TTL
    pub fn set<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        if !self.settings.enabled || self.settings.max_entries == 0 {
            return;
        }
        let key = key.into();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.settings.max_entries {
            self.make_room();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value: Arc::new(value),
                expires_at: Instant::now() + self.settings.ttl,
            },
        );
    }

    /// Drop every entry; returns how many were removed
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        tracing::info!(entries = count, "result cache cleared");
        count
    }

    /// Drop expired entries; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            count: self.entries.len(),
            enabled: self.settings.enabled,
        }
    }

    fn make_room(&self) {
        if self.purge_expired() > 0 && self.entries.len() < self.settings.max_entries {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().expires_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CacheSettings::default())
    }
}

/// Cache key for a query intent: the operation name plus the `Debug` rendering of
/// every parameter that affects the result. Strings are quoted and escaped, so
/// distinct parameter tuples never collide.
pub fn cache_key(operation: &str, params: &impl Debug) -> String {
    format!("{}:{:?}", operation, params)
}
