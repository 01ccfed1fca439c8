//! Bounded TTL cache for analysis results.
//!
//! Expiry is checked lazily on read; there is no background sweeper. When the
//! store is full, `put` evicts the entry whose expiry is soonest. Under a
//! uniform TTL that is the oldest insertion, but the comparison is on expiry so
//! the policy stays the same if entries ever carry different TTLs.

use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::debug;

use crate::types::{AnalysisMethod, AnalysisResult, CacheStats};

pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Longer TTLs are clamped so `now + ttl` cannot overflow `Instant`.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Trim and collapse whitespace runs so cosmetic spacing maps to one key.
pub fn normalize_content(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache key for `content` analysed under `method`.
///
/// Keys are method-scoped: the same text under two methods never collides.
pub fn cache_key(content: &str, method: AnalysisMethod) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_content(content).as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}:{}", method.as_str(), hex)
}

#[derive(Debug, Clone)]
struct CachedEntry {
    result: AnalysisResult,
    expiry: Instant,
}

impl CachedEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expiry
    }
}

#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<String, CachedEntry>,
    max_entries: usize,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
            ttl: ttl.min(MAX_TTL),
        }
    }

    /// Returns the cached result, dropping it first if it has expired.
    pub fn get(&mut self, key: &str) -> Option<AnalysisResult> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                debug!(key, "cache entry expired");
                self.entries.remove(key);
                None
            }
            Some(entry) => Some(entry.result.clone()),
            None => None,
        }
    }

    pub fn put(&mut self, key: String, result: AnalysisResult) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_soonest_expiry();
        }
        let expiry = Instant::now() + self.ttl;
        self.entries.insert(key, CachedEntry { result, expiry });
    }

    fn evict_soonest_expiry(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.expiry)
            .map(|(key, _)| key.clone());
        if let Some(key) = victim {
            debug!(key = %key, "evicting cache entry at capacity");
            self.entries.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let expired = self
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .count();
        CacheStats {
            total_entries: self.entries.len(),
            valid_entries: self.entries.len() - expired,
            expired_entries: expired,
            max_size: self.max_entries,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }
}
