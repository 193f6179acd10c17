// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory TTL cache of decrypted provider keys.
//!
//! Entries expire lazily: `get` treats an expired entry as absent but leaves
//! the row in place; the periodic sweep removes expired rows to bound memory.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use parley_core::Provider;

struct CacheEntry {
    key: SecretString,
    expires_at: Instant,
}

/// Process-local cache keyed by `(user_id, provider)`.
pub struct KeyCache {
    entries: DashMap<(String, Provider), CacheEntry>,
    ttl: Duration,
}

impl KeyCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Look up a cached key. Expired entries read as misses but are not
    /// removed here; the sweep owns removal.
    pub fn get(&self, user_id: &str, provider: Provider) -> Option<SecretString> {
        let entry = self.entries.get(&(user_id.to_string(), provider))?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.key.clone())
    }

    /// Cache a decrypted key for the configured TTL.
    pub fn set(&self, user_id: &str, provider: Provider, key: SecretString) {
        self.entries.insert(
            (user_id.to_string(), provider),
            CacheEntry {
                key,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Drop cached keys for a user. With a provider, only that pair; without,
    /// every provider for that user. Other users' entries are untouched.
    pub fn invalidate(&self, user_id: &str, provider: Option<Provider>) {
        match provider {
            Some(provider) => {
                self.entries.remove(&(user_id.to_string(), provider));
            }
            None => {
                self.entries.retain(|(uid, _), _| uid != user_id);
            }
        }
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Spawn the background sweep loop. Stops when `token` is cancelled.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration, token: CancellationToken) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("key cache sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            trace!(removed, "swept expired key cache entries");
                        }
                    }
                }
            }
        });
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}
