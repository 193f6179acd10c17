// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rate-limit store: admission checks, refunds, resets, and the
//! background sweep of expired windows.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use parley_core::ParleyError;
use parley_storage::Database;
use parley_storage::queries::rate_limits;

/// Counter state after an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub total_hits: u32,
    /// Unix milliseconds at which the current window ends.
    pub reset_at_ms: i64,
}

/// Fixed-window rate limiter keyed by `(identity, route)`.
#[derive(Clone)]
pub struct RateLimitStore {
    db: Database,
    window_ms: i64,
    max_hits: u32,
}

impl RateLimitStore {
    pub fn new(db: Database, window: Duration, max_hits: u32) -> Self {
        Self {
            db,
            window_ms: window.as_millis() as i64,
            max_hits,
        }
    }

    /// Record a hit and admit or deny the request.
    ///
    /// The hit is counted before the limit comparison, so a denied request
    /// still consumed one slot; callers that want to forgive a failed
    /// admitted request use [`refund`](Self::refund).
    pub async fn admit(&self, identity: &str, route: &str) -> Result<Hit, ParleyError> {
        self.admit_at(identity, route, now_ms()).await
    }

    async fn admit_at(&self, identity: &str, route: &str, now_ms: i64) -> Result<Hit, ParleyError> {
        let key = counter_key(identity, route);
        let record = rate_limits::increment(&self.db, &key, now_ms, self.window_ms).await?;
        let hit = Hit {
            total_hits: record.total_hits,
            reset_at_ms: record.expire_at,
        };

        if hit.total_hits > self.max_hits {
            let retry_after_ms = (hit.reset_at_ms - now_ms).max(0) as u64;
            warn!(identity = %identity, route = %route, hits = hit.total_hits, "rate limit exceeded");
            return Err(ParleyError::AdmissionDenied { retry_after_ms });
        }
        trace!(identity = %identity, route = %route, hits = hit.total_hits, "request admitted");
        Ok(hit)
    }

    /// Read the current counter without recording a hit. `None` when no
    /// window is active.
    pub async fn get(&self, identity: &str, route: &str) -> Result<Option<Hit>, ParleyError> {
        self.get_at(identity, route, now_ms()).await
    }

    async fn get_at(
        &self,
        identity: &str,
        route: &str,
        now_ms: i64,
    ) -> Result<Option<Hit>, ParleyError> {
        let record =
            rate_limits::get_active(&self.db, &counter_key(identity, route), now_ms).await?;
        Ok(record.map(|r| Hit {
            total_hits: r.total_hits,
            reset_at_ms: r.expire_at,
        }))
    }

    /// Give back one hit, for admitted requests that failed before reaching
    /// the upstream provider.
    pub async fn refund(&self, identity: &str, route: &str) -> Result<(), ParleyError> {
        self.refund_at(identity, route, now_ms()).await
    }

    async fn refund_at(&self, identity: &str, route: &str, now_ms: i64) -> Result<(), ParleyError> {
        rate_limits::decrement(&self.db, &counter_key(identity, route), now_ms).await
    }

    /// Clear the counter for one `(identity, route)` pair.
    pub async fn reset_key(&self, identity: &str, route: &str) -> Result<(), ParleyError> {
        rate_limits::delete_key(&self.db, &counter_key(identity, route)).await
    }

    /// Clear every counter.
    pub async fn reset_all(&self) -> Result<(), ParleyError> {
        rate_limits::delete_all(&self.db).await
    }

    /// Spawn the periodic sweep of expired windows. Stops when `token` is
    /// cancelled.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration, token: CancellationToken) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("rate limit sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        match rate_limits::sweep_expired(&store.db, now_ms()).await {
                            Ok(swept) if swept > 0 => {
                                trace!(swept, "swept expired rate limit windows");
                            }
                            Ok(_) => {}
                            Err(e) => warn!(error = %e, "rate limit sweep failed"),
                        }
                    }
                }
            }
        });
    }
}

fn counter_key(identity: &str, route: &str) -> String {
    format!("{identity}:{route}")
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
