// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable rate-limit counters.
//!
//! Counters survive restarts, so a relaunched relay cannot be used to dodge
//! a window that was already exhausted. Every operation takes `now_ms`
//! explicitly; callers own the clock, which keeps the window math testable.

use rusqlite::{OptionalExtension, params};

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err};
use crate::models::RateLimitRecord;

/// Record one hit against `key`, creating a fresh window of `window_ms` when
/// none is active. Returns the counter state after the hit.
///
/// A row whose window has already ended is deleted first, so an expired
/// counter never bleeds into the next window. The insert-or-update runs as a
/// single statement; concurrent hits on the same key cannot lose increments.
pub async fn increment(
    db: &Database,
    key: &str,
    now_ms: i64,
    window_ms: i64,
) -> Result<RateLimitRecord, ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<RateLimitRecord, rusqlite::Error> {
            conn.execute(
                "DELETE FROM rate_limits WHERE key = ?1 AND expire_at <= ?2",
                params![key, now_ms],
            )?;
            conn.query_row(
                "INSERT INTO rate_limits (key, total_hits, expire_at)
                 VALUES (?1, 1, ?2)
                 ON CONFLICT(key) DO UPDATE SET total_hits = total_hits + 1
                 RETURNING total_hits, expire_at",
                params![key, now_ms + window_ms],
                |row| {
                    Ok(RateLimitRecord {
                        total_hits: row.get(0)?,
                        expire_at: row.get(1)?,
                    })
                },
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Read the counter for `key` if its window is still active.
pub async fn get_active(
    db: &Database,
    key: &str,
    now_ms: i64,
) -> Result<Option<RateLimitRecord>, ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(
            move |conn| -> Result<Option<RateLimitRecord>, rusqlite::Error> {
                conn.query_row(
                    "SELECT total_hits, expire_at FROM rate_limits
                     WHERE key = ?1 AND expire_at > ?2",
                    params![key, now_ms],
                    |row| {
                        Ok(RateLimitRecord {
                            total_hits: row.get(0)?,
                            expire_at: row.get(1)?,
                        })
                    },
                )
                .optional()
            },
        )
        .await
        .map_err(map_tr_err)
}

/// Give back one hit on `key`, flooring at zero.
///
/// Used when a request was admitted but failed before reaching the upstream
/// provider, so the caller is not charged for work that never happened.
pub async fn decrement(db: &Database, key: &str, now_ms: i64) -> Result<(), ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE rate_limits SET total_hits = MAX(total_hits - 1, 0)
                 WHERE key = ?1 AND expire_at > ?2",
                params![key, now_ms],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove the counter for `key` regardless of window state.
pub async fn delete_key(db: &Database, key: &str) -> Result<(), ParleyError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM rate_limits WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Remove every counter. Admin reset.
pub async fn delete_all(db: &Database) -> Result<(), ParleyError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM rate_limits", [])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Drop rows whose window ended at or before `now_ms`. Returns the number of
/// rows swept.
pub async fn sweep_expired(db: &Database, now_ms: i64) -> Result<usize, ParleyError> {
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM rate_limits WHERE expire_at <= ?1", params![now_ms])
        })
        .await
        .map_err(map_tr_err)
}
