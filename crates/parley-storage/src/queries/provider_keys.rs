// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encrypted provider key rows. Ciphertext in, ciphertext out; nothing in
//! this module can read a key.

use rusqlite::{OptionalExtension, params};

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err, now_rfc3339};
use crate::models::ProviderKeyRecord;

/// Insert or replace the key ciphertext for `(user_id, provider)`.
pub async fn upsert_key(
    db: &Database,
    user_id: &str,
    provider: &str,
    ciphertext: &str,
) -> Result<(), ParleyError> {
    let user_id = user_id.to_string();
    let provider = provider.to_string();
    let ciphertext = ciphertext.to_string();
    let updated_at = now_rfc3339();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO provider_keys (user_id, provider, ciphertext, updated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id, provider)
                 DO UPDATE SET ciphertext = excluded.ciphertext,
                               updated_at = excluded.updated_at",
                params![user_id, provider, ciphertext, updated_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the key row for `(user_id, provider)`.
pub async fn get_key(
    db: &Database,
    user_id: &str,
    provider: &str,
) -> Result<Option<ProviderKeyRecord>, ParleyError> {
    let user_id = user_id.to_string();
    let provider = provider.to_string();
    db.connection()
        .call(
            move |conn| -> Result<Option<ProviderKeyRecord>, rusqlite::Error> {
                conn.query_row(
                    "SELECT user_id, provider, ciphertext, updated_at
                     FROM provider_keys WHERE user_id = ?1 AND provider = ?2",
                    params![user_id, provider],
                    |row| {
                        Ok(ProviderKeyRecord {
                            user_id: row.get(0)?,
                            provider: row.get(1)?,
                            ciphertext: row.get(2)?,
                            updated_at: row.get(3)?,
                        })
                    },
                )
                .optional()
            },
        )
        .await
        .map_err(map_tr_err)
}

/// Delete the key for `(user_id, provider)`. Returns true when a row was
/// actually removed.
pub async fn delete_key(
    db: &Database,
    user_id: &str,
    provider: &str,
) -> Result<bool, ParleyError> {
    let user_id = user_id.to_string();
    let provider = provider.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM provider_keys WHERE user_id = ?1 AND provider = ?2",
                params![user_id, provider],
            )
        })
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}

/// List the provider names that have a stored key for `user_id`.
///
/// Only names, never ciphertext; this backs the key listing endpoint.
pub async fn list_key_providers(db: &Database, user_id: &str) -> Result<Vec<String>, ParleyError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT provider FROM provider_keys WHERE user_id = ?1 ORDER BY provider",
            )?;
            let rows = stmt.query_map(params![user_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
