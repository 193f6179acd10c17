// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread row operations.

use rusqlite::{OptionalExtension, params};

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err, now_rfc3339};
use crate::models::Thread;

/// Fetch a thread by id.
pub async fn get_thread(db: &Database, id: &str) -> Result<Option<Thread>, ParleyError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Thread>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, user_id, system_prompt, created_at FROM threads WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Thread {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        system_prompt: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a thread by id, creating it for `user_id` if it does not exist.
///
/// Chat requests that carry only a session id land here: the session id
/// becomes the thread id on first use, so the terminal `done` frame can
/// always name a thread.
pub async fn ensure_thread(
    db: &Database,
    id: &str,
    user_id: &str,
) -> Result<Thread, ParleyError> {
    if let Some(existing) = get_thread(db, id).await? {
        return Ok(existing);
    }

    let thread = Thread {
        id: id.to_string(),
        user_id: user_id.to_string(),
        system_prompt: None,
        created_at: now_rfc3339(),
    };
    let row = thread.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO threads (id, user_id, system_prompt, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![row.id, row.user_id, row.system_prompt, row.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

    // Another request may have created it first; read back the winning row.
    Ok(get_thread(db, id).await?.unwrap_or(thread))
}
