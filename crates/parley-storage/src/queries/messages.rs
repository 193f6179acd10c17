// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat message row operations.

use rusqlite::params;

use parley_core::ParleyError;

use crate::database::{Database, map_tr_err};
use crate::models::ChatMessage;

/// Insert a new message.
pub async fn insert_message(db: &Database, msg: &ChatMessage) -> Result<(), ParleyError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO messages (id, thread_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![msg.id, msg.thread_id, msg.role, msg.content, msg.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get messages for a thread in chronological order.
pub async fn get_messages_for_thread(
    db: &Database,
    thread_id: &str,
    limit: Option<i64>,
) -> Result<Vec<ChatMessage>, ParleyError> {
    let thread_id = thread_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ChatMessage>, rusqlite::Error> {
            let sql = match limit {
                Some(_) => {
                    "SELECT id, thread_id, role, content, created_at
                     FROM messages WHERE thread_id = ?1
                     ORDER BY created_at ASC LIMIT ?2"
                }
                None => {
                    "SELECT id, thread_id, role, content, created_at
                     FROM messages WHERE thread_id = ?1
                     ORDER BY created_at ASC"
                }
            };
            let mut stmt = conn.prepare(sql)?;
            let map_row = |row: &rusqlite::Row<'_>| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    thread_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            };
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    let rows = stmt.query_map(params![thread_id, lim], map_row)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let rows = stmt.query_map(params![thread_id], map_row)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
