// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use parley_core::ParleyError;

/// Handle to the relay's SQLite database.
///
/// Cloning the inner connection is cheap; every clone shares the same
/// background writer thread.
#[derive(Clone, Debug)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, configure PRAGMAs, and run
    /// all pending migrations.
    pub async fn open(path: &str) -> Result<Self, ParleyError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| ParleyError::Storage {
                source: Box::new(e),
            })?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        // Migration failures are not rusqlite errors; carry them out of the
        // closure as a value and unwrap both layers.
        conn.call(|conn| -> Result<Result<(), ParleyError>, rusqlite::Error> {
            Ok(crate::migrations::run_migrations(conn))
        })
        .await
        .map_err(map_tr_err)??;

        tracing::debug!(path = %path, "database opened");
        Ok(Self { conn })
    }

    /// Returns the shared connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the database, flushing the WAL.
    pub async fn close(self) -> Result<(), ParleyError> {
        self.conn
            .close()
            .await
            .map_err(|e| ParleyError::Storage {
                source: Box::new(e),
            })
    }
}

/// Convert tokio-rusqlite errors to ParleyError::Storage.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ParleyError {
    ParleyError::Storage {
        source: Box::new(e),
    }
}

/// Current timestamp in the RFC 3339 format used for row ordering.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
