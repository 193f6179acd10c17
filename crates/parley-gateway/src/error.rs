// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping from [`ParleyError`] to HTTP responses.
//!
//! The JSON envelope is always `{"error": "<text>"}`. Internal failure
//! detail (storage errors, panic-adjacent states) is logged, never sent.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use parley_core::ParleyError;
use parley_providers::error::GENERIC_ERROR;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// HTTP status for each error kind.
pub fn status_for(err: &ParleyError) -> StatusCode {
    match err {
        ParleyError::AdmissionDenied { .. } => StatusCode::TOO_MANY_REQUESTS,
        ParleyError::Credential(_) => StatusCode::UNAUTHORIZED,
        ParleyError::UnsupportedProvider(_) | ParleyError::Config(_) => StatusCode::BAD_REQUEST,
        ParleyError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        ParleyError::Storage { .. } | ParleyError::Internal(_) | ParleyError::Canceled => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// User-facing text for an error. Upstream messages were already flattened
/// by the provider-error resolver; storage and internal errors collapse to
/// the generic text.
pub fn client_text(err: &ParleyError) -> String {
    match err {
        ParleyError::AdmissionDenied { .. }
        | ParleyError::Credential(_)
        | ParleyError::UnsupportedProvider(_)
        | ParleyError::Config(_) => err.to_string(),
        ParleyError::Upstream { message, .. } => message.clone(),
        ParleyError::Storage { .. } | ParleyError::Internal(_) | ParleyError::Canceled => {
            GENERIC_ERROR.to_string()
        }
    }
}

/// Build the full error response, logging internals when they are hidden.
pub fn error_response(err: &ParleyError) -> Response {
    let status = status_for(err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "request failed");
    }
    (
        status,
        Json(ErrorBody {
            error: client_text(err),
        }),
    )
        .into_response()
}
