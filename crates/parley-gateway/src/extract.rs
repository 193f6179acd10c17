// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity extraction.
//!
//! Authentication lives in front of the relay; by the time a request lands
//! here it carries an already-resolved user id in the `x-parley-user`
//! header. A missing or empty header is rejected, not defaulted.

use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;

use crate::error::ErrorBody;

pub const USER_HEADER: &str = "x-parley-user";

/// The authenticated user id for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorBody>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorBody {
                        error: format!("missing {USER_HEADER} header"),
                    }),
                )
            })
    }
}
