// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key management endpoints.
//!
//! Key material flows one way: in. Listing returns provider names only, and
//! nothing here ever echoes a stored key back.

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use parley_core::{ParleyError, Provider};

use crate::error::error_response;
use crate::extract::UserId;
use crate::server::GatewayState;

/// Request body for PUT /v1/keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutKeyRequest {
    pub provider: String,
    pub api_key: String,
}

/// Response body for GET /v1/keys.
#[derive(Debug, Serialize)]
pub struct ListKeysResponse {
    pub providers: Vec<String>,
}

fn parse_provider(name: &str) -> Result<Provider, ParleyError> {
    Provider::from_str(name).map_err(|_| ParleyError::UnsupportedProvider(name.to_string()))
}

/// PUT /v1/keys — store or rotate a provider key.
pub async fn put_key(
    State(state): State<GatewayState>,
    UserId(user_id): UserId,
    Json(body): Json<PutKeyRequest>,
) -> Response {
    let provider = match parse_provider(&body.provider) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    if body.api_key.trim().is_empty() {
        return error_response(&ParleyError::Credential("API key must not be empty".into()));
    }

    match state
        .keys
        .store_key(&user_id, provider, SecretString::from(body.api_key))
        .await
    {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /v1/keys/{provider} — revoke a provider key.
pub async fn delete_key(
    State(state): State<GatewayState>,
    UserId(user_id): UserId,
    Path(provider): Path<String>,
) -> Response {
    let provider = match parse_provider(&provider) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };

    match state.keys.delete_key(&user_id, provider).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /v1/keys — provider names with a stored key.
pub async fn list_keys(State(state): State<GatewayState>, UserId(user_id): UserId) -> Response {
    match state.keys.list_providers(&user_id).await {
        Ok(providers) => Json(ListKeysResponse { providers }).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::testing::test_state;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn request(
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> axum::http::Request<axum::body::Body> {
        let mut builder = axum::http::Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header("x-parley-user", user);
        }
        let body = body
            .map(|b| axum::body::Body::from(b.to_string()))
            .unwrap_or_else(axum::body::Body::empty);
        builder.body(body).unwrap()
    }

    async fn body_json(response: axum::http::Response<axum::body::Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn put_list_delete_lifecycle() {
        let (state, _dir) = test_state(vec![], 20).await;
        let app = build_router(state);

        let put = |provider: &str| {
            request(
                "PUT",
                "/v1/keys",
                Some("u1"),
                Some(serde_json::json!({"provider": provider, "apiKey": "sk-live"})),
            )
        };
        assert_eq!(
            app.clone().oneshot(put("openai")).await.unwrap().status(),
            axum::http::StatusCode::NO_CONTENT
        );
        assert_eq!(
            app.clone().oneshot(put("claude")).await.unwrap().status(),
            axum::http::StatusCode::NO_CONTENT
        );

        let listed = app
            .clone()
            .oneshot(request("GET", "/v1/keys", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(
            body_json(listed).await,
            serde_json::json!({"providers": ["claude", "openai"]})
        );

        assert_eq!(
            app.clone()
                .oneshot(request("DELETE", "/v1/keys/claude", Some("u1"), None))
                .await
                .unwrap()
                .status(),
            axum::http::StatusCode::NO_CONTENT
        );
        // Second delete finds nothing.
        assert_eq!(
            app.clone()
                .oneshot(request("DELETE", "/v1/keys/claude", Some("u1"), None))
                .await
                .unwrap()
                .status(),
            axum::http::StatusCode::NOT_FOUND
        );

        let listed = app
            .oneshot(request("GET", "/v1/keys", Some("u1"), None))
            .await
            .unwrap();
        assert_eq!(
            body_json(listed).await,
            serde_json::json!({"providers": ["openai"]})
        );
    }

    #[tokio::test]
    async fn listing_never_exposes_key_material() {
        let (state, _dir) = test_state(vec![], 20).await;
        let app = build_router(state);

        app.clone()
            .oneshot(request(
                "PUT",
                "/v1/keys",
                Some("u1"),
                Some(serde_json::json!({"provider": "openai", "apiKey": "sk-super-secret"})),
            ))
            .await
            .unwrap();

        let listed = app
            .oneshot(request("GET", "/v1/keys", Some("u1"), None))
            .await
            .unwrap();
        let bytes = listed.into_body().collect().await.unwrap().to_bytes();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("sk-super-secret"));
    }

    #[tokio::test]
    async fn unknown_provider_and_empty_key_are_rejected() {
        let (state, _dir) = test_state(vec![], 20).await;
        let app = build_router(state);

        let bad_provider = app
            .clone()
            .oneshot(request(
                "PUT",
                "/v1/keys",
                Some("u1"),
                Some(serde_json::json!({"provider": "cohere", "apiKey": "sk"})),
            ))
            .await
            .unwrap();
        assert_eq!(bad_provider.status(), axum::http::StatusCode::BAD_REQUEST);

        let empty_key = app
            .oneshot(request(
                "PUT",
                "/v1/keys",
                Some("u1"),
                Some(serde_json::json!({"provider": "openai", "apiKey": "  "})),
            ))
            .await
            .unwrap();
        assert_eq!(empty_key.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn requests_without_identity_are_rejected() {
        let (state, _dir) = test_state(vec![], 20).await;
        let app = build_router(state);

        let response = app
            .oneshot(request("GET", "/v1/keys", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
