// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat orchestrator.
//!
//! One HTTP call is one state-machine run: admission, key resolution,
//! generation, then persistence. Streaming responses forward every adapter
//! delta as an SSE frame the moment it arrives; the terminal frame is
//! always exactly one `done` or `error`. A client disconnect mid-stream
//! drops the upstream generation and persists nothing for that attempt.

use std::convert::Infallible;
use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use futures::stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error};

use parley_core::{
    Attachment, DeltaStream, GenerateRequest, NormalizedMessage, ParleyError, Provider, Role,
    StreamEvent,
};
use parley_storage::models::ChatMessage;
use parley_storage::queries::{messages, threads};
use parley_storage::{Database, now_rfc3339};

use crate::error::{client_text, error_response};
use crate::extract::UserId;
use crate::server::GatewayState;

/// Rate-limit route label for chat turns.
const CHAT_ROUTE: &str = "chat";

/// Request body for POST /v1/chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub provider: String,
    pub model: String,
    #[serde(default = "default_wants_stream")]
    pub wants_stream: bool,
}

fn default_wants_stream() -> bool {
    true
}

/// Response body for non-streaming chat.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub thread_id: String,
}

/// POST /v1/chat — run one chat turn.
pub async fn post_chat(
    State(state): State<GatewayState>,
    UserId(user_id): UserId,
    Json(body): Json<ChatRequest>,
) -> Response {
    // Preconditions, checked before any side effect.
    let has_message = body.message.as_deref().is_some_and(|m| !m.trim().is_empty());
    if !has_message && body.attachments.is_empty() {
        return error_response(&ParleyError::Config(
            "message or attachments required".into(),
        ));
    }
    let Some(thread_id) = body.thread_id.clone().or_else(|| body.session_id.clone()) else {
        return error_response(&ParleyError::Config(
            "threadId or sessionId required".into(),
        ));
    };
    let provider = match Provider::from_str(&body.provider) {
        Ok(p) => p,
        Err(_) => {
            return error_response(&ParleyError::UnsupportedProvider(body.provider.clone()));
        }
    };

    // Admission. A denied request performs no key lookup and no provider call.
    if let Err(e) = state.limiter.admit(&user_id, CHAT_ROUTE).await {
        return error_response(&e);
    }

    // Failures before the first delta refund the consumed slot: the user was
    // charged for a generation that never produced anything. Once a stream is
    // open, errors surface as a terminal frame and the hit stands.
    match run_turn(&state, &user_id, thread_id, provider, body).await {
        Ok(response) => response,
        Err(e) => {
            if let Err(refund_err) = state.limiter.refund(&user_id, CHAT_ROUTE).await {
                error!(error = %refund_err, "rate limit refund failed");
            }
            error_response(&e)
        }
    }
}

/// Key resolution through provider dispatch. An `Err` from here means no
/// response reached the client yet, so the caller refunds the admission hit.
async fn run_turn(
    state: &GatewayState,
    user_id: &str,
    thread_id: String,
    provider: Provider,
    body: ChatRequest,
) -> Result<Response, ParleyError> {
    let api_key = state.keys.resolve_key(user_id, provider).await?;

    let thread = threads::ensure_thread(&state.db, &thread_id, user_id).await?;
    let history = messages::get_messages_for_thread(&state.db, &thread_id, None).await?;

    let user_text = body.message.unwrap_or_default();
    let mut normalized: Vec<NormalizedMessage> = history
        .iter()
        .filter_map(|row| {
            Role::from_str(&row.role)
                .ok()
                .map(|role| NormalizedMessage::text(role, row.content.clone()))
        })
        .collect();
    normalized.push(NormalizedMessage {
        role: Role::User,
        content: user_text.clone(),
        attachments: body.attachments,
    });

    let request = GenerateRequest {
        api_key,
        model: body.model,
        messages: normalized,
    };
    let system_prompt = thread.system_prompt.clone();

    if body.wants_stream {
        let deltas = state
            .router
            .generate_stream(provider, system_prompt.as_deref(), request)
            .await?;
        Ok(stream_response(state.db.clone(), deltas, thread_id, user_text))
    } else {
        let reply = state
            .router
            .generate(provider, system_prompt.as_deref(), request)
            .await?;
        persist_turn(&state.db, &thread_id, &user_text, &reply).await?;
        Ok(Json(ChatResponse { reply, thread_id }).into_response())
    }
}

/// Bridge the adapter's delta stream onto an SSE response.
fn stream_response(
    db: Database,
    deltas: DeltaStream,
    thread_id: String,
    user_text: String,
) -> Response {
    let (tx, rx) = mpsc::channel::<StreamEvent>(32);
    tokio::spawn(pump_deltas(db, deltas, tx, thread_id, user_text));

    let events = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, Infallible>(to_sse_event(&event)), rx))
    });
    Sse::new(events).into_response()
}

fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default().json_data(event).unwrap_or_else(|_| {
        Event::default().data(r#"{"type":"error","error":"Internal server error"}"#)
    })
}

/// Consume the upstream stream, forwarding deltas and finishing with one
/// terminal frame. Dropping of the receiver (client disconnect) stops the
/// upstream pull and skips persistence.
async fn pump_deltas(
    db: Database,
    mut deltas: DeltaStream,
    tx: mpsc::Sender<StreamEvent>,
    thread_id: String,
    user_text: String,
) {
    let mut reply = String::new();
    while let Some(item) = deltas.next().await {
        match item {
            Ok(content) => {
                reply.push_str(&content);
                if tx.send(StreamEvent::Delta { content }).await.is_err() {
                    debug!("client disconnected mid-stream, aborting generation");
                    return;
                }
            }
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error {
                        error: client_text(&e),
                    })
                    .await;
                return;
            }
        }
    }

    // Persisted history is part of the contract: a write failure after a
    // successful generation is reported as a failed turn.
    if let Err(e) = persist_turn(&db, &thread_id, &user_text, &reply).await {
        error!(error = %e, "failed to persist completed turn");
        let _ = tx
            .send(StreamEvent::Error {
                error: client_text(&e),
            })
            .await;
        return;
    }
    let _ = tx.send(StreamEvent::Done { reply, thread_id }).await;
}

/// Write the user message and the full assistant reply as two durable rows.
async fn persist_turn(
    db: &Database,
    thread_id: &str,
    user_text: &str,
    reply: &str,
) -> Result<(), ParleyError> {
    let user_row = ChatMessage {
        id: uuid::Uuid::new_v4().to_string(),
        thread_id: thread_id.to_string(),
        role: Role::User.to_string(),
        content: user_text.to_string(),
        created_at: now_rfc3339(),
    };
    messages::insert_message(db, &user_row).await?;

    let assistant_row = ChatMessage {
        id: uuid::Uuid::new_v4().to_string(),
        thread_id: thread_id.to_string(),
        role: Role::Assistant.to_string(),
        content: reply.to_string(),
        created_at: now_rfc3339(),
    };
    messages::insert_message(db, &assistant_row).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::build_router;
    use crate::testing::{stored_key, test_state};
    use http_body_util::BodyExt;
    use parley_test_utils::mock_provider::MockResponse;
    use tower::ServiceExt;

    fn chat_request(body: serde_json::Value) -> axum::http::Request<axum::body::Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .header("x-parley-user", "u1")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::http::Response<axum::body::Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn sse_payloads(body: &str) -> Vec<serde_json::Value> {
        body.split("\n\n")
            .filter_map(|frame| frame.trim().strip_prefix("data: "))
            .map(|payload| serde_json::from_str(payload).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn streaming_turn_forwards_deltas_then_done_and_persists() {
        let (state, _dir) = test_state(
            vec![MockResponse::Deltas(vec!["Hi".into(), " there".into()])],
            20,
        )
        .await;
        stored_key(&state, "u1", Provider::Openai).await;
        let app = build_router(state.clone());

        let response = app
            .oneshot(chat_request(serde_json::json!({
                "sessionId": "sess-1",
                "message": "hello",
                "provider": "openai",
                "model": "gpt-4o",
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let payloads = sse_payloads(&body_text(response).await);
        assert_eq!(
            payloads[0],
            serde_json::json!({"type": "delta", "content": "Hi"})
        );
        assert_eq!(
            payloads[1],
            serde_json::json!({"type": "delta", "content": " there"})
        );
        assert_eq!(
            payloads[2],
            serde_json::json!({"type": "done", "reply": "Hi there", "threadId": "sess-1"})
        );

        // The completed turn is durable: user message plus full reply.
        let rows = messages::get_messages_for_thread(&state.db, "sess-1", None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, "user");
        assert_eq!(rows[0].content, "hello");
        assert_eq!(rows[1].role, "assistant");
        assert_eq!(rows[1].content, "Hi there");
    }

    #[tokio::test]
    async fn non_streaming_turn_returns_json_reply() {
        let (state, _dir) = test_state(vec![MockResponse::Reply("Hi there".into())], 20).await;
        stored_key(&state, "u1", Provider::Openai).await;
        let app = build_router(state);

        let response = app
            .oneshot(chat_request(serde_json::json!({
                "threadId": "t-9",
                "message": "hello",
                "provider": "openai",
                "model": "gpt-4o",
                "wantsStream": false,
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let parsed: serde_json::Value =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!({"reply": "Hi there", "threadId": "t-9"})
        );
    }

    #[tokio::test]
    async fn missing_key_is_401_and_refunds_the_slot() {
        let (state, _dir) = test_state(vec![MockResponse::Reply("ok".into())], 1).await;
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(chat_request(serde_json::json!({
                "sessionId": "s",
                "message": "hi",
                "provider": "openai",
                "model": "gpt-4o",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("no API key stored"));

        // The failed attempt was refunded; with the key in place the single
        // slot is still available.
        stored_key(&state, "u1", Provider::Openai).await;
        let response = app
            .oneshot(chat_request(serde_json::json!({
                "sessionId": "s",
                "message": "hi",
                "provider": "openai",
                "model": "gpt-4o",
                "wantsStream": false,
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limited_turn_is_429_before_any_lookup() {
        let (state, _dir) = test_state(vec![MockResponse::Reply("ok".into())], 1).await;
        stored_key(&state, "u1", Provider::Openai).await;
        let app = build_router(state);

        let ok = |wants: bool| {
            serde_json::json!({
                "sessionId": "s",
                "message": "hi",
                "provider": "openai",
                "model": "gpt-4o",
                "wantsStream": wants,
            })
        };

        let first = app.clone().oneshot(chat_request(ok(false))).await.unwrap();
        assert_eq!(first.status(), axum::http::StatusCode::OK);

        let second = app.oneshot(chat_request(ok(false))).await.unwrap();
        assert_eq!(second.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);
        assert!(body_text(second).await.contains("rate limit exceeded"));
    }

    #[tokio::test]
    async fn empty_turn_and_missing_thread_are_rejected() {
        let (state, _dir) = test_state(vec![], 20).await;
        let app = build_router(state);

        let no_content = app
            .clone()
            .oneshot(chat_request(serde_json::json!({
                "sessionId": "s",
                "provider": "openai",
                "model": "gpt-4o",
            })))
            .await
            .unwrap();
        assert_eq!(no_content.status(), axum::http::StatusCode::BAD_REQUEST);

        let no_thread = app
            .oneshot(chat_request(serde_json::json!({
                "message": "hi",
                "provider": "openai",
                "model": "gpt-4o",
            })))
            .await
            .unwrap();
        assert_eq!(no_thread.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_provider_is_400() {
        let (state, _dir) = test_state(vec![], 20).await;
        let app = build_router(state);

        let response = app
            .oneshot(chat_request(serde_json::json!({
                "sessionId": "s",
                "message": "hi",
                "provider": "cohere",
                "model": "command-r",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("cohere"));
    }

    #[tokio::test]
    async fn upstream_error_mid_stream_emits_terminal_error_frame() {
        let (state, _dir) = test_state(vec![MockResponse::Error("model overloaded".into())], 20).await;
        stored_key(&state, "u1", Provider::Openai).await;
        let app = build_router(state.clone());

        let response = app
            .oneshot(chat_request(serde_json::json!({
                "sessionId": "s",
                "message": "hi",
                "provider": "openai",
                "model": "gpt-4o",
            })))
            .await
            .unwrap();

        // The mock fails at dispatch, before the SSE upgrade.
        assert_eq!(response.status(), axum::http::StatusCode::BAD_GATEWAY);
        assert!(body_text(response).await.contains("model overloaded"));

        // A failed generation persists nothing.
        let rows = messages::get_messages_for_thread(&state.db, "s", None)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn missing_identity_header_is_401() {
        let (state, _dir) = test_state(vec![], 20).await;
        let app = build_router(state);

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                serde_json::json!({
                    "sessionId": "s",
                    "message": "hi",
                    "provider": "openai",
                    "model": "gpt-4o",
                })
                .to_string(),
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
