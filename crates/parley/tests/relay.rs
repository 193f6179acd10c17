// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end relay tests: a live gateway over a temp database, with
//! wiremock standing in for the upstream vendor APIs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parley_config::ProvidersConfig;
use parley_gateway::{GatewayState, build_router};
use parley_keys::{KeyCache, KeyService};
use parley_limiter::RateLimitStore;
use parley_providers::ProviderRouter;
use parley_storage::Database;
use parley_vault::KeyVault;

struct Relay {
    addr: SocketAddr,
    _dir: tempfile::TempDir,
}

impl Relay {
    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Boot a relay whose openai adapter points at `upstream`.
async fn start_relay(upstream: &MockServer, max_hits: u32) -> Relay {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("relay.db");
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

    let vault = Arc::new(KeyVault::new(&SecretString::from("e2e secret")).unwrap());
    let cache = Arc::new(KeyCache::new(Duration::from_secs(300)));
    let keys = KeyService::new(db.clone(), vault, cache);
    let limiter = Arc::new(RateLimitStore::new(
        db.clone(),
        Duration::from_secs(60),
        max_hits,
    ));
    let providers = ProvidersConfig {
        openai_base_url: Some(upstream.uri()),
        ..ProvidersConfig::default()
    };
    let router = Arc::new(ProviderRouter::from_config(&providers).unwrap());

    let state = GatewayState {
        db,
        keys,
        limiter,
        router,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    Relay { addr, _dir: dir }
}

async fn put_key(client: &reqwest::Client, relay: &Relay, user: &str) {
    let response = client
        .put(relay.url("/v1/keys"))
        .header("x-parley-user", user)
        .json(&serde_json::json!({"provider": "openai", "apiKey": "sk-e2e"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

fn sse_payloads(body: &str) -> Vec<serde_json::Value> {
    body.split("\n\n")
        .filter_map(|frame| frame.trim().strip_prefix("data: "))
        .map(|payload| serde_json::from_str(payload).unwrap())
        .collect()
}

#[tokio::test]
async fn full_streamed_turn_through_the_relay() {
    let upstream = MockServer::start().await;
    let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
               data: {\"choices\":[{\"delta\":{\"content\":\" there\"}}]}\n\n\
               data: [DONE]\n\n";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-e2e"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, 20).await;
    let client = reqwest::Client::new();
    put_key(&client, &relay, "alice").await;

    let response = client
        .post(relay.url("/v1/chat"))
        .header("x-parley-user", "alice")
        .json(&serde_json::json!({
            "sessionId": "sess-e2e",
            "message": "hello",
            "provider": "openai",
            "model": "gpt-4o",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    let payloads = sse_payloads(&body);
    assert_eq!(
        payloads,
        vec![
            serde_json::json!({"type": "delta", "content": "Hi"}),
            serde_json::json!({"type": "delta", "content": " there"}),
            serde_json::json!({"type": "done", "reply": "Hi there", "threadId": "sess-e2e"}),
        ]
    );
}

#[tokio::test]
async fn missing_key_never_reaches_upstream() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, 20).await;
    let client = reqwest::Client::new();

    let response = client
        .post(relay.url("/v1/chat"))
        .header("x-parley-user", "bob")
        .json(&serde_json::json!({
            "sessionId": "s",
            "message": "hello",
            "provider": "openai",
            "model": "gpt-4o",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await.unwrap();
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("no API key stored")
    );
}

#[tokio::test]
async fn second_turn_carries_history_to_the_provider() {
    let upstream = MockServer::start().await;
    // Non-streaming responses for two sequential turns. Partial-json array
    // matching is index-wise inclusion, so the one-message matcher would also
    // match the second turn's body; the three-message mock goes first to take
    // dispatch priority.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(wiremock::matchers::body_partial_json(serde_json::json!({
            "messages": [
                {"role": "user", "content": "first"},
                {"role": "assistant", "content": "reply one"},
                {"role": "user", "content": "second"},
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "reply two"}}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(wiremock::matchers::body_partial_json(serde_json::json!({
            "messages": [{"role": "user", "content": "first"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "reply one"}}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let relay = start_relay(&upstream, 20).await;
    let client = reqwest::Client::new();
    put_key(&client, &relay, "carol").await;

    let turn = |message: &str| {
        serde_json::json!({
            "threadId": "t-hist",
            "message": message,
            "provider": "openai",
            "model": "gpt-4o",
            "wantsStream": false,
        })
    };

    let first: serde_json::Value = client
        .post(relay.url("/v1/chat"))
        .header("x-parley-user", "carol")
        .json(&turn("first"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["reply"], "reply one");

    let second: serde_json::Value = client
        .post(relay.url("/v1/chat"))
        .header("x-parley-user", "carol")
        .json(&turn("second"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["reply"], "reply two");
    assert_eq!(second["threadId"], "t-hist");
}

#[tokio::test]
async fn rate_limit_survives_across_relay_restarts() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .mount(&upstream)
        .await;

    // Shared database across two relay instances.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("restart.db");

    let boot = |db: Database| {
        let vault = Arc::new(KeyVault::new(&SecretString::from("e2e secret")).unwrap());
        let cache = Arc::new(KeyCache::new(Duration::from_secs(300)));
        let keys = KeyService::new(db.clone(), vault, cache);
        let limiter = Arc::new(RateLimitStore::new(db.clone(), Duration::from_secs(60), 1));
        let providers = ProvidersConfig {
            openai_base_url: Some(upstream.uri()),
            ..ProvidersConfig::default()
        };
        let router = Arc::new(ProviderRouter::from_config(&providers).unwrap());
        GatewayState {
            db,
            keys,
            limiter,
            router,
        }
    };

    let client = reqwest::Client::new();
    let turn = serde_json::json!({
        "sessionId": "s",
        "message": "hi",
        "provider": "openai",
        "model": "gpt-4o",
        "wantsStream": false,
    });

    // First process: store a key, spend the single slot.
    let addr1 = {
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = boot(db);
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        addr
    };
    let put = client
        .put(format!("http://{addr1}/v1/keys"))
        .header("x-parley-user", "dave")
        .json(&serde_json::json!({"provider": "openai", "apiKey": "sk-e2e"}))
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 204);
    let first = client
        .post(format!("http://{addr1}/v1/chat"))
        .header("x-parley-user", "dave")
        .json(&turn)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);

    // Second process over the same database: the window is still exhausted.
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr2 = listener.local_addr().unwrap();
    let state = boot(db);
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    let second = client
        .post(format!("http://{addr2}/v1/chat"))
        .header("x-parley-user", "dave")
        .json(&turn)
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 429);
}
