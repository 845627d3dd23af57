// SPDX-FileCopyrightText: 2026 Waypoint Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the chat relay pipeline.
//!
//! Most tests drive a `RelayHarness` (recording store plus scripted agent).
//! The last group runs the real gateway router and agent client against a
//! mock agent server.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use serial_test::serial;
use tower::ServiceExt;
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use waypoint_agent::RemoteAgentClient;
use waypoint_core::{ConversationKey, RealtimeStore, Sender};
use waypoint_gateway::{AuthConfig, GatewayState, HealthState, build_router};
use waypoint_relay::{ChatRelay, DelegationStatus, DelegationTracker, error_reply_text};
use waypoint_store::{ItineraryStateStore, MemoryStore, MessageStore};
use waypoint_test_utils::{
    RecordingStore, RelayHarness, ScriptedAgent, ScriptedOutcome, StoreWrite, clears_typing,
};

fn key(user: &str, itinerary: &str) -> ConversationKey {
    ConversationKey::new(user, itinerary).unwrap()
}

// ---- Successful round trip ----

#[tokio::test]
async fn reply_is_persisted_and_typing_toggles_once() {
    let harness = RelayHarness::builder()
        .with_agent(ScriptedAgent::with_replies(vec!["Day 1: Louvre, Day 2: Versailles"]))
        .build();
    let k = key("user123", "itinerary456");

    let accepted = harness
        .send("user123", "itinerary456", "Plan 2 days in Paris")
        .await
        .unwrap();
    assert_eq!(accepted.status, "success");
    assert!(harness.settle().await);

    let messages = harness.messages(&k).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[0].text, "Plan 2 days in Paris");
    assert_eq!(messages[1].sender, Sender::Model);
    assert_eq!(messages[1].text, "Day 1: Louvre, Day 2: Versailles");

    assert_eq!(harness.store.typing_history(&k), vec![true, false]);
    assert!(!harness.typing(&k).await);
    assert_eq!(harness.agent.received().await, vec!["Plan 2 days in Paris"]);

    let record = harness.tracker.get(&accepted.delegation_id).unwrap();
    assert_eq!(record.status, DelegationStatus::Replied);
}

#[tokio::test]
async fn reply_and_typing_clear_land_in_one_update() {
    let harness = RelayHarness::builder().build();
    let k = key("u", "i");
    harness.send("u", "i", "hello").await.unwrap();
    assert!(harness.settle().await);

    let updates: Vec<_> = harness
        .store
        .writes()
        .into_iter()
        .filter_map(|w| match w {
            StoreWrite::Update { path, fields } => Some((path, fields)),
            StoreWrite::Set { .. } => None,
        })
        .collect();
    assert_eq!(updates.len(), 1);
    let (path, fields) = &updates[0];
    assert_eq!(*path, k.messages_node());
    assert!(clears_typing(fields));
    assert_eq!(fields.len(), 2);
}

#[tokio::test]
async fn response_returns_before_agent_finishes() {
    let harness = RelayHarness::builder()
        .with_agent(ScriptedAgent::gated())
        .build();
    let k = key("u", "slow");

    harness.send("u", "slow", "anything").await.unwrap();

    // Agent is still blocked: only the user message exists and typing is on.
    let messages = harness.messages(&k).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender, Sender::User);
    assert!(harness.typing(&k).await);
    assert_eq!(harness.tracker.in_flight(), 1);

    harness.agent.release(1);
    assert!(harness.settle().await);
    assert_eq!(harness.messages(&k).await.len(), 2);
    assert!(!harness.typing(&k).await);
}

// ---- Failure paths ----

#[tokio::test]
async fn agent_failure_writes_error_reply() {
    let agent = ScriptedAgent::new();
    agent.push(ScriptedOutcome::Fail("timeout".into())).await;
    let harness = RelayHarness::builder().with_agent(agent).build();
    let k = key("u", "i");

    let accepted = harness.send("u", "i", "hi").await.unwrap();
    assert!(harness.settle().await);

    let messages = harness.messages(&k).await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].sender, Sender::Model);
    assert_eq!(messages[1].text, error_reply_text("timeout"));
    assert!(!harness.typing(&k).await);

    let record = harness.tracker.get(&accepted.delegation_id).unwrap();
    assert_eq!(record.status, DelegationStatus::ErrorReplied);
    assert_eq!(record.error.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn agent_panic_still_clears_typing() {
    let agent = ScriptedAgent::new();
    agent.push(ScriptedOutcome::Panic("agent blew up".into())).await;
    let harness = RelayHarness::builder().with_agent(agent).build();
    let k = key("u", "i");

    harness.send("u", "i", "hi").await.unwrap();
    assert!(harness.settle().await);

    let messages = harness.messages(&k).await;
    assert_eq!(messages.len(), 2);
    assert!(messages[1].text.starts_with("Sorry, an error occurred:"));
    assert!(messages[1].text.contains("agent blew up"));
    assert!(!harness.typing(&k).await);
}

#[tokio::test]
async fn failed_reply_write_falls_back_to_clearing_typing() {
    let store = Arc::new(RecordingStore::new());
    let harness = RelayHarness::builder()
        .with_agent(ScriptedAgent::gated())
        .with_store(store.clone())
        .build();
    let k = key("u", "i");

    let accepted = harness.send("u", "i", "hi").await.unwrap();
    store.fail_writes_containing("/message_id/");
    harness.agent.release(1);
    assert!(harness.settle().await);

    // The combined update was attempted and rejected; the standalone clear landed.
    let rejected = store.writes().into_iter().any(|w| match w {
        StoreWrite::Update { fields, .. } => clears_typing(&fields),
        StoreWrite::Set { .. } => false,
    });
    assert!(rejected);
    assert_eq!(harness.messages(&k).await.len(), 1);
    assert!(!harness.typing(&k).await);
    assert_eq!(store.typing_history(&k).last(), Some(&false));

    let record = harness.tracker.get(&accepted.delegation_id).unwrap();
    assert_eq!(record.status, DelegationStatus::ReplyFailed);
}

#[tokio::test]
async fn unwritable_database_leaves_typing_stuck_status() {
    let store = Arc::new(RecordingStore::new());
    let harness = RelayHarness::builder()
        .with_agent(ScriptedAgent::gated())
        .with_store(store.clone())
        .build();
    let k = key("u", "i");

    let accepted = harness.send("u", "i", "hi").await.unwrap();
    store.fail_writes_containing(&k.messages_node());
    harness.agent.release(1);
    assert!(harness.settle().await);

    let record = harness.tracker.get(&accepted.delegation_id).unwrap();
    assert_eq!(record.status, DelegationStatus::TypingStuck);
    assert_eq!(harness.tracker.stuck().len(), 1);
}

#[tokio::test]
async fn user_message_failure_starts_no_delegation() {
    let store = Arc::new(RecordingStore::new());
    store.fail_writes_containing("/message_id/");
    let harness = RelayHarness::builder().with_store(store.clone()).build();
    let k = key("u", "i");

    assert!(harness.send("u", "i", "hi").await.is_err());
    assert!(harness.tracker.snapshot().is_empty());
    assert!(store.typing_history(&k).is_empty());
    assert!(harness.agent.received().await.is_empty());
}

// ---- Concurrency and isolation ----

#[tokio::test]
async fn concurrent_messages_on_one_conversation_never_collide() {
    let harness = RelayHarness::builder().build();
    let k = key("u", "busy");

    let sends = (0..20).map(|n| {
        let text = format!("message {n}");
        let harness = &harness;
        async move { harness.send("u", "busy", &text).await }
    });
    let results = futures::future::join_all(sends).await;
    assert!(results.iter().all(Result::is_ok));
    assert!(harness.settle().await);

    let messages = harness.messages(&k).await;
    assert_eq!(messages.len(), 40);
    let ids: HashSet<_> = messages.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids.len(), 40);
    assert_eq!(
        messages.iter().filter(|m| m.sender == Sender::Model).count(),
        20
    );
    assert!(!harness.typing(&k).await);
}

#[tokio::test]
async fn different_conversations_write_disjoint_paths() {
    let harness = RelayHarness::builder().build();
    let a = key("alice", "rome");
    let b = key("bob", "rome");

    harness.send("alice", "rome", "a").await.unwrap();
    harness.send("bob", "rome", "b").await.unwrap();
    assert!(harness.settle().await);

    let paths = harness.store.written_paths();
    let a_root = format!("{}/", a.root_path());
    let b_root = format!("{}/", b.root_path());
    assert!(paths.iter().all(|p| p.starts_with(&a_root) || p.starts_with(&b_root)));
    assert_eq!(harness.messages(&a).await.len(), 2);
    assert_eq!(harness.messages(&b).await.len(), 2);
    assert_eq!(harness.store.typing_history(&a), vec![true, false]);
    assert_eq!(harness.store.typing_history(&b), vec![true, false]);
}

// ---- Full stack: gateway + real agent client ----

fn gateway_with_agent(agent_url: &str) -> (axum::Router, Arc<MemoryStore>, Arc<DelegationTracker>) {
    let store = Arc::new(MemoryStore::new());
    let agent_config = waypoint_config::model::AgentConfig {
        url: Some(agent_url.to_string()),
        timeout_secs: 2,
        max_retries: 0,
        retry_backoff_ms: 0,
    };
    let agent = Arc::new(RemoteAgentClient::new(&agent_config).unwrap());
    let tracker = Arc::new(DelegationTracker::new(16));
    let state = GatewayState {
        relay: ChatRelay::new(store.clone(), agent, tracker.clone()),
        store: store.clone(),
        itineraries: ItineraryStateStore::new(store.clone()),
        auth: AuthConfig { bearer_token: None },
        health: HealthState {
            start_time: Instant::now(),
        },
    };
    (build_router(state), store, tracker)
}

fn chat_request(user: &str, itinerary: &str, message: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"user_id": user, "itinerary_id": itinerary, "message": message}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn gateway_relays_enveloped_agent_reply() {
    let server = MockServer::start().await;
    let envelope = json!({"result": "Book the Eurostar", "state": {"days": []}});
    Mock::given(method("POST"))
        .and(path("/agent"))
        .and(body_string("London to Paris?"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": envelope.to_string()})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (router, store, tracker) = gateway_with_agent(&format!("{}/agent", server.uri()));
    let response = router
        .oneshot(chat_request("u", "i", "London to Paris?"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({"status": "success", "message": "Message received and being processed"})
    );

    assert!(tracker.drain(Duration::from_secs(5)).await);
    let k = key("u", "i");
    let messages = MessageStore::new(store.clone()).list(&k).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "Book the Eurostar");
    assert_eq!(store.get(&k.typing_path()).await.unwrap(), Some(json!(false)));
}

#[tokio::test]
async fn gateway_relays_plain_text_result_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": "plain text, not JSON"})),
        )
        .mount(&server)
        .await;

    let (router, store, tracker) = gateway_with_agent(&server.uri());
    router.oneshot(chat_request("u", "i", "hi")).await.unwrap();
    assert!(tracker.drain(Duration::from_secs(5)).await);

    let messages = MessageStore::new(store).list(&key("u", "i")).await.unwrap();
    assert_eq!(messages[1].text, "plain text, not JSON");
}

#[tokio::test]
async fn gateway_reports_agent_error_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "timeout"})))
        .mount(&server)
        .await;

    let (router, store, tracker) = gateway_with_agent(&server.uri());
    router.oneshot(chat_request("u", "i", "hi")).await.unwrap();
    assert!(tracker.drain(Duration::from_secs(5)).await);

    let k = key("u", "i");
    let messages = MessageStore::new(store.clone()).list(&k).await.unwrap();
    assert_eq!(messages[1].text, error_reply_text("timeout"));
    assert_eq!(store.get(&k.typing_path()).await.unwrap(), Some(json!(false)));
}

#[tokio::test]
async fn gateway_reports_unreachable_agent() {
    // Nothing listens on the discard port.
    let (router, store, tracker) = gateway_with_agent("http://127.0.0.1:9/agent");
    router.oneshot(chat_request("u", "i", "hi")).await.unwrap();
    assert!(tracker.drain(Duration::from_secs(10)).await);

    let messages = MessageStore::new(store).list(&key("u", "i")).await.unwrap();
    assert_eq!(
        messages[1].text,
        error_reply_text(waypoint_agent::CONNECT_ERROR)
    );
}

// ---- Configuration to running relay ----

#[tokio::test]
#[serial]
async fn config_file_drives_memory_relay() {
    for var in [
        "FIREBASE_DATABASE_URL",
        "GOOGLE_APPLICATION_CREDENTIALS",
        "HOST_AGENT_A2A_URL",
        "MAIN_AGENT_URL",
        "PORT",
    ] {
        // SAFETY: serialized with every other env-touching test in this binary.
        unsafe { std::env::remove_var(var) };
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "configured"})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("waypoint.toml");
    std::fs::write(
        &config_path,
        format!(
            "[database]\nurl = \"memory://\"\n\n[agent]\nurl = \"{}/agent\"\ntimeout_secs = 2\n",
            server.uri()
        ),
    )
    .unwrap();

    let config = waypoint_config::load_and_validate_path(&config_path).unwrap();
    let store = waypoint_store::open_store(&config.database).await.unwrap();
    let agent = Arc::new(RemoteAgentClient::new(&config.agent).unwrap());
    let tracker = Arc::new(DelegationTracker::new(config.delegation.history_limit));
    let relay = ChatRelay::new(store.clone(), agent, tracker.clone());

    relay
        .handle_chat(key("u", "i"), "hello".to_string())
        .await
        .unwrap();
    assert!(tracker.drain(Duration::from_secs(5)).await);

    let messages = MessageStore::new(store).list(&key("u", "i")).await.unwrap();
    assert_eq!(messages[1].text, "configured");
}
