//! Gateway Integration Tests
//!
//! Every test starts its own gateway on an ephemeral port backed by the
//! in-memory Directory/Store, so no external services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use chat_client::{AckOutcome, ChatState, ClientConfig, ClientEffect, MergeOutcome, OutboundStatus, ServerEvent};
use chat_common::JwtService;
use chat_core::{MessageKind, Snowflake};
use chat_gateway::events::GatewayEventType;
use chat_gateway::protocol::{CloseCode, GatewayMessage, OpCode};
use chat_service::dto::{ConversationRequest, SendMessageRequest};
use integration_tests::*;
use reqwest::StatusCode;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Error as WsError;

fn rejection(outcome: &AckOutcome) -> &str {
    outcome.error().map_or("", |e| e.error.as_str())
}

/// Refused upgrade: status and the JSON `code` of the body
async fn refused(url: String) -> (u16, String) {
    match connect_async(url).await {
        Err(WsError::Http(response)) => {
            let body: serde_json::Value = response
                .body()
                .as_deref()
                .and_then(|b| serde_json::from_slice(b).ok())
                .unwrap_or_default();
            (
                response.status().as_u16(),
                body["code"].as_str().unwrap_or_default().to_string(),
            )
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("upgrade should have been refused"),
    }
}

async fn wait_for_presence<F>(client: &mut chat_client::GatewayClient, predicate: F) -> Vec<Snowflake>
where
    F: Fn(&[Snowflake]) -> bool,
{
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let online = client
            .next_presence(remaining)
            .await
            .expect("presence snapshot not received");
        if predicate(&online) {
            return online;
        }
    }
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(chat_gateway::server::REQUEST_ID_HEADER));
    assert_eq!(response.text().await.unwrap(), "OK");
}

// ============================================================================
// Authentication Tests
// ============================================================================

#[tokio::test]
async fn test_missing_credential_refused() {
    let server = TestServer::start().await.unwrap();

    let (status, code) = refused(server.gateway_url()).await;
    assert_eq!(status, 401);
    assert_eq!(code, "AUTH_MISSING");

    let (status, code) = refused(format!("{}?token=", server.gateway_url())).await;
    assert_eq!(status, 401);
    assert_eq!(code, "AUTH_MISSING");
}

#[tokio::test]
async fn test_forged_credential_refused() {
    let server = TestServer::start().await.unwrap();
    let forged = JwtService::new("some-other-secret", 3600).issue(ALICE).unwrap();

    let (status, code) = refused(format!("{}?token={forged}", server.gateway_url())).await;
    assert_eq!(status, 401);
    assert_eq!(code, "AUTH_FAILURE");
    assert_eq!(server.connection_count(ALICE), 0);
}

#[tokio::test]
async fn test_unknown_identity_refused() {
    let server = TestServer::start().await.unwrap();
    let token = server.token_for(GHOST);

    let (status, code) = refused(format!("{}?token={token}", server.gateway_url())).await;
    assert_eq!(status, 401);
    assert_eq!(code, "INVALID_IDENTITY");
}

#[tokio::test]
async fn test_client_reports_refusal_status() {
    let server = TestServer::start().await.unwrap();
    let err = chat_client::GatewayClient::connect(&server.gateway_url(), "garbage", ClientConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), Some(401));
}

#[tokio::test]
async fn test_bearer_header_accepted() {
    let server = TestServer::start().await.unwrap();

    let mut request = server.gateway_url().into_client_request().unwrap();
    request.headers_mut().insert(
        "Authorization",
        HeaderValue::from_str(&format!("Bearer {}", server.token_for(BOB))).unwrap(),
    );
    let (mut socket, _) = connect_async(request).await.expect("bearer credential accepted");

    let hello = recv_frame(&mut socket).await.unwrap();
    assert_eq!(hello.op, OpCode::Hello);
}

#[tokio::test]
async fn test_client_connects_to_url_with_query() {
    let server = TestServer::start().await.unwrap();
    let url = format!("{}?client=integration", server.gateway_url());

    let client = chat_client::GatewayClient::connect(&url, &server.token_for(ALICE), ClientConfig::default())
        .await
        .expect("credential travels outside the query string");
    assert_eq!(client.user().id, ALICE);
    assert!(client.join(DIRECT).await.unwrap().is_acked());
}

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_hello_ready_then_presence() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect_raw(&server.token_for(ALICE)).await.unwrap();

    let hello = recv_frame(&mut socket).await.unwrap();
    assert_eq!(hello.op, OpCode::Hello);
    assert_eq!(hello.d.as_ref().unwrap()["heartbeat_interval"], 45_000);

    let ready = recv_frame(&mut socket).await.unwrap();
    assert_eq!(ready.event_type(), Some(GatewayEventType::Ready));
    assert_eq!(ready.s, Some(1));
    let data = ready.d.unwrap();
    assert_eq!(data["user"]["id"], "1001");
    assert_eq!(data["user"]["username"], "alice");
    assert!(!data["sessionId"].as_str().unwrap().is_empty());

    let presence = recv_frame(&mut socket).await.unwrap();
    assert_eq!(presence.event_type(), Some(GatewayEventType::PresenceSnapshot));
    assert_eq!(presence.s, Some(2));
    assert_eq!(presence.d.unwrap()["onlineUsers"], serde_json::json!(["1001"]));
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect_raw(&server.token_for(ALICE)).await.unwrap();
    for _ in 0..3 {
        recv_frame(&mut socket).await.unwrap();
    }

    send_frame(&mut socket, &GatewayMessage::heartbeat(Some(2))).await.unwrap();
    let ack = recv_frame(&mut socket).await.unwrap();
    assert_eq!(ack.op, OpCode::HeartbeatAck);
}

#[tokio::test]
async fn test_missing_heartbeat_times_out() {
    let config = test_config(&[
        ("GATEWAY_HEARTBEAT_INTERVAL_MS", "100"),
        ("GATEWAY_HEARTBEAT_TIMEOUT_MS", "200"),
    ])
    .unwrap();
    let server = TestServer::start_with_config(config).await.unwrap();

    let mut client = server
        .connect_with(
            ALICE,
            ClientConfig {
                heartbeat: false,
                ..ClientConfig::default()
            },
        )
        .await
        .unwrap();

    let closed = loop {
        match client.next_event_timeout(RECV_TIMEOUT).await {
            Some(ServerEvent::Closed(code)) => break code,
            Some(_) => {}
            None => panic!("connection was not closed"),
        }
    };
    assert_eq!(closed, Some(CloseCode::SessionTimeout.as_u16()));
    server.wait_disconnected(ALICE).await.unwrap();
}

#[tokio::test]
async fn test_client_heartbeats_keep_session_alive() {
    let config = test_config(&[
        ("GATEWAY_HEARTBEAT_INTERVAL_MS", "50"),
        ("GATEWAY_HEARTBEAT_TIMEOUT_MS", "300"),
    ])
    .unwrap();
    let server = TestServer::start_with_config(config).await.unwrap();
    let client = server.connect(ALICE).await.unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(server.connection_count(ALICE), 1);
    assert!(client.join(DIRECT).await.unwrap().is_acked());
}

// ============================================================================
// Protocol Error Tests
// ============================================================================

#[tokio::test]
async fn test_undecodable_frame_closes_connection() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect_raw(&server.token_for(ALICE)).await.unwrap();
    recv_frame(&mut socket).await.unwrap();

    use futures_util::SinkExt;
    socket
        .send(tokio_tungstenite::tungstenite::Message::Text("not json".into()))
        .await
        .unwrap();

    assert_eq!(
        recv_close_code(&mut socket).await.unwrap(),
        Some(CloseCode::DecodeError.as_u16())
    );
    server.wait_disconnected(ALICE).await.unwrap();
}

#[tokio::test]
async fn test_server_only_op_closes_connection() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect_raw(&server.token_for(ALICE)).await.unwrap();
    recv_frame(&mut socket).await.unwrap();

    send_frame(&mut socket, &GatewayMessage::heartbeat_ack()).await.unwrap();

    assert_eq!(
        recv_close_code(&mut socket).await.unwrap(),
        Some(CloseCode::UnknownOpcode.as_u16())
    );
}

#[tokio::test]
async fn test_protocol_error_leaves_other_connections_alone() {
    let server = TestServer::start().await.unwrap();
    let bob = server.connect(BOB).await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();

    alice.send_text(r#"{"op":99}"#).unwrap();
    server.wait_disconnected(ALICE).await.unwrap();

    assert_eq!(server.connection_count(BOB), 1);
    assert!(bob.join(DIRECT).await.unwrap().is_acked());
}

// ============================================================================
// Room Membership Tests
// ============================================================================

#[tokio::test]
async fn test_participant_joins_conversation() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();

    assert_eq!(alice.join(DIRECT).await.unwrap(), AckOutcome::Acked);

    let members = server
        .state
        .connection_manager()
        .group_members(chat_gateway::connection::GroupKey::Conversation(DIRECT));
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id(), ALICE);
}

#[tokio::test]
async fn test_non_participant_join_rejected() {
    let server = TestServer::start().await.unwrap();
    let carol = server.connect(CAROL).await.unwrap();

    let outcome = carol.join(DIRECT).await.unwrap();
    assert_eq!(rejection(&outcome), "Not authorized to join this chat");

    let members = server
        .state
        .connection_manager()
        .group_members(chat_gateway::connection::GroupKey::Conversation(DIRECT));
    assert!(members.is_empty());
}

#[tokio::test]
async fn test_join_unknown_conversation() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();

    let outcome = alice.join(Snowflake::new(404)).await.unwrap();
    assert_eq!(outcome.error().unwrap().code, "CONVERSATION_NOT_FOUND");
}

#[tokio::test]
async fn test_leave_is_idempotent() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();

    assert!(alice.join(DIRECT).await.unwrap().is_acked());
    assert!(alice.leave(DIRECT).await.unwrap().is_acked());
    assert!(alice.leave(DIRECT).await.unwrap().is_acked());
    assert!(alice.leave(Snowflake::new(404)).await.unwrap().is_acked());
}

#[tokio::test]
async fn test_malformed_join_payload_closes_connection() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect_raw(&server.token_for(ALICE)).await.unwrap();
    recv_frame(&mut socket).await.unwrap();

    let frame = GatewayMessage::request(
        OpCode::JoinConversation,
        Some(1),
        &serde_json::json!({ "conversation": "5001" }),
    )
    .unwrap();
    send_frame(&mut socket, &frame).await.unwrap();

    assert_eq!(
        recv_close_code(&mut socket).await.unwrap(),
        Some(CloseCode::DecodeError.as_u16())
    );
}

// ============================================================================
// Send / Broadcast Tests
// ============================================================================

#[tokio::test]
async fn test_send_reaches_every_participant() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect(ALICE).await.unwrap();
    let mut bob = server.connect(BOB).await.unwrap();
    let mut carol = server.connect(CAROL).await.unwrap();

    assert!(alice.join(DIRECT).await.unwrap().is_acked());
    assert!(bob.join(DIRECT).await.unwrap().is_acked());

    let outcome = alice
        .send_message(&SendMessageRequest::text(DIRECT, "hello"))
        .await
        .unwrap();
    assert_eq!(outcome, AckOutcome::Acked);

    let at_alice = alice.next_message(RECV_TIMEOUT).await.expect("alice echo");
    let at_bob = bob.next_message(RECV_TIMEOUT).await.expect("bob delivery");
    assert_eq!(at_alice.id, at_bob.id);
    assert_eq!(at_bob.content.as_deref(), Some("hello"));
    assert_eq!(at_bob.sender.id, ALICE);
    assert_eq!(at_bob.message_type, MessageKind::Text);
    assert!(at_bob.read_by.iter().any(|r| r.user_id == ALICE));

    // persisted before delivery, latest pointer moved
    let stored = server.backend.message(at_bob.id).expect("message persisted");
    assert_eq!(stored.sender_id, ALICE);
    assert_eq!(
        server.backend.conversation(DIRECT).unwrap().latest_message_id,
        Some(at_bob.id)
    );

    // never to a non-participant
    assert!(carol.next_message(QUIET_PERIOD).await.is_none());
}

#[tokio::test]
async fn test_delivery_reaches_participants_that_never_joined() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();
    let mut bob = server.connect(BOB).await.unwrap();

    alice
        .send_message(&SendMessageRequest::text(DIRECT, "ping"))
        .await
        .unwrap();

    let message = bob.next_message(RECV_TIMEOUT).await.expect("personal group delivery");
    assert_eq!(message.content.as_deref(), Some("ping"));
}

#[tokio::test]
async fn test_every_device_receives_exactly_once() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();
    let mut phone = server.connect(BOB).await.unwrap();
    let mut laptop = server.connect(BOB).await.unwrap();

    // joined on one device only: that device is in both groups
    assert!(phone.join(DIRECT).await.unwrap().is_acked());

    alice
        .send_message(&SendMessageRequest::text(DIRECT, "twice?"))
        .await
        .unwrap();

    let first = phone.next_message(RECV_TIMEOUT).await.unwrap();
    let second = laptop.next_message(RECV_TIMEOUT).await.unwrap();
    assert_eq!(first.id, second.id);
    assert!(phone.next_message(QUIET_PERIOD).await.is_none());
    assert!(laptop.next_message(QUIET_PERIOD).await.is_none());
}

#[tokio::test]
async fn test_group_conversation_fan_out() {
    let server = TestServer::start().await.unwrap();
    let carol = server.connect(CAROL).await.unwrap();
    let mut alice = server.connect(ALICE).await.unwrap();
    let mut bob = server.connect(BOB).await.unwrap();

    assert!(carol
        .send_message(&SendMessageRequest::text(GROUP, "team update"))
        .await
        .unwrap()
        .is_acked());

    let a = alice.next_message(RECV_TIMEOUT).await.unwrap();
    let b = bob.next_message(RECV_TIMEOUT).await.unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(a.conversation_id, GROUP);
}

#[tokio::test]
async fn test_non_participant_send_rejected() {
    let server = TestServer::start().await.unwrap();
    let carol = server.connect(CAROL).await.unwrap();
    let mut bob = server.connect(BOB).await.unwrap();

    let outcome = carol
        .send_message(&SendMessageRequest::text(DIRECT, "let me in"))
        .await
        .unwrap();
    assert_eq!(rejection(&outcome), "Not authorized");
    assert_eq!(outcome.error().unwrap().code, "NOT_AUTHORIZED");

    let outcome = carol
        .send_message(&SendMessageRequest::text(Snowflake::new(404), "anyone?"))
        .await
        .unwrap();
    assert_eq!(rejection(&outcome), "Not authorized");

    assert_eq!(server.backend.message_count(), 0);
    assert!(bob.next_message(QUIET_PERIOD).await.is_none());
}

#[tokio::test]
async fn test_attachment_missing_persists_nothing() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();

    let outcome = alice
        .send_message(&SendMessageRequest::attachment(DIRECT, MessageKind::Image, None, None))
        .await
        .unwrap();

    assert_eq!(rejection(&outcome), "Attachment missing");
    assert_eq!(server.backend.message_count(), 0);
    assert_eq!(server.backend.conversation(DIRECT).unwrap().latest_message_id, None);
}

#[tokio::test]
async fn test_empty_text_persists_nothing() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();

    for body in ["", "   "] {
        let outcome = alice
            .send_message(&SendMessageRequest::text(DIRECT, body))
            .await
            .unwrap();
        assert_eq!(rejection(&outcome), "Message content required");
    }
    assert_eq!(server.backend.message_count(), 0);
}

#[tokio::test]
async fn test_image_with_attachment_delivered() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();
    let mut bob = server.connect(BOB).await.unwrap();

    let request = SendMessageRequest::attachment(
        DIRECT,
        MessageKind::Image,
        Some("https://cdn.example/cat.png".into()),
        Some("cat.png".into()),
    );
    assert!(alice.send_message(&request).await.unwrap().is_acked());

    let message = bob.next_message(RECV_TIMEOUT).await.unwrap();
    assert_eq!(message.message_type, MessageKind::Image);
    assert_eq!(message.file_url.as_deref(), Some("https://cdn.example/cat.png"));
    assert_eq!(message.preview_text(), "📷 Photo");
}

#[tokio::test]
async fn test_transient_failure_reports_generic_error() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();
    let mut bob = server.connect(BOB).await.unwrap();

    server.backend.set_unavailable(true);
    let outcome = alice
        .send_message(&SendMessageRequest::text(DIRECT, "lost"))
        .await
        .unwrap();
    assert_eq!(rejection(&outcome), "Failed to send message");
    assert!(bob.next_message(QUIET_PERIOD).await.is_none());

    server.backend.set_unavailable(false);
    assert!(alice
        .send_message(&SendMessageRequest::text(DIRECT, "retry by hand"))
        .await
        .unwrap()
        .is_acked());
    assert_eq!(server.backend.message_count(), 1);
}

#[tokio::test]
async fn test_send_completes_after_sender_disconnects() {
    let config = test_config(&[
        ("GATEWAY_HEARTBEAT_INTERVAL_MS", "50"),
        ("GATEWAY_HEARTBEAT_TIMEOUT_MS", "200"),
    ])
    .unwrap();
    let server = TestServer::start_with_store(config, |backend| {
        SlowStore::wrap(backend, Duration::from_millis(600))
    })
    .await
    .unwrap();

    // alice stops heartbeating, so the server drops her while the store stalls
    let alice = server
        .connect_with(
            ALICE,
            ClientConfig {
                heartbeat: false,
                ..ClientConfig::default()
            },
        )
        .await
        .unwrap();
    let mut bob = server.connect(BOB).await.unwrap();

    let outcome = alice
        .send_message(&SendMessageRequest::text(DIRECT, "hello"))
        .await
        .unwrap();
    assert_eq!(outcome, AckOutcome::Indeterminate);
    server.wait_disconnected(ALICE).await.unwrap();

    let at_bob = bob.next_message(RECV_TIMEOUT).await.expect("bob delivery");
    assert_eq!(at_bob.content.as_deref(), Some("hello"));
    assert_eq!(server.backend.message_count(), 1);
    assert_eq!(
        server.backend.conversation(DIRECT).unwrap().latest_message_id,
        Some(at_bob.id)
    );
}

#[tokio::test]
async fn test_request_without_nonce_gets_no_ack() {
    let server = TestServer::start().await.unwrap();
    let mut socket = server.connect_raw(&server.token_for(ALICE)).await.unwrap();
    for _ in 0..3 {
        recv_frame(&mut socket).await.unwrap();
    }

    let frame = GatewayMessage::request(
        OpCode::SendMessage,
        None,
        &SendMessageRequest::text(DIRECT, "fire and forget"),
    )
    .unwrap();
    send_frame(&mut socket, &frame).await.unwrap();

    // the echo arrives, no Ack precedes it
    let next = recv_frame(&mut socket).await.unwrap();
    assert_eq!(next.event_type(), Some(GatewayEventType::MessageDelivered));

    let failing = GatewayMessage::request(
        OpCode::SendMessage,
        None,
        &SendMessageRequest::text(DIRECT, ""),
    )
    .unwrap();
    send_frame(&mut socket, &failing).await.unwrap();
    send_frame(&mut socket, &GatewayMessage::heartbeat(None)).await.unwrap();
    assert_eq!(recv_frame(&mut socket).await.unwrap().op, OpCode::HeartbeatAck);
}

// ============================================================================
// Read Receipt Tests
// ============================================================================

#[tokio::test]
async fn test_mark_read_appends_receipts() {
    let server = TestServer::start().await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();
    let bob = server.connect(BOB).await.unwrap();

    for body in ["one", "two"] {
        alice
            .send_message(&SendMessageRequest::text(DIRECT, body))
            .await
            .unwrap();
    }
    assert!(server.backend.messages_in(DIRECT).iter().all(|m| !m.is_read_by(BOB)));

    assert!(bob.mark_read(DIRECT).await.unwrap().is_acked());
    assert!(server.backend.messages_in(DIRECT).iter().all(|m| m.is_read_by(BOB)));

    let carol = server.connect(CAROL).await.unwrap();
    let outcome = carol.mark_read(DIRECT).await.unwrap();
    assert_eq!(outcome.error().unwrap().code, "NOT_AUTHORIZED");
}

// ============================================================================
// Presence Tests
// ============================================================================

#[tokio::test]
async fn test_presence_tracks_every_device() {
    let server = TestServer::start().await.unwrap();
    let mut observer = server.connect(CAROL).await.unwrap();

    let phone = server.connect(ALICE).await.unwrap();
    wait_for_presence(&mut observer, |online| online.contains(&ALICE)).await;

    let laptop = server.connect(ALICE).await.unwrap();
    assert_eq!(server.connection_count(ALICE), 2);

    phone.close().await;
    tokio::time::timeout(RECV_TIMEOUT, async {
        while server.connection_count(ALICE) != 1 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert!(server.state.presence().is_online(ALICE));

    laptop.close().await;
    let online = wait_for_presence(&mut observer, |online| !online.contains(&ALICE)).await;
    assert_eq!(online, vec![CAROL]);
    assert!(!server.state.presence().is_online(ALICE));
}

#[tokio::test]
async fn test_declared_offline_hides_connection() {
    let server = TestServer::start().await.unwrap();
    let mut observer = server.connect(CAROL).await.unwrap();
    let alice = server.connect(ALICE).await.unwrap();
    wait_for_presence(&mut observer, |online| online.contains(&ALICE)).await;

    alice.declare_offline().unwrap();
    wait_for_presence(&mut observer, |online| !online.contains(&ALICE)).await;

    alice.declare_online().unwrap();
    wait_for_presence(&mut observer, |online| online.contains(&ALICE)).await;
}

#[tokio::test]
async fn test_presence_claim_for_other_user_ignored() {
    let server = TestServer::start().await.unwrap();
    let _bob = server.connect(BOB).await.unwrap();
    let mut socket = server.connect_raw(&server.token_for(ALICE)).await.unwrap();
    for _ in 0..3 {
        recv_frame(&mut socket).await.unwrap();
    }

    let claim = GatewayMessage::request(
        OpCode::PresenceUpdate,
        None,
        &serde_json::json!({ "status": "offline", "userId": BOB.to_string() }),
    )
    .unwrap();
    send_frame(&mut socket, &claim).await.unwrap();
    send_frame(&mut socket, &GatewayMessage::heartbeat(None)).await.unwrap();

    // no snapshot was broadcast for the ignored claim
    assert_eq!(recv_frame(&mut socket).await.unwrap().op, OpCode::HeartbeatAck);
    assert!(server.state.presence().is_online(BOB));
}

// ============================================================================
// Client Reconciliation Tests
// ============================================================================

#[tokio::test]
async fn test_optimistic_send_confirmed_by_echo() {
    let server = TestServer::start().await.unwrap();
    let mut alice = server.connect(ALICE).await.unwrap();
    let mut bob = server.connect(BOB).await.unwrap();

    let mut alice_state = ChatState::new(alice.user().id);
    let mut bob_state = ChatState::new(bob.user().id);
    bob_state.open_conversation(GROUP);
    bob_state.take_effects();

    let request = SendMessageRequest::text(DIRECT, "hi");
    let temp_id = alice_state.begin_send(&request);
    assert!(alice_state.timeline(DIRECT)[0].is_pending());

    let outcome = alice.send_message(&request).await.unwrap();
    alice_state.on_ack(temp_id, outcome);

    let echo = alice.next_message(RECV_TIMEOUT).await.unwrap();
    assert_eq!(alice_state.on_delivered(echo.clone()), MergeOutcome::Confirmed(temp_id));
    assert_eq!(
        alice_state.outbound_status(temp_id),
        Some(&OutboundStatus::Confirmed(echo.id))
    );
    assert_eq!(alice_state.on_delivered(echo), MergeOutcome::Duplicate);
    assert_eq!(alice_state.timeline(DIRECT).len(), 1);

    let delivered = bob.next_message(RECV_TIMEOUT).await.unwrap();
    assert_eq!(bob_state.on_delivered(delivered), MergeOutcome::Appended);
    assert_eq!(bob_state.unread(DIRECT), 1);
    assert_eq!(bob_state.preview(DIRECT), Some("hi"));

    bob_state.open_conversation(DIRECT);
    assert_eq!(bob_state.unread(DIRECT), 0);
    for effect in bob_state.take_effects() {
        if let ClientEffect::MarkRead(conversation_id) = effect {
            assert!(bob.mark_read(conversation_id).await.unwrap().is_acked());
        }
    }
    assert!(server.backend.messages_in(DIRECT).iter().all(|m| m.is_read_by(BOB)));
}

#[tokio::test]
async fn test_rejected_send_removes_placeholder() {
    let server = TestServer::start().await.unwrap();
    let carol = server.connect(CAROL).await.unwrap();
    let mut state = ChatState::new(CAROL);

    let request = SendMessageRequest::text(DIRECT, "sneaky");
    let temp_id = state.begin_send(&request);
    let outcome = carol.send_message(&request).await.unwrap();
    state.on_ack(temp_id, outcome);

    assert!(state.timeline(DIRECT).is_empty());
    assert_eq!(
        state.outbound_status(temp_id),
        Some(&OutboundStatus::Failed("Not authorized".into()))
    );
    assert!(matches!(
        state.take_effects().as_slice(),
        [ClientEffect::SendFailed { .. }]
    ));
}

#[tokio::test]
async fn test_reconnect_replays_rejoin_plan() {
    let server = TestServer::start().await.unwrap();
    let mut state = ChatState::new(BOB);
    state.open_conversation(DIRECT);

    let first = server.connect(BOB).await.unwrap();
    assert!(first.join(DIRECT).await.unwrap().is_acked());
    first.close().await;
    server.wait_disconnected(BOB).await.unwrap();

    let mut second = server.connect(BOB).await.unwrap();
    for command in state.rejoin_plan() {
        assert!(second.execute(command).await.unwrap().is_acked());
    }
    let members = server
        .state
        .connection_manager()
        .group_members(chat_gateway::connection::GroupKey::Conversation(DIRECT));
    assert_eq!(members.len(), 1);

    let alice = server.connect(ALICE).await.unwrap();
    alice
        .send_message(&SendMessageRequest::text(DIRECT, "welcome back"))
        .await
        .unwrap();
    let message = second.next_message(RECV_TIMEOUT).await.unwrap();
    state.on_delivered(message);
    assert_eq!(state.timeline(DIRECT).len(), 1);
    assert_eq!(state.take_effects().last(), Some(&ClientEffect::MarkRead(DIRECT)));
}

#[tokio::test]
async fn test_join_request_payload_shape() {
    // requests built by the client decode on the server side
    let frame = GatewayMessage::request(
        OpCode::JoinConversation,
        Some(7),
        &ConversationRequest { conversation_id: DIRECT },
    )
    .unwrap();
    let json = frame.to_json().unwrap();
    assert!(json.contains(r#""conversationId":"5001""#));
    assert!(json.contains(r#""n":7"#));
}
