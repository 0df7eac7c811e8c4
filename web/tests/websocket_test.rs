//! End-to-end tests using real WebSocket clients against a server on an
//! ephemeral port.

mod common;

use common::*;
use events::DomainEvent;
use futures::SinkExt;
use hub::{EventKind, RoomId};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

#[tokio::test]
async fn greeting_carries_the_server_assigned_client_id() {
    let server = TestServer::start().await;
    let (_ws, client_id) = server.connect("3").await;

    let clients = server.hub.clients().await.unwrap();
    assert_eq!(clients.total_clients, 1);
    assert_eq!(clients.clients[0].id, client_id);
    assert_eq!(clients.clients[0].user_id, "3");
}

#[tokio::test]
async fn connect_without_user_id_is_rejected_before_upgrade() {
    let server = TestServer::start().await;

    for path in ["/ws", "/ws?user_id=", "/ws?user_id=%20%20"] {
        match connect_async(server.url(path)).await {
            Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 400),
            Err(e) => panic!("expected a 400 for {path}, got {e}"),
            Ok(_) => panic!("expected a 400 for {path}, got an upgrade"),
        }
    }
}

#[tokio::test]
async fn post_broadcast_reaches_members_only() {
    let server = TestServer::start().await;
    let (mut a, _) = server.connect("1").await;
    let (mut b, _) = server.connect("2").await;
    let (mut c, _) = server.connect("3").await;
    join(&mut a, "post:7").await;
    join(&mut b, "post:7").await;

    server
        .hub
        .publish(
            RoomId::post(7),
            EventKind::NewComment,
            json!({"id": 11, "content": "Me interesa"}),
        )
        .await;

    for ws in [&mut a, &mut b] {
        let envelope = next_envelope(ws).await;
        assert_eq!(envelope["kind"], "new_comment");
        assert_eq!(envelope["room_id"], "post:7");
        assert_eq!(envelope["data"]["id"], 11);
        assert!(envelope["time"].is_string());
    }
    assert_silent(&mut c).await;
}

#[tokio::test]
async fn upstream_domain_events_reach_the_conversation() {
    let server = TestServer::start().await;
    let (mut participant, _) = server.connect("8").await;
    join(&mut participant, "conversation:42").await;

    server
        .app_state
        .event_publisher
        .publish(DomainEvent::MessageCreated {
            conversation_id: 42,
            message: json!({"id": 5, "content": "Nos vemos el martes"}),
        })
        .await;

    let envelope = next_envelope(&mut participant).await;
    assert_eq!(envelope["kind"], "new_message");
    assert_eq!(envelope["room_id"], "conversation:42");
    assert_eq!(envelope["data"]["content"], "Nos vemos el martes");
}

#[tokio::test]
async fn join_then_broadcast_round_trip() {
    let server = TestServer::start().await;
    let (mut participant, _) = server.connect("3").await;
    let (mut bystander, _) = server.connect("5").await;
    join(&mut participant, "conversation:42").await;

    send(
        &mut participant,
        json!({
            "kind": "domain_event",
            "room_id": "conversation:42",
            "data": {"event": "new_message", "payload": {"content": "hola"}}
        }),
    )
    .await;

    let envelope = next_envelope(&mut participant).await;
    assert_eq!(envelope["kind"], "new_message");
    assert_eq!(envelope["data"]["content"], "hola");
    assert_silent(&mut bystander).await;
}

#[tokio::test]
async fn outsiders_are_denied_conversation_rooms() {
    let server = TestServer::start().await;
    let (mut outsider, _) = server.connect("5").await;

    send(
        &mut outsider,
        json!({"type": "join_conversation", "data": {"conversation_id": 42}}),
    )
    .await;

    let reply = next_envelope(&mut outsider).await;
    assert_eq!(reply["kind"], "error");
    assert_eq!(reply["data"]["code"], "forbidden");
    assert_eq!(reply["room_id"], "conversation:42");

    let status = server.hub.status().await.unwrap();
    assert_eq!(status.total_rooms, 0);
}

#[tokio::test]
async fn typing_indicators_name_the_typist() {
    let server = TestServer::start().await;
    let (mut three, _) = server.connect("3").await;
    let (mut eight, _) = server.connect("8").await;
    join(&mut three, "conversation:42").await;
    join(&mut eight, "conversation:42").await;

    send(
        &mut three,
        json!({"kind": "typing_start", "room_id": "conversation:42"}),
    )
    .await;

    let envelope = next_envelope(&mut eight).await;
    assert_eq!(envelope["kind"], "user_typing_start");
    assert_eq!(envelope["data"]["user_id"], "3");
    assert_eq!(envelope["data"]["room_id"], "conversation:42");
}

#[tokio::test]
async fn unknown_kind_is_reported_without_membership_change() {
    let server = TestServer::start().await;
    let (mut ws, _) = server.connect("3").await;
    join(&mut ws, "post:7").await;

    send(&mut ws, json!({"kind": "teleport", "room_id": "post:9"})).await;

    let reply = next_envelope(&mut ws).await;
    assert_eq!(reply["kind"], "error");
    assert_eq!(reply["data"]["code"], "unknown_kind");

    let status = server.hub.status().await.unwrap();
    assert_eq!(status.total_rooms, 1);
    assert_eq!(status.rooms_info.get("post:7"), Some(&1));
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let server = TestServer::start().await;
    let (mut ws, _) = server.connect("3").await;

    send(&mut ws, json!({"kind": "ping"})).await;

    let reply = next_envelope(&mut ws).await;
    assert_eq!(reply["kind"], "pong");
    assert!(reply["data"]["timestamp"].is_i64());
}

#[tokio::test]
async fn disconnect_removes_the_last_member_rooms() {
    let server = TestServer::start().await;
    let (mut a, _) = server.connect("3").await;
    let (mut b, _) = server.connect("8").await;
    join(&mut a, "conversation:42").await;
    join(&mut a, "post:7").await;
    join(&mut b, "post:7").await;

    a.close(None).await.unwrap();
    wait_for_status(&server.hub, |status| status.total_clients == 1).await;

    let status = server.hub.status().await.unwrap();
    assert_eq!(status.total_rooms, 1);
    assert!(!status.rooms_info.contains_key("conversation:42"));
    assert_eq!(status.rooms_info.get("post:7"), Some(&1));

    server
        .hub
        .publish(RoomId::post(7), EventKind::NewComment, json!({"id": 1}))
        .await;
    assert_eq!(next_envelope(&mut b).await["kind"], "new_comment");
}

#[tokio::test]
async fn hub_shutdown_closes_connections_as_going_away() {
    let server = TestServer::start().await;
    let (mut ws, _) = server.connect("3").await;

    server.hub.shutdown().await;

    assert_eq!(close_code(&mut ws).await, 1001);
}

#[tokio::test]
async fn oversized_messages_end_the_connection() {
    let server = TestServer::start().await;
    let (mut ws, _) = server.connect("3").await;
    let max = server.app_state.config.ws_max_message_bytes;

    let _ = ws.send(Message::text("x".repeat(max * 4))).await;

    wait_for_status(&server.hub, |status| status.total_clients == 0).await;
}
