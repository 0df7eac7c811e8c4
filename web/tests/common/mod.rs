#![allow(dead_code)]

use async_trait::async_trait;
use clap::Parser;
use events::EventPublisher;
use futures::{SinkExt, StreamExt};
use hub::{Hub, HubEventHandler, HubHandle, RoomAuthorizer, RoomId, UserId};
use serde_json::Value;
use service::config::Config;
use service::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const TIMEOUT: Duration = Duration::from_secs(5);
pub const SECRET: &str = "relay-secret";

pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Conversation 42 is between users 3 and 8; post 7 exists.
pub struct SkillSwapRooms;

#[async_trait]
impl RoomAuthorizer for SkillSwapRooms {
    async fn can_join(&self, room: &RoomId, user_id: &UserId) -> Result<bool, hub::Error> {
        Ok(match room.as_str() {
            "conversation:42" => user_id == "3" || user_id == "8",
            "post:7" => true,
            _ => false,
        })
    }
}

pub fn test_config() -> Config {
    Config::parse_from(["skillswap_realtime"])
        .set_broadcast_relay_url(None)
        .set_broadcast_auth_token(Some(SECRET.to_string()))
}

pub fn app_state(config: Config) -> (AppState, HubHandle) {
    let (hub, handle) = Hub::new(config.ws_control_channel_capacity);
    tokio::spawn(hub.run());

    let event_publisher =
        EventPublisher::new().with_handler(Arc::new(HubEventHandler::new(handle.clone())));
    let app_state = AppState::new(
        config,
        handle.clone(),
        Arc::new(SkillSwapRooms),
        Arc::new(event_publisher),
    );

    (app_state, handle)
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub hub: HubHandle,
    pub app_state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(test_config()).await
    }

    pub async fn start_with(config: Config) -> Self {
        let (app_state, hub) = app_state(config);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let served = app_state.clone();
        tokio::spawn(async move {
            web::serve(listener, served, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        Self {
            addr,
            hub,
            app_state,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("ws://{}{path}", self.addr)
    }

    /// Opens a connection and consumes its `connection_established` greeting.
    pub async fn connect(&self, user_id: &str) -> (WsStream, String) {
        let (mut ws, _) = connect_async(self.url(&format!("/ws?user_id={user_id}")))
            .await
            .unwrap();
        let greeting = next_envelope(&mut ws).await;
        assert_eq!(greeting["kind"], "connection_established");
        let client_id = greeting["data"]["client_id"].as_str().unwrap().to_string();
        (ws, client_id)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn send(ws: &mut WsStream, frame: Value) {
    ws.send(Message::text(frame.to_string())).await.unwrap();
}

/// Next JSON envelope, skipping keepalives.
pub async fn next_envelope(ws: &mut WsStream) -> Value {
    loop {
        let message = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for an envelope")
            .expect("connection closed")
            .unwrap();
        match message {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected message {other:?}"),
        }
    }
}

pub async fn join(ws: &mut WsStream, room: &str) {
    send(ws, serde_json::json!({"kind": "join", "room_id": room})).await;
    let reply = next_envelope(ws).await;
    assert_eq!(reply["kind"], "joined_room", "unexpected reply {reply}");
    assert_eq!(reply["data"]["room_id"], room);
}

/// Asserts nothing but keepalives arrives for a short while.
pub async fn assert_silent(ws: &mut WsStream) {
    let quiet = timeout(Duration::from_millis(300), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                other => return other,
            }
        }
    })
    .await;
    assert!(quiet.is_err(), "expected silence, got {quiet:?}");
}

/// Waits for the server's close frame and returns its code.
pub async fn close_code(ws: &mut WsStream) -> u16 {
    loop {
        let message = timeout(TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for close")
            .expect("stream ended without a close frame")
            .unwrap();
        if let Message::Close(frame) = message {
            return frame.map(|frame| u16::from(frame.code)).unwrap_or(1005);
        }
    }
}

/// Polls the hub until `predicate` holds for its status.
pub async fn wait_for_status(hub: &HubHandle, predicate: impl Fn(&hub::HubStatus) -> bool) {
    for _ in 0..100 {
        if predicate(&hub.status().await.unwrap()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("hub never reached the expected status");
}
