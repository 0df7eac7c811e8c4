use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind};
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use hub::domain_event_handler::route;
use hub::EventType;
use log::*;
use serde::Serialize;
use serde_json::Value;
use service::config::Config;
use std::time::Duration;

const BROADCAST_PATH: &str = "/api/broadcast";

/// Body posted to the relay endpoint of another process.
#[derive(Debug, Serialize)]
pub struct RelayMessage<'a> {
    pub room_name: &'a str,
    pub event_name: &'a str,
    pub data: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<&'a str>,
}

/// Out-of-process notifier: `POST {base_url}/api/broadcast`.
#[derive(Clone)]
pub struct BroadcastRelay {
    client: reqwest::Client,
    url: String,
    auth_token: Option<String>,
}

impl BroadcastRelay {
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: format!("{}{BROADCAST_PATH}", base_url.trim_end_matches('/')),
            auth_token,
        })
    }

    /// Builds the relay when `broadcast_relay_url` is configured.
    pub fn from_config(config: &Config) -> Result<Option<Self>, Error> {
        let Some(base_url) = config.broadcast_relay_url() else {
            return Ok(None);
        };
        if base_url.trim().is_empty() {
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
            });
        }
        Self::new(
            &base_url,
            config.broadcast_auth_token(),
            config.broadcast_relay_timeout(),
        )
        .map(Some)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts one event and reports the outcome.
    pub async fn send(&self, room_name: &str, event_name: &str, data: &Value) -> Result<(), Error> {
        let message = RelayMessage {
            room_name,
            event_name,
            data,
            auth_token: self.auth_token.as_deref(),
        };

        let response = self.client.post(&self.url).json(&message).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!("Relayed {event_name} to {room_name}");
            Ok(())
        } else {
            Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Status(status.as_u16())),
            })
        }
    }

    /// Fire-and-forget variant: failures are logged and swallowed.
    pub async fn notify(&self, room_name: &str, event_name: &str, data: &Value) {
        if let Err(e) = self.send(room_name, event_name, data).await {
            warn!("Broadcast relay of {event_name} to {room_name} failed: {e}");
        }
    }
}

/// Mirrors every domain event to the relay without holding up the publisher.
pub struct RelayEventHandler {
    relay: BroadcastRelay,
}

impl RelayEventHandler {
    pub fn new(relay: BroadcastRelay) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl EventHandler for RelayEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        let (room, kind, data) = route(event);
        let relay = self.relay.clone();
        tokio::spawn(async move {
            relay
                .notify(room.as_str(), kind.event_type(), &data)
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn relay(base_url: &str, token: Option<&str>) -> BroadcastRelay {
        BroadcastRelay::new(
            base_url,
            token.map(str::to_string),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn send_posts_the_relay_contract() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/broadcast")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "room_name": "conversation:42",
                "event_name": "new_message",
                "data": {"content": "hola"},
                "auth_token": "secret"
            })))
            .with_status(200)
            .create_async()
            .await;

        relay(&format!("{}/", server.url()), Some("secret"))
            .send("conversation:42", "new_message", &json!({"content": "hola"}))
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported_by_send() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/broadcast")
            .with_status(401)
            .create_async()
            .await;

        let err = relay(&server.url(), None)
            .send("post:7", "new_comment", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Status(401))
        );
    }

    #[tokio::test]
    async fn notify_swallows_network_failures() {
        // Nothing listens on port 9 (discard) in the test environment.
        relay("http://127.0.0.1:9", None)
            .notify("post:7", "new_comment", &json!({}))
            .await;
    }

    #[tokio::test]
    async fn handler_relays_domain_events_to_their_room() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/broadcast")
            .match_body(Matcher::PartialJson(json!({
                "room_name": "post:7",
                "event_name": "comment_vote_update",
                "data": {"comment_id": 3, "total_likes": 2}
            })))
            .with_status(200)
            .create_async()
            .await;

        let handler = RelayEventHandler::new(relay(&server.url(), None));
        handler
            .handle(&DomainEvent::CommentVoteUpdated {
                post_id: 7,
                comment_id: 3,
                votes: json!({"total_likes": 2}),
            })
            .await;

        for _ in 0..50 {
            if mock.matched_async().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        mock.assert_async().await;
    }

    #[test]
    fn url_appends_broadcast_path_once() {
        assert_eq!(
            relay("http://localhost:3000/", None).url(),
            "http://localhost:3000/api/broadcast"
        );
    }
}
