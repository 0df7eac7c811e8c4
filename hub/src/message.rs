use crate::connection::{ConnectionId, UserId};
use crate::error::{Error, ProtocolErrorKind};
use crate::room::RoomId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Trait for getting the wire name of an event kind
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Closed set of outbound envelope kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    // System events (hub -> single connection)
    ConnectionEstablished,
    JoinedRoom,
    LeftRoom,
    Error,
    Pong,

    // Relayed domain events (room scoped)
    NewMessage,
    NewComment,
    CommentUpdate,
    CommentVoteUpdate,

    // Ephemeral presence (room scoped)
    UserTypingStart,
    UserTypingStop,
}

impl EventKind {
    /// Resolves the name of a domain event that publishers and clients may relay.
    /// System and presence kinds are never accepted from outside the hub.
    pub fn relayable(name: &str) -> Option<Self> {
        match name {
            "new_message" => Some(EventKind::NewMessage),
            "new_comment" => Some(EventKind::NewComment),
            "comment_update" => Some(EventKind::CommentUpdate),
            "comment_vote_update" => Some(EventKind::CommentVoteUpdate),
            _ => None,
        }
    }
}

impl EventType for EventKind {
    fn event_type(&self) -> &'static str {
        match self {
            EventKind::ConnectionEstablished => "connection_established",
            EventKind::JoinedRoom => "joined_room",
            EventKind::LeftRoom => "left_room",
            EventKind::Error => "error",
            EventKind::Pong => "pong",
            EventKind::NewMessage => "new_message",
            EventKind::NewComment => "new_comment",
            EventKind::CommentUpdate => "comment_update",
            EventKind::CommentVoteUpdate => "comment_vote_update",
            EventKind::UserTypingStart => "user_typing_start",
            EventKind::UserTypingStop => "user_typing_stop",
        }
    }
}

/// The unit delivered to clients: `{kind, data, room_id?, time}`.
///
/// `origin` is hub-internal producer metadata: the connection a client-initiated
/// broadcast came from, or `None` for server-initiated events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub kind: EventKind,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    pub time: DateTime<Utc>,
    #[serde(skip)]
    pub origin: Option<ConnectionId>,
}

impl Envelope {
    /// A server-initiated envelope without a target room (goes to everyone when broadcast).
    pub fn system(kind: EventKind, data: Value) -> Self {
        Self {
            kind,
            data,
            room_id: None,
            time: Utc::now(),
            origin: None,
        }
    }

    /// A server-initiated envelope scoped to one room.
    pub fn to_room(room: RoomId, kind: EventKind, data: Value) -> Self {
        Self {
            room_id: Some(room),
            ..Self::system(kind, data)
        }
    }

    pub fn with_origin(mut self, origin: ConnectionId) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn connection_established(client_id: &ConnectionId) -> Self {
        Self::system(
            EventKind::ConnectionEstablished,
            json!({
                "message": "WebSocket connection established",
                "client_id": client_id.as_str(),
            }),
        )
    }

    pub fn joined_room(room: &RoomId) -> Self {
        Self::to_room(room.clone(), EventKind::JoinedRoom, json!({ "room_id": room }))
    }

    pub fn left_room(room: &RoomId) -> Self {
        Self::to_room(room.clone(), EventKind::LeftRoom, json!({ "room_id": room }))
    }

    pub fn pong() -> Self {
        let now = Utc::now();
        Self {
            time: now,
            ..Self::system(EventKind::Pong, json!({ "timestamp": now.timestamp() }))
        }
    }

    pub fn typing(room: &RoomId, user_id: &UserId, started: bool) -> Self {
        let kind = if started {
            EventKind::UserTypingStart
        } else {
            EventKind::UserTypingStop
        };
        Self::to_room(
            room.clone(),
            kind,
            json!({ "room_id": room, "user_id": user_id }),
        )
    }

    pub fn error(kind: ProtocolErrorKind, message: &str, room: Option<&RoomId>) -> Self {
        Self {
            room_id: room.cloned(),
            ..Self::system(
                EventKind::Error,
                json!({ "code": kind.code(), "message": message }),
            )
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Raw inbound frame: `{kind, room_id?, data?}`. Older clients name the
/// discriminator `type`; extra fields such as `user_id` and `time` are ignored
/// because the hub stamps identity and time itself.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    #[serde(alias = "type")]
    kind: String,
    #[serde(default)]
    room_id: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// A decoded, validated client request.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    Join(RoomId),
    Leave(RoomId),
    TypingStart(RoomId),
    TypingStop(RoomId),
    DomainEvent {
        room: RoomId,
        event: EventKind,
        payload: Value,
    },
    Ping,
}

impl ClientRequest {
    pub fn parse(text: &str) -> Result<Self, Error> {
        let frame: InboundFrame = serde_json::from_str(text)?;

        match frame.kind.as_str() {
            "join" | "join_room" | "join_conversation" | "join_post" => {
                Ok(ClientRequest::Join(frame.room()?))
            }
            "leave" | "leave_room" | "leave_conversation" | "leave_post" => {
                Ok(ClientRequest::Leave(frame.room()?))
            }
            "typing_start" => Ok(ClientRequest::TypingStart(frame.room()?)),
            "typing_stop" => Ok(ClientRequest::TypingStop(frame.room()?)),
            "domain_event" => {
                let room = frame.room()?;
                let data = frame.data.unwrap_or(Value::Null);
                let name = data.get("event").and_then(Value::as_str).ok_or_else(|| {
                    Error::protocol(
                        ProtocolErrorKind::MissingEvent,
                        "domain_event requires data.event",
                    )
                })?;
                let event = EventKind::relayable(name).ok_or_else(|| {
                    Error::protocol(
                        ProtocolErrorKind::UnrelayableEvent,
                        format!("event '{name}' cannot be relayed"),
                    )
                })?;
                let payload = data.get("payload").cloned().unwrap_or_else(|| json!({}));
                Ok(ClientRequest::DomainEvent {
                    room,
                    event,
                    payload,
                })
            }
            // Legacy comment relays carry the whole comment as `data`.
            "new_comment" | "comment_vote" => {
                let room = frame.room()?;
                let event = if frame.kind == "new_comment" {
                    EventKind::NewComment
                } else {
                    EventKind::CommentVoteUpdate
                };
                Ok(ClientRequest::DomainEvent {
                    room,
                    event,
                    payload: frame.data.unwrap_or_else(|| json!({})),
                })
            }
            "ping" => Ok(ClientRequest::Ping),
            other => Err(Error::protocol(
                ProtocolErrorKind::UnknownKind,
                format!("unrecognized kind '{other}'"),
            )),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ClientRequest::Join(_) => "join",
            ClientRequest::Leave(_) => "leave",
            ClientRequest::TypingStart(_) => "typing_start",
            ClientRequest::TypingStop(_) => "typing_stop",
            ClientRequest::DomainEvent { .. } => "domain_event",
            ClientRequest::Ping => "ping",
        }
    }
}

impl InboundFrame {
    /// Room named explicitly by `room_id`, or derived from the entity id in `data`.
    fn room(&self) -> Result<RoomId, Error> {
        if let Some(raw) = &self.room_id {
            return RoomId::parse(raw);
        }
        let data = self.data.as_ref();
        if let Some(id) = data.and_then(|d| entity_id(d, "conversation_id")) {
            return RoomId::parse(RoomId::conversation(id).as_str());
        }
        if let Some(id) = data.and_then(|d| entity_id(d, "post_id")) {
            return RoomId::parse(RoomId::post(id).as_str());
        }
        Err(Error::protocol(
            ProtocolErrorKind::MissingRoom,
            format!("'{}' requires room_id", self.kind),
        ))
    }
}

fn entity_id(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
