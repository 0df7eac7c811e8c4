use crate::error::{Error, ProtocolErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;

const CONVERSATION_PREFIX: &str = "conversation";
const POST_PREFIX: &str = "post";
const MAX_ROOM_ID_LEN: usize = 128;

/// Identifier of a room, derived from the domain entity it groups
/// subscribers around: `conversation:{id}` or `post:{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

/// The entity a room is scoped to, as understood by the authorization collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomScope<'a> {
    Conversation(&'a str),
    Post(&'a str),
    Other,
}

impl RoomId {
    pub fn conversation(id: impl fmt::Display) -> Self {
        Self(format!("{CONVERSATION_PREFIX}:{id}"))
    }

    pub fn post(id: impl fmt::Display) -> Self {
        Self(format!("{POST_PREFIX}:{id}"))
    }

    /// Validates a client- or publisher-supplied room id.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::protocol(
                ProtocolErrorKind::InvalidRoom,
                "room id must not be empty",
            ));
        }
        if raw.len() > MAX_ROOM_ID_LEN {
            return Err(Error::protocol(
                ProtocolErrorKind::InvalidRoom,
                format!("room id exceeds {MAX_ROOM_ID_LEN} characters"),
            ));
        }
        match raw.split_once(':') {
            Some((namespace, key))
                if !namespace.is_empty()
                    && !key.is_empty()
                    && !raw.chars().any(char::is_whitespace) =>
            {
                Ok(Self(raw.to_string()))
            }
            _ => Err(Error::protocol(
                ProtocolErrorKind::InvalidRoom,
                format!("room id '{raw}' must look like '<namespace>:<id>'"),
            )),
        }
    }

    pub fn scope(&self) -> RoomScope<'_> {
        match self.0.split_once(':') {
            Some((CONVERSATION_PREFIX, key)) => RoomScope::Conversation(key),
            Some((POST_PREFIX, key)) => RoomScope::Post(key),
            _ => RoomScope::Other,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
