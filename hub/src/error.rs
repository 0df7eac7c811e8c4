//! Error types for the `hub` crate.
//!
//! Follows the same pattern as the other layers: a root `Error` struct holding an
//! `error_kind` tree plus an optional `source` for error chaining. Transport failures
//! are absent: they are `DisconnectReason`s that tear a single
//! connection down and never travel further.

use std::error::Error as StdError;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in the hub.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The client sent something the hub cannot act on. Reported back as an
    /// `error` envelope; the connection stays open.
    Protocol(ProtocolErrorKind),
    /// The authorization collaborator failed to answer. Treated as denial.
    Authorization,
    /// The Hub control loop is no longer running.
    HubUnavailable,
}

/// Ways an inbound frame can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    Malformed,
    UnknownKind,
    MissingRoom,
    InvalidRoom,
    MissingEvent,
    UnrelayableEvent,
    NotMember,
    Forbidden,
    FrameTooLarge,
    UnsupportedFrame,
}

impl ProtocolErrorKind {
    /// Stable machine-readable code carried in `error` envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolErrorKind::Malformed => "malformed",
            ProtocolErrorKind::UnknownKind => "unknown_kind",
            ProtocolErrorKind::MissingRoom => "missing_room",
            ProtocolErrorKind::InvalidRoom => "invalid_room",
            ProtocolErrorKind::MissingEvent => "missing_event",
            ProtocolErrorKind::UnrelayableEvent => "unrelayable_event",
            ProtocolErrorKind::NotMember => "not_member",
            ProtocolErrorKind::Forbidden => "forbidden",
            ProtocolErrorKind::FrameTooLarge => "frame_too_large",
            ProtocolErrorKind::UnsupportedFrame => "unsupported_frame",
        }
    }
}

impl Error {
    pub fn protocol(kind: ProtocolErrorKind, message: impl Into<String>) -> Self {
        Error {
            source: Some(message.into().into()),
            error_kind: ErrorKind::Protocol(kind),
        }
    }

    pub fn authorization(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Error {
            source: Some(source.into()),
            error_kind: ErrorKind::Authorization,
        }
    }

    pub fn hub_unavailable() -> Self {
        Error {
            source: None,
            error_kind: ErrorKind::HubUnavailable,
        }
    }

    /// Human readable detail, used as the `message` of an `error` envelope.
    pub fn detail(&self) -> String {
        match &self.source {
            Some(source) => source.to_string(),
            None => self.to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Protocol(kind) => write!(f, "Protocol error: {}", kind.code()),
            ErrorKind::Authorization => write!(f, "Authorization lookup failed"),
            ErrorKind::HubUnavailable => write!(f, "Hub is not running"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Protocol(ProtocolErrorKind::Malformed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_detail_is_the_message() {
        let err = Error::protocol(ProtocolErrorKind::MissingRoom, "room_id is required");
        assert_eq!(
            err.error_kind,
            ErrorKind::Protocol(ProtocolErrorKind::MissingRoom)
        );
        assert_eq!(err.detail(), "room_id is required");
    }

    #[test]
    fn malformed_json_maps_to_protocol_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: Error = parse_err.into();
        assert_eq!(
            err.error_kind,
            ErrorKind::Protocol(ProtocolErrorKind::Malformed)
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn hub_unavailable_has_no_source() {
        let err = Error::hub_unavailable();
        assert!(err.source.is_none());
        assert_eq!(err.detail(), "Hub is not running");
    }
}
