use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use hub::{Error as HubError, ErrorKind as HubErrorKind, ProtocolErrorKind};

extern crate log;
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Hub(HubError),
    /// Missing or mismatched shared secret on the broadcast ingress.
    Forbidden,
    BadRequest(String),
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Hub(hub_error) => match hub_error.error_kind {
                HubErrorKind::Protocol(protocol_error_kind) => match protocol_error_kind {
                    ProtocolErrorKind::Malformed
                    | ProtocolErrorKind::UnknownKind
                    | ProtocolErrorKind::MissingRoom
                    | ProtocolErrorKind::MissingEvent
                    | ProtocolErrorKind::UnsupportedFrame => {
                        (StatusCode::BAD_REQUEST, "BAD REQUEST").into_response()
                    }
                    ProtocolErrorKind::InvalidRoom | ProtocolErrorKind::UnrelayableEvent => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE ENTITY").into_response()
                    }
                    ProtocolErrorKind::FrameTooLarge => {
                        (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD TOO LARGE").into_response()
                    }
                    ProtocolErrorKind::NotMember | ProtocolErrorKind::Forbidden => {
                        (StatusCode::FORBIDDEN, "FORBIDDEN").into_response()
                    }
                },
                HubErrorKind::Authorization => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN").into_response()
                }
                HubErrorKind::HubUnavailable => {
                    warn!("Hub control loop is not running");
                    (StatusCode::SERVICE_UNAVAILABLE, "SERVICE UNAVAILABLE").into_response()
                }
            },
            Error::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN").into_response(),
            Error::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        }
    }
}

impl From<HubError> for Error {
    fn from(err: HubError) -> Self {
        Error::Hub(err)
    }
}
