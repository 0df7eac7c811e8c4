//! Typed parameters for endpoint inputs. Deserialization failures are rejected by
//! axum before a controller runs.

pub(crate) mod broadcast;
pub(crate) mod websocket;
