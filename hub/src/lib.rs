//! Real-time WebSocket hub: rooms, fan-out and typing indicators.
//!
//! # Architecture
//!
//! - **Hub actor**: one control loop ([`Hub::run`]) owns every connection record and
//!   the [`registry::RoomRegistry`]. Everything else talks to it through a cloneable
//!   [`HubHandle`]; nothing shares the maps behind a lock.
//! - **Sessions**: each client gets a reader loop and a writer task
//!   ([`session::Session`]) joined by a bounded outbound queue. The hub only ever
//!   `try_send`s into that queue, so a slow client is evicted instead of stalling
//!   everyone else.
//! - **Rooms**: `conversation:{id}` and `post:{id}`, created on first join and
//!   removed with their last member.
//! - **Ephemeral delivery**: at-most-once to whoever is connected when the hub
//!   processes the broadcast. No persistence and no replay on reconnect.
//!
//! # Message Flow
//!
//! 1. Client connects to `/ws?user_id=..`; the session registers with the hub and
//!    receives `connection_established`.
//! 2. Client sends `{"kind":"join","room_id":"conversation:42"}`; the session asks
//!    the [`RoomAuthorizer`] and, if allowed, the hub adds the membership and
//!    replies `joined_room`.
//! 3. An upstream publisher commits a domain change and publishes an
//!    `events::DomainEvent`; [`HubEventHandler`] turns it into a room broadcast.
//! 4. The hub enqueues the envelope on every member's queue; writers flush to
//!    their sockets independently.
//!
//! # Modules
//!
//! - `authorization`: the `CanJoin` collaborator seam
//! - `connection`: connection ids, lifecycle states, disconnect reasons
//! - `domain_event_handler`: domain event -> room broadcast
//! - `error`: hub error types
//! - `manager`: the Hub control loop and its handle
//! - `message`: wire envelopes and inbound request decoding
//! - `registry`: room -> members mapping
//! - `room`: room identifiers
//! - `session`: per-connection reader/writer loops

pub mod authorization;
pub mod connection;
pub mod domain_event_handler;
pub mod error;
pub mod manager;
pub mod message;
pub mod registry;
pub mod room;
pub mod session;

pub use authorization::RoomAuthorizer;
pub use connection::{ConnectionId, DisconnectReason, UserId};
pub use domain_event_handler::HubEventHandler;
pub use error::{Error, ErrorKind, ProtocolErrorKind};
pub use manager::{ClientInfo, ClientsSnapshot, Hub, HubHandle, HubStatus};
pub use message::{Envelope, EventKind, EventType};
pub use room::{RoomId, RoomScope};
pub use session::{CloseFrame, Frame, Session, SessionSettings};
