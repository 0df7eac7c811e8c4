use crate::message::Envelope;
use std::fmt;
use tokio::sync::{mpsc, oneshot};

// Type alias for user IDs (web layer hands over the principal as a String)
pub type UserId = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of one connection: `Connecting -> Active -> Draining -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport accepted, not yet registered with the hub.
    Connecting,
    /// Registered; reader and writer loops running.
    Active,
    /// Teardown initiated, outbound queue closed, writer flushing what is left.
    Draining,
    /// Transport closed and removed from every room. Terminal.
    Closed,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Active)
                | (Connecting, Closed)
                | (Active, Draining)
                | (Draining, Closed)
        )
    }
}

/// Why a connection was torn down. Never propagated past the connection itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    RemoteClosed,
    IdleTimeout,
    ReadError,
    WriteError,
    /// Outbound queue overflowed or was found closed during delivery.
    Evicted,
    ServerShutdown,
    /// The connection's own processing panicked.
    Panicked,
}

impl DisconnectReason {
    /// WebSocket close code sent to the peer when the server closes the transport.
    pub fn close_code(&self) -> u16 {
        match self {
            DisconnectReason::RemoteClosed
            | DisconnectReason::ReadError
            | DisconnectReason::WriteError => 1000,
            DisconnectReason::IdleTimeout | DisconnectReason::ServerShutdown => 1001,
            DisconnectReason::Evicted => 1008,
            DisconnectReason::Panicked => 1011,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::RemoteClosed => "remote closed",
            DisconnectReason::IdleTimeout => "idle timeout",
            DisconnectReason::ReadError => "read error",
            DisconnectReason::WriteError => "write error",
            DisconnectReason::Evicted => "evicted: outbound queue overflow",
            DisconnectReason::ServerShutdown => "server shutdown",
            DisconnectReason::Panicked => "panicked",
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a session hands to the hub on register. The hub becomes the only
/// holder of `outbox`; dropping it is how the writer learns to stop.
#[derive(Debug)]
pub struct Registration {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub outbox: mpsc::Sender<Envelope>,
    pub closer: oneshot::Sender<DisconnectReason>,
}

/// The writer's half of a registration.
#[derive(Debug)]
pub struct Outbound {
    pub outbox: mpsc::Receiver<Envelope>,
    pub closed: oneshot::Receiver<DisconnectReason>,
}

impl Registration {
    pub fn new(user_id: UserId, capacity: usize) -> (Self, Outbound) {
        let (outbox, outbox_rx) = mpsc::channel(capacity.max(1));
        let (closer, closed) = oneshot::channel();
        (
            Self {
                id: ConnectionId::new(),
                user_id,
                outbox,
                closer,
            },
            Outbound {
                outbox: outbox_rx,
                closed,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn state_machine_only_moves_forward() {
        use ConnectionState::*;
        assert!(Connecting.can_transition_to(Active));
        assert!(Active.can_transition_to(Draining));
        assert!(Draining.can_transition_to(Closed));
        assert!(Connecting.can_transition_to(Closed));

        assert!(!Closed.can_transition_to(Active));
        assert!(!Closed.can_transition_to(Draining));
        assert!(!Draining.can_transition_to(Active));
        assert!(!Active.can_transition_to(Connecting));
    }

    #[test]
    fn close_codes_distinguish_eviction_from_normal_close() {
        assert_eq!(DisconnectReason::RemoteClosed.close_code(), 1000);
        assert_eq!(DisconnectReason::ServerShutdown.close_code(), 1001);
        assert_eq!(DisconnectReason::Evicted.close_code(), 1008);
        assert_eq!(DisconnectReason::Panicked.close_code(), 1011);
    }

    #[tokio::test]
    async fn dropping_the_registration_closes_the_outbox() {
        let (registration, mut outbound) = Registration::new("3".to_string(), 4);
        registration
            .outbox
            .try_send(Envelope::pong())
            .expect("queue has room");
        drop(registration);

        assert!(outbound.outbox.recv().await.is_some());
        assert!(outbound.outbox.recv().await.is_none());
        assert!(outbound.closed.try_recv().is_err());
    }
}
