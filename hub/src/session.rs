//! One client connection: a reader loop running in the caller's task and a
//! writer task, joined by the bounded outbound queue the hub fills.
//!
//! The loops speak [`Frame`], not a concrete WebSocket type, so the web layer
//! adapts its socket and tests drive sessions with plain channels.

use crate::authorization::RoomAuthorizer;
use crate::connection::{
    ConnectionId, ConnectionState, DisconnectReason, Outbound, Registration, UserId,
};
use crate::error::{Error, ErrorKind, ProtocolErrorKind};
use crate::manager::HubHandle;
use crate::message::{ClientRequest, Envelope};
use crate::room::RoomId;
use futures::{FutureExt, Sink, SinkExt, Stream, StreamExt};
use log::*;
use std::fmt::Display;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

/// Keepalive periods below this are raised to it; a zero period cannot tick.
pub const MIN_PING_INTERVAL: Duration = Duration::from_millis(1);

/// Transport-level frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseFrame>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl Frame {
    fn close(reason: DisconnectReason) -> Self {
        Frame::Close(Some(CloseFrame {
            code: reason.close_code(),
            reason: reason.to_string(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub outbound_queue_capacity: usize,
    /// Reader gives up when nothing at all arrives for this long.
    pub idle_timeout: Duration,
    /// Writer sends a ping when nothing else was written for this long.
    pub ping_interval: Duration,
    pub write_timeout: Duration,
    pub max_message_bytes: usize,
    pub authorization_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: 256,
            idle_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(54),
            write_timeout: Duration::from_secs(10),
            max_message_bytes: 512,
            authorization_timeout: Duration::from_millis(2000),
        }
    }
}

pub struct Session {
    hub: HubHandle,
    authorizer: Arc<dyn RoomAuthorizer>,
    settings: SessionSettings,
    user_id: UserId,
}

impl Session {
    pub fn new(
        hub: HubHandle,
        authorizer: Arc<dyn RoomAuthorizer>,
        settings: SessionSettings,
        user_id: UserId,
    ) -> Self {
        Self {
            hub,
            authorizer,
            settings,
            user_id,
        }
    }

    /// Drives the connection until either loop stops, then unregisters it.
    /// Returns why the connection ended.
    pub async fn run<St, Si, E>(self, stream: St, mut sink: Si) -> DisconnectReason
    where
        St: Stream<Item = Result<Frame, E>> + Unpin + Send,
        E: Display,
        Si: Sink<Frame> + Unpin + Send + 'static,
        Si::Error: Display + Send,
    {
        let mut state = ConnectionState::Connecting;
        let (registration, outbound) =
            Registration::new(self.user_id.clone(), self.settings.outbound_queue_capacity);
        let id = registration.id.clone();

        if let Err(e) = self.hub.register(registration).await {
            warn!("Rejecting connection for user {}: {e}", self.user_id);
            let _ = sink.send(Frame::close(DisconnectReason::ServerShutdown)).await;
            return DisconnectReason::ServerShutdown;
        }
        advance(&mut state, ConnectionState::Active, &id);

        let mut writer = tokio::spawn(write_loop(
            sink,
            outbound,
            self.settings.ping_interval,
            self.settings.write_timeout,
            id.clone(),
        ));
        let mut reader = Box::pin(AssertUnwindSafe(self.read_loop(stream, &id)).catch_unwind());

        let (reason, writer_done) = tokio::select! {
            result = &mut reader => {
                let reason = result.unwrap_or_else(|_| {
                    error!("Reader for connection {id} panicked");
                    DisconnectReason::Panicked
                });
                (reason, false)
            }
            result = &mut writer => {
                let reason = result.unwrap_or_else(|e| {
                    error!("Writer for connection {id} failed: {e}");
                    if e.is_panic() {
                        DisconnectReason::Panicked
                    } else {
                        DisconnectReason::WriteError
                    }
                });
                (reason, true)
            }
        };
        drop(reader);
        advance(&mut state, ConnectionState::Draining, &id);

        // Whichever loop stopped first, the hub forgets the connection exactly once.
        let _ = self.hub.unregister(id.clone(), reason).await;

        if !writer_done && timeout(self.settings.write_timeout, &mut writer).await.is_err() {
            debug!("Writer for connection {id} did not drain in time");
            writer.abort();
        }
        advance(&mut state, ConnectionState::Closed, &id);
        debug!("Connection {id} closed: {reason}");

        reason
    }

    async fn read_loop<St, E>(&self, mut stream: St, id: &ConnectionId) -> DisconnectReason
    where
        St: Stream<Item = Result<Frame, E>> + Unpin,
        E: Display,
    {
        loop {
            let frame = match timeout(self.settings.idle_timeout, stream.next()).await {
                Err(_) => return DisconnectReason::IdleTimeout,
                Ok(None) => return DisconnectReason::RemoteClosed,
                Ok(Some(Err(e))) => {
                    debug!("Read error on connection {id}: {e}");
                    return DisconnectReason::ReadError;
                }
                Ok(Some(Ok(frame))) => frame,
            };

            let handled = match frame {
                Frame::Text(text) if text.len() > self.settings.max_message_bytes => {
                    let error = Error::protocol(
                        ProtocolErrorKind::FrameTooLarge,
                        format!(
                            "frame exceeds {} bytes",
                            self.settings.max_message_bytes
                        ),
                    );
                    self.reject(id, &error, None).await
                }
                Frame::Text(text) => self.dispatch(id, &text).await,
                Frame::Binary(_) => {
                    let error = Error::protocol(
                        ProtocolErrorKind::UnsupportedFrame,
                        "binary frames are not supported",
                    );
                    self.reject(id, &error, None).await
                }
                Frame::Ping(_) | Frame::Pong(_) => {
                    trace!("Keepalive from connection {id}");
                    Ok(())
                }
                Frame::Close(_) => return DisconnectReason::RemoteClosed,
            };

            if let Err(e) = handled {
                warn!("Connection {id} lost the hub: {e}");
                return DisconnectReason::ServerShutdown;
            }
        }
    }

    /// Decodes one text frame and forwards the request to the hub.
    async fn dispatch(&self, id: &ConnectionId, text: &str) -> Result<(), Error> {
        let request = match ClientRequest::parse(text) {
            Ok(request) => request,
            Err(e) => return self.reject(id, &e, None).await,
        };
        trace!("Connection {id} sent {}", request.kind_name());

        match request {
            ClientRequest::Join(room) => self.join(id, room).await,
            ClientRequest::Leave(room) => self.hub.leave(id.clone(), room).await,
            ClientRequest::TypingStart(room) => {
                let envelope = Envelope::typing(&room, &self.user_id, true);
                self.hub.broadcast(envelope.with_origin(id.clone())).await
            }
            ClientRequest::TypingStop(room) => {
                let envelope = Envelope::typing(&room, &self.user_id, false);
                self.hub.broadcast(envelope.with_origin(id.clone())).await
            }
            ClientRequest::DomainEvent {
                room,
                event,
                payload,
            } => {
                let envelope = Envelope::to_room(room, event, payload);
                self.hub.broadcast(envelope.with_origin(id.clone())).await
            }
            ClientRequest::Ping => self.hub.send_to(id.clone(), Envelope::pong()).await,
        }
    }

    async fn join(&self, id: &ConnectionId, room: RoomId) -> Result<(), Error> {
        let lookup = timeout(
            self.settings.authorization_timeout,
            self.authorizer.can_join(&room, &self.user_id),
        )
        .await;

        let allowed = match lookup {
            Ok(Ok(allowed)) => allowed,
            Ok(Err(e)) => {
                warn!("Authorization lookup for {room} failed: {e}");
                false
            }
            Err(_) => {
                warn!("Authorization lookup for {room} timed out");
                false
            }
        };

        if allowed {
            self.hub.join(id.clone(), room).await
        } else {
            debug!("User {} denied access to {room}", self.user_id);
            let error = Error::protocol(
                ProtocolErrorKind::Forbidden,
                format!("not allowed to join {room}"),
            );
            self.reject(id, &error, Some(&room)).await
        }
    }

    /// Reports a rejected request back to the sender only.
    async fn reject(
        &self,
        id: &ConnectionId,
        error: &Error,
        room: Option<&RoomId>,
    ) -> Result<(), Error> {
        let kind = match error.error_kind {
            ErrorKind::Protocol(kind) => kind,
            _ => ProtocolErrorKind::Malformed,
        };
        debug!("Rejecting frame from connection {id}: {}", error.detail());
        self.hub
            .send_to(id.clone(), Envelope::error(kind, &error.detail(), room))
            .await
    }
}

async fn write_loop<Si>(
    mut sink: Si,
    mut outbound: Outbound,
    ping_interval: Duration,
    write_timeout: Duration,
    id: ConnectionId,
) -> DisconnectReason
where
    Si: Sink<Frame> + Unpin,
    Si::Error: Display,
{
    let ping_interval = ping_interval.max(MIN_PING_INTERVAL);
    let mut keepalive = interval_at(Instant::now() + ping_interval, ping_interval);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let frame = tokio::select! {
            next = outbound.outbox.recv() => match next {
                Some(envelope) => match envelope.to_json() {
                    Ok(text) => Frame::Text(text),
                    Err(e) => {
                        error!("Failed to serialize envelope for connection {id}: {e}");
                        continue;
                    }
                },
                None => break,
            },
            _ = keepalive.tick() => {
                trace!("Pinging connection {id}");
                Frame::Ping(Vec::new())
            }
        };

        match timeout(write_timeout, sink.send(frame)).await {
            Ok(Ok(())) => keepalive.reset(),
            Ok(Err(e)) => {
                debug!("Write error on connection {id}: {e}");
                return DisconnectReason::WriteError;
            }
            Err(_) => {
                debug!("Write to connection {id} timed out");
                return DisconnectReason::WriteError;
            }
        }
    }

    // The hub dropped the queue; it records why before doing so.
    let reason = outbound
        .closed
        .try_recv()
        .unwrap_or(DisconnectReason::ServerShutdown);
    if timeout(write_timeout, sink.send(Frame::close(reason)))
        .await
        .is_err()
    {
        debug!("Close frame to connection {id} timed out");
    }
    let _ = timeout(write_timeout, sink.close()).await;

    reason
}

fn advance(state: &mut ConnectionState, next: ConnectionState, id: &ConnectionId) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid transition {state:?} -> {next:?}"
    );
    trace!("Connection {id}: {state:?} -> {next:?}");
    *state = next;
}
