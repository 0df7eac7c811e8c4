use crate::connection::{ConnectionId, DisconnectReason, Registration, UserId};
use crate::error::{Error, ProtocolErrorKind};
use crate::message::{Envelope, EventKind, EventType};
use crate::registry::RoomRegistry;
use crate::room::RoomId;
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use utoipa::ToSchema;

/// Requests the control loop accepts. The loop is the only place connection
/// and room state is read or written.
#[derive(Debug)]
enum Command {
    Register(Registration),
    Unregister {
        id: ConnectionId,
        reason: DisconnectReason,
    },
    Join {
        id: ConnectionId,
        room: RoomId,
    },
    Leave {
        id: ConnectionId,
        room: RoomId,
    },
    Broadcast(Envelope),
    Direct {
        id: ConnectionId,
        envelope: Envelope,
    },
    Status(oneshot::Sender<HubStatus>),
    Clients(oneshot::Sender<ClientsSnapshot>),
    Shutdown,
}

#[derive(Debug)]
struct ConnectionRecord {
    user_id: UserId,
    outbox: mpsc::Sender<Envelope>,
    closer: oneshot::Sender<DisconnectReason>,
    rooms: BTreeSet<RoomId>,
    connected_at: DateTime<Utc>,
}

/// Diagnostic snapshot of hub occupancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HubStatus {
    pub total_clients: usize,
    pub total_rooms: usize,
    /// Member count per room id.
    pub rooms_info: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClientInfo {
    pub id: String,
    pub user_id: String,
    pub rooms: Vec<String>,
    pub connected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClientsSnapshot {
    pub total_clients: usize,
    pub total_rooms: usize,
    pub clients: Vec<ClientInfo>,
}

/// The single coordinating actor. Owns every connection record and the room registry.
pub struct Hub {
    commands: mpsc::Receiver<Command>,
    connections: HashMap<ConnectionId, ConnectionRecord>,
    rooms: RoomRegistry,
}

/// Cloneable address of a running [`Hub`].
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
}

impl Hub {
    pub fn new(control_capacity: usize) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(control_capacity.max(1));
        (
            Self {
                commands: rx,
                connections: HashMap::new(),
                rooms: RoomRegistry::new(),
            },
            HubHandle { commands: tx },
        )
    }

    /// Processes commands one at a time until shut down or every handle is dropped,
    /// then tears down whatever connections remain.
    pub async fn run(mut self) {
        info!("Hub control loop started");
        while let Some(command) = self.commands.recv().await {
            if let Command::Shutdown = command {
                info!("Hub shutdown requested");
                break;
            }
            self.handle(command);
        }

        self.commands.close();
        let remaining: Vec<ConnectionId> = self.connections.keys().cloned().collect();
        for id in remaining {
            self.unregister(&id, DisconnectReason::ServerShutdown);
        }
        info!("Hub control loop stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register(registration) => self.register(registration),
            Command::Unregister { id, reason } => self.unregister(&id, reason),
            Command::Join { id, room } => self.join(&id, room),
            Command::Leave { id, room } => self.leave(&id, &room),
            Command::Broadcast(envelope) => self.broadcast(envelope),
            Command::Direct { id, envelope } => {
                if self.connections.contains_key(&id) && !self.deliver(&id, envelope) {
                    self.unregister(&id, DisconnectReason::Evicted);
                }
            }
            Command::Status(reply) => {
                let _ = reply.send(self.status());
            }
            Command::Clients(reply) => {
                let _ = reply.send(self.clients());
            }
            Command::Shutdown => {}
        }
    }

    fn register(&mut self, registration: Registration) {
        let Registration {
            id,
            user_id,
            outbox,
            closer,
        } = registration;

        self.connections.insert(
            id.clone(),
            ConnectionRecord {
                user_id: user_id.clone(),
                outbox,
                closer,
                rooms: BTreeSet::new(),
                connected_at: Utc::now(),
            },
        );
        info!(
            "Registered connection {id} for user {user_id}. Total connections: {}",
            self.connections.len()
        );

        if !self.deliver(&id, Envelope::connection_established(&id)) {
            self.unregister(&id, DisconnectReason::Evicted);
        }
    }

    /// Idempotent. Dropping the record's outbox closes the writer's queue.
    fn unregister(&mut self, id: &ConnectionId, reason: DisconnectReason) {
        let Some(record) = self.connections.remove(id) else {
            trace!("Ignoring unregister for unknown connection {id}");
            return;
        };

        for room in &record.rooms {
            self.rooms.remove_member(room, id);
        }
        let _ = record.closer.send(reason);

        match reason {
            DisconnectReason::Evicted => warn!(
                "Evicted unresponsive connection {id} (user {}). Total connections: {}",
                record.user_id,
                self.connections.len()
            ),
            _ => info!(
                "Unregistered connection {id} (user {}): {reason}. Total connections: {}",
                record.user_id,
                self.connections.len()
            ),
        }
    }

    fn join(&mut self, id: &ConnectionId, room: RoomId) {
        let Some(record) = self.connections.get_mut(id) else {
            debug!("Ignoring join of {room} for unknown connection {id}");
            return;
        };
        record.rooms.insert(room.clone());
        self.rooms.add_member(&room, id);
        debug!("Connection {id} joined {room}");

        if !self.deliver(id, Envelope::joined_room(&room)) {
            self.unregister(id, DisconnectReason::Evicted);
        }
    }

    fn leave(&mut self, id: &ConnectionId, room: &RoomId) {
        let Some(record) = self.connections.get_mut(id) else {
            return;
        };
        record.rooms.remove(room);
        self.rooms.remove_member(room, id);
        debug!("Connection {id} left {room}");

        if !self.deliver(id, Envelope::left_room(room)) {
            self.unregister(id, DisconnectReason::Evicted);
        }
    }

    fn broadcast(&mut self, envelope: Envelope) {
        let targets: Vec<ConnectionId> = match (&envelope.room_id, &envelope.origin) {
            (Some(room), Some(origin)) if !self.rooms.is_member(room, origin) => {
                let error = Envelope::error(
                    ProtocolErrorKind::NotMember,
                    &format!("join {room} before broadcasting to it"),
                    Some(room),
                );
                if !self.deliver(origin, error) {
                    self.unregister(&origin.clone(), DisconnectReason::Evicted);
                }
                return;
            }
            (Some(room), _) => self.rooms.members(room),
            (None, _) => self.connections.keys().cloned().collect(),
        };

        let mut unresponsive = Vec::new();
        for id in &targets {
            if !self.deliver(id, envelope.clone()) {
                unresponsive.push(id.clone());
            }
        }
        debug!(
            "Broadcast {} to {} connection(s) in {}",
            envelope.kind.event_type(),
            targets.len() - unresponsive.len(),
            envelope.room_id.as_ref().map_or("all", |room| room.as_str())
        );

        for id in unresponsive {
            self.unregister(&id, DisconnectReason::Evicted);
        }
    }

    /// Non-blocking enqueue. `false` means the connection can no longer keep up.
    fn deliver(&self, id: &ConnectionId, envelope: Envelope) -> bool {
        let Some(record) = self.connections.get(id) else {
            return true;
        };
        match record.outbox.try_send(envelope) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue full for connection {id}");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Outbound queue already closed for connection {id}");
                false
            }
        }
    }

    fn status(&self) -> HubStatus {
        HubStatus {
            total_clients: self.connections.len(),
            total_rooms: self.rooms.room_count(),
            rooms_info: self.rooms.member_counts(),
        }
    }

    fn clients(&self) -> ClientsSnapshot {
        let mut clients: Vec<ClientInfo> = self
            .connections
            .iter()
            .map(|(id, record)| ClientInfo {
                id: id.to_string(),
                user_id: record.user_id.clone(),
                rooms: record.rooms.iter().map(RoomId::to_string).collect(),
                connected_at: record.connected_at,
            })
            .collect();
        clients.sort_by(|a, b| a.connected_at.cmp(&b.connected_at).then(a.id.cmp(&b.id)));

        ClientsSnapshot {
            total_clients: self.connections.len(),
            total_rooms: self.rooms.room_count(),
            clients,
        }
    }
}

impl HubHandle {
    async fn send(&self, command: Command) -> Result<(), Error> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::hub_unavailable())
    }

    pub async fn register(&self, registration: Registration) -> Result<(), Error> {
        self.send(Command::Register(registration)).await
    }

    pub async fn unregister(
        &self,
        id: ConnectionId,
        reason: DisconnectReason,
    ) -> Result<(), Error> {
        self.send(Command::Unregister { id, reason }).await
    }

    pub async fn join(&self, id: ConnectionId, room: RoomId) -> Result<(), Error> {
        self.send(Command::Join { id, room }).await
    }

    pub async fn leave(&self, id: ConnectionId, room: RoomId) -> Result<(), Error> {
        self.send(Command::Leave { id, room }).await
    }

    pub async fn broadcast(&self, envelope: Envelope) -> Result<(), Error> {
        self.send(Command::Broadcast(envelope)).await
    }

    /// Delivers an envelope to one connection only.
    pub async fn send_to(&self, id: ConnectionId, envelope: Envelope) -> Result<(), Error> {
        self.send(Command::Direct { id, envelope }).await
    }

    /// Publish contract for upstream publishers. Fire-and-forget: no delivery
    /// confirmation, and a stopped hub is only logged.
    pub async fn publish(&self, room: RoomId, kind: EventKind, data: Value) {
        let envelope = Envelope::to_room(room, kind, data);
        if let Err(e) = self.broadcast(envelope).await {
            warn!("Dropping {} event: {e}", kind.event_type());
        }
    }

    /// Same as [`HubHandle::publish`] but addressed to every connection.
    pub async fn publish_all(&self, kind: EventKind, data: Value) {
        if let Err(e) = self.broadcast(Envelope::system(kind, data)).await {
            warn!("Dropping {} event: {e}", kind.event_type());
        }
    }

    pub async fn status(&self) -> Result<HubStatus, Error> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Status(tx)).await?;
        rx.await.map_err(|_| Error::hub_unavailable())
    }

    pub async fn clients(&self) -> Result<ClientsSnapshot, Error> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Clients(tx)).await?;
        rx.await.map_err(|_| Error::hub_unavailable())
    }

    pub async fn shutdown(&self) {
        if self.send(Command::Shutdown).await.is_err() {
            debug!("Hub already stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}
