//! Event system infrastructure for the SkillSwap realtime hub.
//!
//! This crate provides the event system that decouples the request/response
//! handlers that commit domain changes (messages, comments, votes) from the
//! realtime fan-out that notifies connected clients.
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing every business event the hub relays
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates (entity, hub, etc.),
//! avoiding circular dependencies. Entity data is carried as serialized JSON values.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A type alias that represents a persisted entity's id field data type.
/// This matches the definition in the entity crate to maintain compatibility.
pub type Id = i32;

/// Domain events that represent committed business-level changes.
///
/// Each event names the entity that scopes it (a conversation or a post) so the
/// realtime layer can derive the room to publish into. Entity data is carried as
/// `serde_json::Value` to avoid dependencies on the entity crate.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A chat message was stored in a conversation.
    MessageCreated {
        conversation_id: Id,
        /// Complete serialized message (id, sender_id, content, message_type, created_at).
        message: Value,
    },
    /// A comment (or reply) was added to a post.
    CommentCreated {
        post_id: Id,
        /// Complete serialized comment including author display fields and counters.
        comment: Value,
    },
    /// An existing comment was edited or deactivated.
    CommentUpdated { post_id: Id, comment: Value },
    /// Like/dislike totals for a comment changed.
    CommentVoteUpdated {
        post_id: Id,
        comment_id: Id,
        /// Current vote totals, e.g. `{"total_likes": 3, "total_dislikes": 1}`.
        votes: Value,
    },
}

impl DomainEvent {
    /// Wire name clients receive for this event.
    pub fn event_name(&self) -> &'static str {
        match self {
            DomainEvent::MessageCreated { .. } => "new_message",
            DomainEvent::CommentCreated { .. } => "new_comment",
            DomainEvent::CommentUpdated { .. } => "comment_update",
            DomainEvent::CommentVoteUpdated { .. } => "comment_vote_update",
        }
    }
}

/// Trait for handling domain events.
/// Implementations perform side effects like fanning out to connected clients
/// or notifying other processes.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish an event to all registered handlers.
    /// Handlers are called sequentially; each is responsible for absorbing its
    /// own failures so one misbehaving handler never blocks the others.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
