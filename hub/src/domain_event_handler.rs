use crate::manager::HubHandle;
use crate::message::{EventKind, EventType};
use crate::room::RoomId;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use serde_json::{json, Value};

/// Handles domain events by publishing them into the room of the entity they belong to.
///
/// Messages go to `conversation:{id}`, comment events to `post:{id}`. Delivery is
/// fire-and-forget: the publisher never learns who received the event.
pub struct HubEventHandler {
    hub: HubHandle,
}

impl HubEventHandler {
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }
}

/// Room, kind and client payload for a domain event.
pub fn route(event: &DomainEvent) -> (RoomId, EventKind, Value) {
    match event {
        DomainEvent::MessageCreated {
            conversation_id,
            message,
        } => (
            RoomId::conversation(conversation_id),
            EventKind::NewMessage,
            message.clone(),
        ),
        DomainEvent::CommentCreated { post_id, comment } => (
            RoomId::post(post_id),
            EventKind::NewComment,
            comment.clone(),
        ),
        DomainEvent::CommentUpdated { post_id, comment } => (
            RoomId::post(post_id),
            EventKind::CommentUpdate,
            comment.clone(),
        ),
        DomainEvent::CommentVoteUpdated {
            post_id,
            comment_id,
            votes,
        } => {
            // Vote totals are flattened next to the ids clients key on.
            let mut data = json!({ "post_id": post_id, "comment_id": comment_id });
            if let (Some(data), Some(votes)) = (data.as_object_mut(), votes.as_object()) {
                for (key, value) in votes {
                    data.insert(key.clone(), value.clone());
                }
            }
            (RoomId::post(post_id), EventKind::CommentVoteUpdate, data)
        }
    }
}

#[async_trait]
impl EventHandler for HubEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        let (room, kind, data) = route(event);
        debug!("Publishing {} to {room}", kind.event_type());
        self.hub.publish(room, kind, data).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Registration;
    use crate::manager::Hub;
    use events::EventPublisher;
    use std::sync::Arc;

    #[test]
    fn routes_events_to_entity_rooms() {
        let (room, kind, data) = route(&DomainEvent::MessageCreated {
            conversation_id: 42,
            message: json!({"content": "hola"}),
        });
        assert_eq!(room, RoomId::conversation(42));
        assert_eq!(kind, EventKind::NewMessage);
        assert_eq!(data["content"], "hola");

        let (room, kind, _) = route(&DomainEvent::CommentUpdated {
            post_id: 7,
            comment: json!({}),
        });
        assert_eq!(room, RoomId::post(7));
        assert_eq!(kind, EventKind::CommentUpdate);
    }

    #[test]
    fn vote_totals_are_flattened() {
        let (room, kind, data) = route(&DomainEvent::CommentVoteUpdated {
            post_id: 7,
            comment_id: 3,
            votes: json!({"total_likes": 4, "total_dislikes": 1}),
        });
        assert_eq!(room, RoomId::post(7));
        assert_eq!(kind, EventKind::CommentVoteUpdate);
        assert_eq!(
            data,
            json!({"post_id": 7, "comment_id": 3, "total_likes": 4, "total_dislikes": 1})
        );
    }

    #[tokio::test]
    async fn published_event_reaches_room_members() {
        let (hub, handle) = Hub::new(16);
        tokio::spawn(hub.run());
        let (registration, mut outbound) = Registration::new("5".to_string(), 8);
        let id = registration.id.clone();
        handle.register(registration).await.unwrap();
        handle.join(id, RoomId::post(7)).await.unwrap();

        let publisher =
            EventPublisher::new().with_handler(Arc::new(HubEventHandler::new(handle.clone())));
        publisher
            .publish(DomainEvent::CommentCreated {
                post_id: 7,
                comment: json!({"comentario_id": 10}),
            })
            .await;

        let kinds: Vec<EventKind> = [
            outbound.outbox.recv().await.unwrap(),
            outbound.outbox.recv().await.unwrap(),
            outbound.outbox.recv().await.unwrap(),
        ]
        .into_iter()
        .map(|envelope| envelope.kind)
        .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::ConnectionEstablished,
                EventKind::JoinedRoom,
                EventKind::NewComment
            ]
        );
    }
}
