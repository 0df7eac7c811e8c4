use crate::error::Error;
use crate::Id;
use async_trait::async_trait;
use entity_api::{conversation, post};
use hub::{RoomAuthorizer, RoomId, RoomScope, UserId};
use log::*;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Decides room membership from the SkillSwap database:
///
/// - `conversation:{id}`: only the two participants of a conversation that has not
///   been deleted.
/// - `post:{id}`: anyone, as long as the post exists.
/// - any other namespace: nobody.
pub struct DatabaseRoomAuthorizer {
    db: Arc<DatabaseConnection>,
}

impl DatabaseRoomAuthorizer {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

pub async fn can_join(db: &DatabaseConnection, room: &RoomId, user_id: &str) -> Result<bool, Error> {
    match room.scope() {
        RoomScope::Conversation(key) => {
            let (Some(conversation_id), Some(user_id)) = (parse_id(key), parse_id(user_id)) else {
                debug!("Non-numeric ids for {room}, denying user {user_id}");
                return Ok(false);
            };
            Ok(conversation::is_participant(db, conversation_id, user_id).await?)
        }
        RoomScope::Post(key) => match parse_id(key) {
            Some(post_id) => Ok(post::exists(db, post_id).await?),
            None => Ok(false),
        },
        RoomScope::Other => Ok(false),
    }
}

fn parse_id(raw: &str) -> Option<Id> {
    raw.parse::<Id>().ok().filter(|id| *id > 0)
}

#[async_trait]
impl RoomAuthorizer for DatabaseRoomAuthorizer {
    async fn can_join(&self, room: &RoomId, user_id: &UserId) -> Result<bool, hub::Error> {
        Ok(can_join(&self.db, room, user_id).await?)
    }
}
