use crate::connection::UserId;
use crate::error::Error;
use crate::room::RoomId;
use async_trait::async_trait;

/// Answers whether a principal may join a room. Consulted on every join attempt.
///
/// Implementations may hit a database; the session bounds each call with a
/// timeout and treats an `Err` or a timeout as denial.
#[async_trait]
pub trait RoomAuthorizer: Send + Sync {
    async fn can_join(&self, room: &RoomId, user_id: &UserId) -> Result<bool, Error>;
}
