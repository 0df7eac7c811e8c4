use super::error::Error;
use entity::conversations::{Column, Entity};
use entity::Id;
use sea_orm::{entity::prelude::*, Condition, DatabaseConnection};

use log::*;

/// True when `user_id` is one of the two participants of a live conversation.
pub async fn is_participant(
    db: &DatabaseConnection,
    conversation_id: Id,
    user_id: Id,
) -> Result<bool, Error> {
    let conversation = Entity::find_by_id(conversation_id)
        .filter(Column::DeletedAt.is_null())
        .filter(
            Condition::any()
                .add(Column::User1Id.eq(user_id))
                .add(Column::User2Id.eq(user_id)),
        )
        .one(db)
        .await?;

    debug!(
        "User {user_id} participant of conversation {conversation_id}: {}",
        conversation.is_some()
    );

    Ok(conversation.is_some())
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use entity::conversations::Model;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn conversation(id: Id, user1_id: Id, user2_id: Id) -> Model {
        let now = chrono::Utc::now();
        Model {
            id,
            user1_id,
            user2_id,
            match_id: None,
            title: None,
            last_message_at: None,
            created_at: now.into(),
            updated_at: now.into(),
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn is_participant_returns_true_when_row_matches() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![conversation(42, 3, 8)]])
            .into_connection();

        assert!(is_participant(&db, 42, 8).await?);

        Ok(())
    }

    #[tokio::test]
    async fn is_participant_returns_false_without_row() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        assert!(!is_participant(&db, 42, 99).await?);

        Ok(())
    }

    #[tokio::test]
    async fn is_participant_excludes_soft_deleted_conversations() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        is_participant(&db, 42, 3).await?;

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        let sql = &log[0].statements()[0].sql;
        assert!(sql.contains(r#""DeletedAt" IS NULL"#), "{sql}");
        assert!(sql.contains(r#""User1ID""#) && sql.contains(r#""User2ID""#), "{sql}");

        Ok(())
    }
}
