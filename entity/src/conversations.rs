use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A one-to-one chat between two users. Rows are soft deleted via `deleted_at`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, ToSchema, Serialize, Deserialize)]
#[sea_orm(table_name = "Conversations")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "id")]
    pub id: Id,
    #[sea_orm(column_name = "User1ID")]
    pub user1_id: Id,
    #[sea_orm(column_name = "User2ID")]
    pub user2_id: Id,
    #[sea_orm(column_name = "MatchID")]
    pub match_id: Option<Id>,
    #[sea_orm(column_name = "Title")]
    pub title: Option<String>,
    #[sea_orm(column_name = "LastMessageAt")]
    #[schema(value_type = Option<String>, format = DateTime)] // Applies to OpenAPI schema
    pub last_message_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_name = "CreatedAt")]
    #[schema(value_type = String, format = DateTime)] // Applies to OpenAPI schema
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(column_name = "UpdatedAt")]
    #[schema(value_type = String, format = DateTime)] // Applies to OpenAPI schema
    pub updated_at: DateTimeWithTimeZone,
    #[sea_orm(column_name = "DeletedAt")]
    #[schema(value_type = Option<String>, format = DateTime)] // Applies to OpenAPI schema
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
