use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, ToSchema, Serialize, Deserialize)]
#[sea_orm(table_name = "Posts")]
pub struct Model {
    #[sea_orm(primary_key, column_name = "PostID")]
    pub id: Id,
    #[sea_orm(column_name = "UsuarioID")]
    pub usuario_id: Id,
    #[sea_orm(column_name = "TipoPost")]
    pub tipo_post: String,
    #[sea_orm(column_name = "HabilidadID")]
    pub habilidad_id: Id,
    #[sea_orm(column_name = "Descripcion")]
    pub descripcion: String,
    #[sea_orm(column_name = "CreatedAt")]
    #[schema(value_type = String, format = DateTime)] // Applies to OpenAPI schema
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(column_name = "UpdatedAt")]
    #[schema(value_type = String, format = DateTime)] // Applies to OpenAPI schema
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
