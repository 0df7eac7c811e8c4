use super::error::Error;
use entity::posts::{Entity, Model};
use entity::Id;
use sea_orm::{entity::prelude::*, DatabaseConnection};

pub async fn find_by_id(db: &DatabaseConnection, id: Id) -> Result<Option<Model>, Error> {
    Ok(Entity::find_by_id(id).one(db).await?)
}

pub async fn exists(db: &DatabaseConnection, id: Id) -> Result<bool, Error> {
    Ok(find_by_id(db, id).await?.is_some())
}
