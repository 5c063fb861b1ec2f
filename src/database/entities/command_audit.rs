use crate::database::DbResult;
use crate::utils::types::PlayerId;
use sea_orm::{prelude::*, ActiveValue::Set, DatabaseConnection};
use serde::Serialize;
use std::future::Future;

/// One row per handled command invocation
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "command_audit")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub player_id: PlayerId,
    pub command: String,
    pub at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn append(
        db: &DatabaseConnection,
        player_id: PlayerId,
        command: String,
        at: DateTimeUtc,
    ) -> impl Future<Output = DbResult<Self>> + Send + '_ {
        ActiveModel {
            player_id: Set(player_id),
            command: Set(command),
            at: Set(at),
            ..Default::default()
        }
        .insert(db)
    }
}
