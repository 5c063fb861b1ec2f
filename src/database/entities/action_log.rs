use crate::database::DbResult;
use crate::utils::types::PlayerId;
use sea_orm::{prelude::*, ActiveValue::Set, DatabaseConnection};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Append-only audit of profile mutations: one row per changed field
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "action_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub player_id: PlayerId,
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub at: DateTimeUtc,
    pub source: ActionSource,
}

/// Who initiated the mutation
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(8))")]
pub enum ActionSource {
    #[serde(rename = "user")]
    #[sea_orm(string_value = "user")]
    User,
    #[serde(rename = "system")]
    #[sea_orm(string_value = "system")]
    System,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn append(
        db: &DatabaseConnection,
        player_id: PlayerId,
        field: String,
        old_value: Option<String>,
        new_value: Option<String>,
        at: DateTimeUtc,
        source: ActionSource,
    ) -> impl Future<Output = DbResult<Self>> + Send + '_ {
        ActiveModel {
            player_id: Set(player_id),
            field: Set(field),
            old_value: Set(old_value),
            new_value: Set(new_value),
            at: Set(at),
            source: Set(source),
            ..Default::default()
        }
        .insert(db)
    }

    /// Recent entries for a player, newest first
    pub fn for_player(
        db: &DatabaseConnection,
        player_id: PlayerId,
        limit: u64,
    ) -> impl Future<Output = DbResult<Vec<Self>>> + Send + '_ {
        use sea_orm::{QueryOrder, QuerySelect};
        Entity::find()
            .filter(Column::PlayerId.eq(player_id))
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(db)
    }
}
