use crate::database::DbResult;
use crate::utils::types::PlayerId;
use sea_orm::sea_query::OnConflict;
use sea_orm::{prelude::*, ActiveValue::Set, DatabaseConnection};
use serde::Serialize;
use std::future::Future;

/// Last queue choices per player: race set and map veto set, stored as
/// JSON arrays and replaced wholesale on every queue entry
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "preferences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub player_id: PlayerId,
    /// JSON array of race codes (1-2 elements)
    pub races: String,
    /// JSON array of vetoed map names (0-3 elements)
    pub vetoes: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn all(db: &DatabaseConnection) -> impl Future<Output = DbResult<Vec<Self>>> + Send + '_ {
        Entity::find().all(db)
    }

    pub fn upsert(
        db: &DatabaseConnection,
        model: Model,
    ) -> impl Future<Output = DbResult<()>> + Send + '_ {
        let insert = Entity::insert(ActiveModel {
            player_id: Set(model.player_id),
            races: Set(model.races),
            vetoes: Set(model.vetoes),
            updated_at: Set(model.updated_at),
        })
        .on_conflict(
            OnConflict::column(Column::PlayerId)
                .update_columns([Column::Races, Column::Vetoes, Column::UpdatedAt])
                .to_owned(),
        )
        .exec(db);

        async move {
            insert.await?;
            Ok(())
        }
    }
}
