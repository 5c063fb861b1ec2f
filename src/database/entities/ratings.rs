use crate::database::DbResult;
use crate::utils::types::{Mmr, PlayerId};
use sea_orm::sea_query::OnConflict;
use sea_orm::{prelude::*, ActiveValue::Set, DatabaseConnection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

/// One rating row per (player, race) pair
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,
    pub player_id: PlayerId,
    pub race: RaceCode,
    pub mmr: Mmr,
    pub games_played: i32,
    pub games_won: i32,
    pub games_lost: i32,
    pub games_drawn: i32,
    pub last_played: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

/// Sub-game identity: the three Brood War races and the three
/// StarCraft 2 races form the closed race set
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum RaceCode {
    #[serde(rename = "bw_protoss")]
    #[sea_orm(string_value = "bw_protoss")]
    BwProtoss,
    #[serde(rename = "bw_terran")]
    #[sea_orm(string_value = "bw_terran")]
    BwTerran,
    #[serde(rename = "bw_zerg")]
    #[sea_orm(string_value = "bw_zerg")]
    BwZerg,
    #[serde(rename = "sc2_protoss")]
    #[sea_orm(string_value = "sc2_protoss")]
    Sc2Protoss,
    #[serde(rename = "sc2_terran")]
    #[sea_orm(string_value = "sc2_terran")]
    Sc2Terran,
    #[serde(rename = "sc2_zerg")]
    #[sea_orm(string_value = "sc2_zerg")]
    Sc2Zerg,
}

impl RaceCode {
    pub const ALL: [RaceCode; 6] = [
        RaceCode::BwProtoss,
        RaceCode::BwTerran,
        RaceCode::BwZerg,
        RaceCode::Sc2Protoss,
        RaceCode::Sc2Terran,
        RaceCode::Sc2Zerg,
    ];

    /// The stable wire/storage code for the race
    pub fn code(&self) -> &'static str {
        match self {
            RaceCode::BwProtoss => "bw_protoss",
            RaceCode::BwTerran => "bw_terran",
            RaceCode::BwZerg => "bw_zerg",
            RaceCode::Sc2Protoss => "sc2_protoss",
            RaceCode::Sc2Terran => "sc2_terran",
            RaceCode::Sc2Zerg => "sc2_zerg",
        }
    }
}

impl fmt::Display for RaceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for RaceCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RaceCode::ALL
            .into_iter()
            .find(|race| race.code() == s)
            .ok_or(())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::players::Entity",
        from = "Column::PlayerId",
        to = "super::players::Column::Id"
    )]
    Player,
}

impl Related<super::players::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Player.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Loads every rating row, used to build the in-memory frame at startup
    pub fn all(db: &DatabaseConnection) -> impl Future<Output = DbResult<Vec<Self>>> + Send + '_ {
        Entity::find().all(db)
    }

    /// Inserts or updates the row for (player, race); the unique index on
    /// that pair makes this the single authoritative write path for ratings
    pub fn upsert(
        db: &DatabaseConnection,
        model: Model,
    ) -> impl Future<Output = DbResult<()>> + Send + '_ {
        let insert = Entity::insert(ActiveModel {
            id: Set(model.id),
            player_id: Set(model.player_id),
            race: Set(model.race),
            mmr: Set(model.mmr),
            games_played: Set(model.games_played),
            games_won: Set(model.games_won),
            games_lost: Set(model.games_lost),
            games_drawn: Set(model.games_drawn),
            last_played: Set(model.last_played),
            created_at: Set(model.created_at),
        })
        .on_conflict(
            OnConflict::columns([Column::PlayerId, Column::Race])
                .update_columns([
                    Column::Mmr,
                    Column::GamesPlayed,
                    Column::GamesWon,
                    Column::GamesLost,
                    Column::GamesDrawn,
                    Column::LastPlayed,
                ])
                .to_owned(),
        )
        .exec(db);

        async move {
            insert.await?;
            Ok(())
        }
    }
}
