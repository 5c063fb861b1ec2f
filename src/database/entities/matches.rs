use super::ratings::RaceCode;
use crate::database::DbResult;
use crate::utils::types::{MatchId, PlayerId};
use sea_orm::{prelude::*, ActiveValue::Set, DatabaseConnection, QueryFilter, QuerySelect};
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Match row. `player_3`/`player_4` are schema hooks for team games;
/// the core only ever writes 1v1 rows and leaves them null.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "matches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: MatchId,
    pub player_1: PlayerId,
    pub player_2: PlayerId,
    pub player_3: Option<PlayerId>,
    pub player_4: Option<PlayerId>,
    pub race_1: RaceCode,
    pub race_2: RaceCode,
    /// Assigned map name from the active pool
    pub map: String,
    /// Assigned game server derived from both players' regions
    pub server: String,
    pub replay_1_hash: Option<String>,
    pub replay_1_uploaded_at: Option<DateTimeUtc>,
    pub replay_2_hash: Option<String>,
    pub replay_2_uploaded_at: Option<DateTimeUtc>,
    pub report_1: Option<ReportedResult>,
    pub report_2: Option<ReportedResult>,
    pub status: MatchStatus,
    pub delta_1: Option<i32>,
    pub delta_2: Option<i32>,
    pub played_at: DateTimeUtc,
}

/// A participant's self-reported outcome
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(8))")]
pub enum ReportedResult {
    #[serde(rename = "win")]
    #[sea_orm(string_value = "win")]
    Win,
    #[serde(rename = "loss")]
    #[sea_orm(string_value = "loss")]
    Loss,
    #[serde(rename = "draw")]
    #[sea_orm(string_value = "draw")]
    Draw,
    #[serde(rename = "abort")]
    #[sea_orm(string_value = "abort")]
    Abort,
}

/// Final match status. Rows never mutate once the status leaves
/// [MatchStatus::Pending].
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
pub enum MatchStatus {
    #[serde(rename = "pending")]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[serde(rename = "player_1_win")]
    #[sea_orm(string_value = "player_1_win")]
    Player1Win,
    #[serde(rename = "player_2_win")]
    #[sea_orm(string_value = "player_2_win")]
    Player2Win,
    #[serde(rename = "draw")]
    #[sea_orm(string_value = "draw")]
    Draw,
    #[serde(rename = "aborted")]
    #[sea_orm(string_value = "aborted")]
    Aborted,
    #[serde(rename = "conflict")]
    #[sea_orm(string_value = "conflict")]
    Conflict,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Loads the non-terminal matches, used to rebuild the in-memory
    /// frame at startup
    pub fn all_pending(
        db: &DatabaseConnection,
    ) -> impl Future<Output = DbResult<Vec<Self>>> + Send + '_ {
        Entity::find()
            .filter(Column::Status.eq(MatchStatus::Pending))
            .all(db)
    }

    /// The highest match ID ever issued, used to seed the allocator
    pub async fn max_id(db: &DatabaseConnection) -> DbResult<MatchId> {
        let max: Option<MatchId> = Entity::find()
            .select_only()
            .column_as(Column::Id.max(), "max_id")
            .into_tuple()
            .one(db)
            .await?
            .flatten();
        Ok(max.unwrap_or(0))
    }

    /// Inserts the freshly created pending match row
    pub fn create(
        db: &DatabaseConnection,
        model: Model,
    ) -> impl Future<Output = DbResult<Self>> + Send + '_ {
        ActiveModel {
            id: Set(model.id),
            player_1: Set(model.player_1),
            player_2: Set(model.player_2),
            player_3: Set(model.player_3),
            player_4: Set(model.player_4),
            race_1: Set(model.race_1),
            race_2: Set(model.race_2),
            map: Set(model.map),
            server: Set(model.server),
            replay_1_hash: Set(model.replay_1_hash),
            replay_1_uploaded_at: Set(model.replay_1_uploaded_at),
            replay_2_hash: Set(model.replay_2_hash),
            replay_2_uploaded_at: Set(model.replay_2_uploaded_at),
            report_1: Set(model.report_1),
            report_2: Set(model.report_2),
            status: Set(model.status),
            delta_1: Set(model.delta_1),
            delta_2: Set(model.delta_2),
            played_at: Set(model.played_at),
        }
        .insert(db)
    }

    /// Overwrites the mutable (pre-terminal) columns of a match row with
    /// the current mirror state
    pub fn update_row(
        db: &DatabaseConnection,
        model: Model,
    ) -> impl Future<Output = DbResult<()>> + Send + '_ {
        let update = Entity::update_many()
            .col_expr(Column::Replay1Hash, Expr::value(model.replay_1_hash))
            .col_expr(
                Column::Replay1UploadedAt,
                Expr::value(model.replay_1_uploaded_at),
            )
            .col_expr(Column::Replay2Hash, Expr::value(model.replay_2_hash))
            .col_expr(
                Column::Replay2UploadedAt,
                Expr::value(model.replay_2_uploaded_at),
            )
            .col_expr(Column::Report1, Expr::value(model.report_1))
            .col_expr(Column::Report2, Expr::value(model.report_2))
            .col_expr(Column::Status, Expr::value(model.status))
            .col_expr(Column::Delta1, Expr::value(model.delta_1))
            .col_expr(Column::Delta2, Expr::value(model.delta_2))
            .filter(Column::Id.eq(model.id))
            .exec(db);

        async move {
            update.await?;
            Ok(())
        }
    }
}
