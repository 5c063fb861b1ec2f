use crate::database::DbResult;
use crate::utils::types::PlayerId;
use sea_orm::sea_query::{Func, OnConflict};
use sea_orm::{
    prelude::*,
    ActiveValue::{NotSet, Set},
    DatabaseConnection, QueryFilter,
};
use serde::Serialize;
use std::future::Future;

/// Player profile row. The primary key is the immutable external user
/// ID handed to us by the chat platform, never generated locally.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "players")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: PlayerId,
    /// Display name shown on the ladder
    pub display_name: String,
    /// Secondary account tag (`name#digits`)
    pub battle_tag: Option<String>,
    pub alt_name_1: Option<String>,
    pub alt_name_2: Option<String>,
    /// Two letter ISO country code, or `XX`/`ZZ` for private
    pub country: Option<String>,
    /// Residential region code from the closed region set
    pub region: Option<String>,
    pub accepted_tos: bool,
    pub completed_setup: bool,
    pub activated: bool,
    /// Remaining aborts for the month recorded in `abort_month`
    pub abort_quota: i32,
    /// Months-since-epoch marker of the last quota reset
    pub abort_month: i32,
    /// Set once on the first ToS acceptance, never overwritten
    pub accepted_tos_date: Option<DateTimeUtc>,
    /// Set once on the first completed setup, never overwritten
    pub completed_setup_date: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ratings::Entity")]
    Ratings,
}

impl Related<super::ratings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Loads every player row, used to build the in-memory frame at startup
    pub fn all(db: &DatabaseConnection) -> impl Future<Output = DbResult<Vec<Self>>> + Send + '_ {
        Entity::find().all(db)
    }

    pub fn by_id(
        db: &DatabaseConnection,
        id: PlayerId,
    ) -> impl Future<Output = DbResult<Option<Self>>> + Send + '_ {
        Entity::find_by_id(id).one(db)
    }

    /// Inserts or replaces a full player row. The write-once date columns
    /// are coalesced with any existing value so a replayed job can never
    /// clear or rewrite them.
    pub async fn upsert(db: &DatabaseConnection, model: Model) -> DbResult<()> {
        let tos_date = model.accepted_tos_date;
        let setup_date = model.completed_setup_date;

        Entity::insert(ActiveModel {
            id: Set(model.id),
            display_name: Set(model.display_name),
            battle_tag: Set(model.battle_tag),
            alt_name_1: Set(model.alt_name_1),
            alt_name_2: Set(model.alt_name_2),
            country: Set(model.country),
            region: Set(model.region),
            accepted_tos: Set(model.accepted_tos),
            completed_setup: Set(model.completed_setup),
            activated: Set(model.activated),
            abort_quota: Set(model.abort_quota),
            abort_month: Set(model.abort_month),
            accepted_tos_date: Set(tos_date),
            completed_setup_date: Set(setup_date),
            created_at: Set(model.created_at),
            updated_at: Set(model.updated_at),
        })
        .on_conflict(
            OnConflict::column(Column::Id)
                .update_columns([
                    Column::DisplayName,
                    Column::BattleTag,
                    Column::AltName1,
                    Column::AltName2,
                    Column::Country,
                    Column::Region,
                    Column::AcceptedTos,
                    Column::CompletedSetup,
                    Column::Activated,
                    Column::AbortQuota,
                    Column::AbortMonth,
                    Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(db)
        .await?;

        // COALESCE(existing, new) keeps the first ever value
        Entity::update_many()
            .col_expr(
                Column::AcceptedTosDate,
                Func::coalesce([
                    Expr::col(Column::AcceptedTosDate).into(),
                    Expr::value(tos_date),
                ])
                .into(),
            )
            .col_expr(
                Column::CompletedSetupDate,
                Func::coalesce([
                    Expr::col(Column::CompletedSetupDate).into(),
                    Expr::value(setup_date),
                ])
                .into(),
            )
            .filter(Column::Id.eq(model.id))
            .exec(db)
            .await?;

        Ok(())
    }

    /// Creates the minimal row for a player seen for the first time
    pub fn create_minimal(
        db: &DatabaseConnection,
        id: PlayerId,
        display_name: String,
        abort_quota: i32,
        abort_month: i32,
        now: DateTimeUtc,
    ) -> impl Future<Output = DbResult<Self>> + Send + '_ {
        let model = ActiveModel {
            id: Set(id),
            display_name: Set(display_name),
            battle_tag: NotSet,
            alt_name_1: NotSet,
            alt_name_2: NotSet,
            country: NotSet,
            region: NotSet,
            accepted_tos: Set(false),
            completed_setup: Set(false),
            activated: Set(false),
            abort_quota: Set(abort_quota),
            abort_month: Set(abort_month),
            accepted_tos_date: NotSet,
            completed_setup_date: NotSet,
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(db)
    }
}
