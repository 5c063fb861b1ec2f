use sea_orm_migration::prelude::*;

use super::m20250801_100000_players_table::Players;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ratings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ratings::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ratings::PlayerId).big_integer().not_null())
                    .col(ColumnDef::new(Ratings::Race).string_len(16).not_null())
                    .col(ColumnDef::new(Ratings::Mmr).integer().not_null())
                    .col(ColumnDef::new(Ratings::GamesPlayed).integer().not_null())
                    .col(ColumnDef::new(Ratings::GamesWon).integer().not_null())
                    .col(ColumnDef::new(Ratings::GamesLost).integer().not_null())
                    .col(ColumnDef::new(Ratings::GamesDrawn).integer().not_null())
                    .col(ColumnDef::new(Ratings::LastPlayed).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Ratings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(Ratings::Table, Ratings::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .unique()
                    .name("idx-ratings-player-race")
                    .table(Ratings::Table)
                    .col(Ratings::PlayerId)
                    .col(Ratings::Race)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .table(Ratings::Table)
                    .name("idx-ratings-player-race")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Ratings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Ratings {
    Table,
    Id,
    PlayerId,
    Race,
    Mmr,
    GamesPlayed,
    GamesWon,
    GamesLost,
    GamesDrawn,
    LastPlayed,
    CreatedAt,
}
