use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Matches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Matches::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Matches::Player1).big_integer().not_null())
                    .col(ColumnDef::new(Matches::Player2).big_integer().not_null())
                    // Team-game hooks, unused by the 1v1 core
                    .col(ColumnDef::new(Matches::Player3).big_integer())
                    .col(ColumnDef::new(Matches::Player4).big_integer())
                    .col(ColumnDef::new(Matches::Race1).string_len(16).not_null())
                    .col(ColumnDef::new(Matches::Race2).string_len(16).not_null())
                    .col(ColumnDef::new(Matches::Map).string().not_null())
                    .col(ColumnDef::new(Matches::Server).string().not_null())
                    .col(ColumnDef::new(Matches::Replay1Hash).string_len(64))
                    .col(ColumnDef::new(Matches::Replay1UploadedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Matches::Replay2Hash).string_len(64))
                    .col(ColumnDef::new(Matches::Replay2UploadedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Matches::Report1).string_len(8))
                    .col(ColumnDef::new(Matches::Report2).string_len(8))
                    .col(ColumnDef::new(Matches::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Matches::Delta1).integer())
                    .col(ColumnDef::new(Matches::Delta2).integer())
                    .col(
                        ColumnDef::new(Matches::PlayedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-matches-status")
                    .table(Matches::Table)
                    .col(Matches::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .table(Matches::Table)
                    .name("idx-matches-status")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Matches::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Matches {
    Table,
    Id,
    #[iden = "player_1"]
    Player1,
    #[iden = "player_2"]
    Player2,
    #[iden = "player_3"]
    Player3,
    #[iden = "player_4"]
    Player4,
    #[iden = "race_1"]
    Race1,
    #[iden = "race_2"]
    Race2,
    Map,
    Server,
    #[iden = "replay_1_hash"]
    Replay1Hash,
    #[iden = "replay_1_uploaded_at"]
    Replay1UploadedAt,
    #[iden = "replay_2_hash"]
    Replay2Hash,
    #[iden = "replay_2_uploaded_at"]
    Replay2UploadedAt,
    #[iden = "report_1"]
    Report1,
    #[iden = "report_2"]
    Report2,
    Status,
    #[iden = "delta_1"]
    Delta1,
    #[iden = "delta_2"]
    Delta2,
    PlayedAt,
}
