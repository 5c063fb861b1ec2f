use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Replays::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Replays::Hash)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Replays::UploadedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Replays::UploaderId).big_integer().not_null())
                    .col(ColumnDef::new(Replays::DurationSecs).integer())
                    .col(ColumnDef::new(Replays::MapName).string())
                    .col(ColumnDef::new(Replays::Pointer).string().not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Replays::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Replays {
    Table,
    Hash,
    UploadedAt,
    UploaderId,
    DurationSecs,
    MapName,
    Pointer,
}
