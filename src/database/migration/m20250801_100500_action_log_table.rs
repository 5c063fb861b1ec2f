use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActionLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActionLog::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ActionLog::PlayerId).big_integer().not_null())
                    .col(ColumnDef::new(ActionLog::Field).string().not_null())
                    .col(ColumnDef::new(ActionLog::OldValue).string())
                    .col(ColumnDef::new(ActionLog::NewValue).string())
                    .col(
                        ColumnDef::new(ActionLog::At)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActionLog::Source).string_len(8).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-action-log-player")
                    .table(ActionLog::Table)
                    .col(ActionLog::PlayerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .table(ActionLog::Table)
                    .name("idx-action-log-player")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(ActionLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ActionLog {
    Table,
    Id,
    PlayerId,
    Field,
    OldValue,
    NewValue,
    At,
    Source,
}
