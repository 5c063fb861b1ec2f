use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CommandAudit::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CommandAudit::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CommandAudit::PlayerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CommandAudit::Command).string().not_null())
                    .col(
                        ColumnDef::new(CommandAudit::At)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CommandAudit::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CommandAudit {
    Table,
    Id,
    PlayerId,
    Command,
    At,
}
