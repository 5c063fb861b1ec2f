use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Players::Id)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Players::DisplayName).string().not_null())
                    .col(ColumnDef::new(Players::BattleTag).string())
                    .col(ColumnDef::new(Players::AltName1).string())
                    .col(ColumnDef::new(Players::AltName2).string())
                    .col(ColumnDef::new(Players::Country).string_len(2))
                    .col(ColumnDef::new(Players::Region).string_len(8))
                    .col(ColumnDef::new(Players::AcceptedTos).boolean().not_null())
                    .col(ColumnDef::new(Players::CompletedSetup).boolean().not_null())
                    .col(ColumnDef::new(Players::Activated).boolean().not_null())
                    .col(ColumnDef::new(Players::AbortQuota).integer().not_null())
                    .col(ColumnDef::new(Players::AbortMonth).integer().not_null())
                    .col(ColumnDef::new(Players::AcceptedTosDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Players::CompletedSetupDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Players::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Players::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Players::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Players {
    Table,
    Id,
    DisplayName,
    BattleTag,
    #[iden = "alt_name_1"]
    AltName1,
    #[iden = "alt_name_2"]
    AltName2,
    Country,
    Region,
    AcceptedTos,
    CompletedSetup,
    Activated,
    AbortQuota,
    AbortMonth,
    AcceptedTosDate,
    CompletedSetupDate,
    CreatedAt,
    UpdatedAt,
}
