use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FirmConfig::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FirmConfig::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FirmConfig::Url).text().not_null())
                    .col(ColumnDef::new(FirmConfig::DbName).text().not_null())
                    .col(ColumnDef::new(FirmConfig::ApiUser).text().not_null())
                    .col(
                        ColumnDef::new(FirmConfig::EncryptedApiKey)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(FirmConfig::UpdatedAt).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clients::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Clients::Name).text().not_null())
                    .col(ColumnDef::new(Clients::Url).text().not_null())
                    .col(ColumnDef::new(Clients::DbName).text().not_null())
                    .col(ColumnDef::new(Clients::ApiUser).text().not_null())
                    .col(
                        ColumnDef::new(Clients::EncryptedApiKey)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Clients::IsPremiumTier)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Clients::ContactEmail).text())
                    .col(ColumnDef::new(Clients::CreatedAt).text().not_null())
                    .col(ColumnDef::new(Clients::UpdatedAt).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClientStatuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClientStatuses::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClientStatuses::ClientId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ClientStatuses::LastConnectionAttempt)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClientStatuses::ConnectionSuccessful)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(ClientStatuses::LastErrorMessage).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_client_statuses_client_id")
                            .from(ClientStatuses::Table, ClientStatuses::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(IndicatorSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IndicatorSnapshots::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(IndicatorSnapshots::ClientId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndicatorSnapshots::IndicatorName)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndicatorSnapshots::IndicatorValue)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndicatorSnapshots::ExtractionTimestamp)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IndicatorSnapshots::CollaboratorId)
                            .text()
                            .not_null()
                            .default("0"),
                    )
                    .col(
                        ColumnDef::new(IndicatorSnapshots::CollaboratorName)
                            .text()
                            .not_null()
                            .default("N/A"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_indicator_snapshots_client_id")
                            .from(IndicatorSnapshots::Table, IndicatorSnapshots::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_indicator_snapshots_client_id")
                    .table(IndicatorSnapshots::Table)
                    .col(IndicatorSnapshots::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_indicator_snapshots_extraction_timestamp")
                    .table(IndicatorSnapshots::Table)
                    .col(IndicatorSnapshots::ExtractionTimestamp)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_indicator_snapshots_indicator_name")
                    .table(IndicatorSnapshots::Table)
                    .col(IndicatorSnapshots::IndicatorName)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(IndicatorSnapshots::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClientStatuses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Clients::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FirmConfig::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Iden)]
enum FirmConfig {
    Table,
    Id,
    Url,
    DbName,
    ApiUser,
    EncryptedApiKey,
    UpdatedAt,
}

#[derive(Iden)]
enum Clients {
    Table,
    Id,
    Name,
    Url,
    DbName,
    ApiUser,
    EncryptedApiKey,
    IsPremiumTier,
    ContactEmail,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ClientStatuses {
    Table,
    Id,
    ClientId,
    LastConnectionAttempt,
    ConnectionSuccessful,
    LastErrorMessage,
}

#[derive(Iden)]
enum IndicatorSnapshots {
    Table,
    Id,
    ClientId,
    IndicatorName,
    IndicatorValue,
    ExtractionTimestamp,
    CollaboratorId,
    CollaboratorName,
}
