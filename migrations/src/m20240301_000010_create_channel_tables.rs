use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Channels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Channels::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Channels::Name).string().not_null())
                    .col(ColumnDef::new(Channels::ChannelType).string().not_null())
                    .col(
                        ColumnDef::new(Channels::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Channels::DefaultExternalLocationRef)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(Channels::Config).json().null())
                    .col(
                        ColumnDef::new(Channels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Channels::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ChannelFeeds::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ChannelFeeds::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(ChannelFeeds::ChannelId).uuid().not_null())
                    .col(ColumnDef::new(ChannelFeeds::VariantId).uuid().not_null())
                    .col(
                        ColumnDef::new(ChannelFeeds::ExternalVariantRef)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChannelFeeds::ExternalInventoryItemRef)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ChannelFeeds::LastSyncedQty)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ChannelFeeds::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(ChannelFeeds::LastError).text().null())
                    .col(
                        ColumnDef::new(ChannelFeeds::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ChannelFeeds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChannelFeeds::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_channel_feeds_channel_variant")
                    .table(ChannelFeeds::Table)
                    .col(ChannelFeeds::ChannelId)
                    .col(ChannelFeeds::VariantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_channel_feeds_variant")
                    .table(ChannelFeeds::Table)
                    .col(ChannelFeeds::VariantId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChannelFeeds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Channels::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Channels {
    Table,
    Id,
    Name,
    ChannelType,
    IsActive,
    DefaultExternalLocationRef,
    Config,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ChannelFeeds {
    Table,
    Id,
    ChannelId,
    VariantId,
    ExternalVariantRef,
    ExternalInventoryItemRef,
    LastSyncedQty,
    LastSyncedAt,
    LastError,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
