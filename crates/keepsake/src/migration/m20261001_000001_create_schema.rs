//! Initial migration creating the archive schema.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_identities(manager).await?;
        self.create_accounts(manager).await?;
        self.create_items(manager).await?;
        self.create_media(manager).await?;
        self.create_labels(manager).await?;
        self.create_favorites(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            Favorites::Table.into_iden(),
            Associations::Table.into_iden(),
            Labels::Table.into_iden(),
            ItemMedia::Table.into_iden(),
            Media::Table.into_iden(),
            Items::Table.into_iden(),
            Accounts::Table.into_iden(),
            Identities::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

impl Migration {
    async fn create_identities(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Identities::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Identities::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Identities::Platform).string().not_null())
                    .col(ColumnDef::new(Identities::ExternalId).string().not_null())
                    // Profile
                    .col(ColumnDef::new(Identities::Username).string().not_null())
                    .col(ColumnDef::new(Identities::DisplayName).string().null())
                    .col(ColumnDef::new(Identities::Description).text().null())
                    .col(ColumnDef::new(Identities::Location).string().null())
                    .col(ColumnDef::new(Identities::Url).text().null())
                    .col(ColumnDef::new(Identities::AvatarUrl).text().null())
                    .col(ColumnDef::new(Identities::AvatarPath).text().null())
                    .col(
                        ColumnDef::new(Identities::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Identities::IsVerified)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // Counts
                    .col(ColumnDef::new(Identities::FollowersCount).integer().null())
                    .col(ColumnDef::new(Identities::FollowingCount).integer().null())
                    .col(ColumnDef::new(Identities::ItemsCount).integer().null())
                    .col(
                        ColumnDef::new(Identities::PostTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Identities::Raw).json().null())
                    .col(
                        ColumnDef::new(Identities::FetchTime)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key
        manager
            .create_index(
                Index::create()
                    .name("idx_identities_platform_external_id")
                    .table(Identities::Table)
                    .col(Identities::Platform)
                    .col(Identities::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_accounts(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::Platform).string().not_null())
                    .col(ColumnDef::new(Accounts::Username).string().not_null())
                    .col(ColumnDef::new(Accounts::IdentityId).uuid().null())
                    // Credentials
                    .col(ColumnDef::new(Accounts::ConsumerKey).string().null())
                    .col(ColumnDef::new(Accounts::ConsumerSecret).string().null())
                    .col(ColumnDef::new(Accounts::AccessToken).string().null())
                    .col(ColumnDef::new(Accounts::AccessTokenSecret).string().null())
                    .col(
                        ColumnDef::new(Accounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    // Cursors
                    .col(ColumnDef::new(Accounts::LastRecentId).big_integer().null())
                    .col(ColumnDef::new(Accounts::LastFavoriteId).big_integer().null())
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_accounts_identity")
                            .from(Accounts::Table, Accounts::IdentityId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_accounts_platform_username")
                    .table(Accounts::Table)
                    .col(Accounts::Platform)
                    .col(Accounts::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_items(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Items::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Items::Id).uuid().not_null().primary_key())
                    // Identity
                    .col(ColumnDef::new(Items::Platform).string().not_null())
                    .col(ColumnDef::new(Items::Kind).string().not_null())
                    .col(ColumnDef::new(Items::ExternalId).string().not_null())
                    .col(ColumnDef::new(Items::SortId).big_integer().not_null())
                    .col(ColumnDef::new(Items::OwnerId).uuid().not_null())
                    // Content
                    .col(ColumnDef::new(Items::Title).string().null())
                    .col(ColumnDef::new(Items::Text).text().null())
                    .col(ColumnDef::new(Items::Permalink).text().null())
                    .col(ColumnDef::new(Items::Source).string().null())
                    .col(ColumnDef::new(Items::Language).string().null())
                    .col(ColumnDef::new(Items::MediaType).string().null())
                    // Place
                    .col(ColumnDef::new(Items::Latitude).double().null())
                    .col(ColumnDef::new(Items::Longitude).double().null())
                    .col(ColumnDef::new(Items::PlaceName).string().null())
                    // Threading
                    .col(ColumnDef::new(Items::InReplyToExternalId).string().null())
                    .col(ColumnDef::new(Items::InReplyToUsername).string().null())
                    .col(ColumnDef::new(Items::QuotedItemId).uuid().null())
                    .col(ColumnDef::new(Items::ResharedItemId).uuid().null())
                    // Counts
                    .col(ColumnDef::new(Items::FavoriteCount).integer().null())
                    .col(ColumnDef::new(Items::ReshareCount).integer().null())
                    .col(ColumnDef::new(Items::CommentCount).integer().null())
                    .col(ColumnDef::new(Items::ViewCount).integer().null())
                    .col(
                        ColumnDef::new(Items::IsPrivate)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Items::PostTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Items::TakenTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Items::FetchTime)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Items::Raw).json().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_owner")
                            .from(Items::Table, Items::OwnerId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_quoted")
                            .from(Items::Table, Items::QuotedItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_items_reshared")
                            .from(Items::Table, Items::ResharedItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key
        manager
            .create_index(
                Index::create()
                    .name("idx_items_platform_kind_external_id")
                    .table(Items::Table)
                    .col(Items::Platform)
                    .col(Items::Kind)
                    .col(Items::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Owner timeline, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_items_owner_sort_id")
                    .table(Items::Table)
                    .col(Items::OwnerId)
                    .col((Items::SortId, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_media(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Media::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Media::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Media::Platform).string().not_null())
                    .col(ColumnDef::new(Media::Kind).string().not_null())
                    .col(ColumnDef::new(Media::ExternalId).string().not_null())
                    .col(ColumnDef::new(Media::Url).text().not_null())
                    .col(
                        ColumnDef::new(Media::UrlParts)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    .col(ColumnDef::new(Media::VideoVariants).json().null())
                    .col(ColumnDef::new(Media::Width).integer().null())
                    .col(ColumnDef::new(Media::Height).integer().null())
                    .col(ColumnDef::new(Media::DurationMs).big_integer().null())
                    .col(ColumnDef::new(Media::AltText).string().null())
                    .col(ColumnDef::new(Media::LocalPath).text().null())
                    .col(ColumnDef::new(Media::Raw).json().null())
                    .col(
                        ColumnDef::new(Media::FetchTime)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_platform_external_id")
                    .table(Media::Table)
                    .col(Media::Platform)
                    .col(Media::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ItemMedia::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ItemMedia::ItemId).uuid().not_null())
                    .col(ColumnDef::new(ItemMedia::MediaId).uuid().not_null())
                    .col(
                        ColumnDef::new(ItemMedia::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(ItemMedia::ItemId)
                            .col(ItemMedia::MediaId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_item_media_item")
                            .from(ItemMedia::Table, ItemMedia::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_item_media_media")
                            .from(ItemMedia::Table, ItemMedia::MediaId)
                            .to(Media::Table, Media::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_labels(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Labels::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Labels::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Labels::Slug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Labels::Name).string().not_null())
                    .col(
                        ColumnDef::new(Labels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Associations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Associations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Associations::ItemId).uuid().not_null())
                    .col(ColumnDef::new(Associations::LabelId).uuid().not_null())
                    .col(ColumnDef::new(Associations::AuthorId).uuid().not_null())
                    .col(
                        ColumnDef::new(Associations::ExternalId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Associations::RawValue).string().not_null())
                    .col(
                        ColumnDef::new(Associations::IsMachineTag)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Associations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_associations_item")
                            .from(Associations::Table, Associations::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_associations_label")
                            .from(Associations::Table, Associations::LabelId)
                            .to(Labels::Table, Labels::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_associations_author")
                            .from(Associations::Table, Associations::AuthorId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_associations_item_external_id")
                    .table(Associations::Table)
                    .col(Associations::ItemId)
                    .col(Associations::ExternalId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn create_favorites(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Favorites::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Favorites::IdentityId).uuid().not_null())
                    .col(ColumnDef::new(Favorites::ItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(Favorites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(Favorites::IdentityId)
                            .col(Favorites::ItemId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favorites_identity")
                            .from(Favorites::Table, Favorites::IdentityId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_favorites_item")
                            .from(Favorites::Table, Favorites::ItemId)
                            .to(Items::Table, Items::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "identities")]
enum Identities {
    Table,
    Id,
    Platform,
    ExternalId,
    Username,
    DisplayName,
    Description,
    Location,
    Url,
    AvatarUrl,
    AvatarPath,
    IsPrivate,
    IsVerified,
    FollowersCount,
    FollowingCount,
    ItemsCount,
    PostTime,
    Raw,
    FetchTime,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "accounts")]
enum Accounts {
    Table,
    Id,
    Platform,
    Username,
    IdentityId,
    ConsumerKey,
    ConsumerSecret,
    AccessToken,
    AccessTokenSecret,
    IsActive,
    LastRecentId,
    LastFavoriteId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "items")]
enum Items {
    Table,
    Id,
    Platform,
    Kind,
    ExternalId,
    SortId,
    OwnerId,
    Title,
    Text,
    Permalink,
    Source,
    Language,
    MediaType,
    Latitude,
    Longitude,
    PlaceName,
    InReplyToExternalId,
    InReplyToUsername,
    QuotedItemId,
    ResharedItemId,
    FavoriteCount,
    ReshareCount,
    CommentCount,
    ViewCount,
    IsPrivate,
    PostTime,
    TakenTime,
    FetchTime,
    Raw,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "media")]
enum Media {
    Table,
    Id,
    Platform,
    Kind,
    ExternalId,
    Url,
    UrlParts,
    VideoVariants,
    Width,
    Height,
    DurationMs,
    AltText,
    LocalPath,
    Raw,
    FetchTime,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "item_media")]
enum ItemMedia {
    Table,
    ItemId,
    MediaId,
    Position,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "labels")]
enum Labels {
    Table,
    Id,
    Slug,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "associations")]
enum Associations {
    Table,
    Id,
    ItemId,
    LabelId,
    AuthorId,
    ExternalId,
    RawValue,
    IsMachineTag,
    CreatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "favorites")]
enum Favorites {
    Table,
    IdentityId,
    ItemId,
    CreatedAt,
}
