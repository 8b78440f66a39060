use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::account::{ActiveModel, Column, Entity as Account, Model};
use crate::entity::platform_type::PlatformType;
use crate::oauth1::Credentials;
use crate::sync::FeedKind;

use super::errors::{RepositoryError, Result, is_unique_violation};

/// Values needed to register a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub platform: PlatformType,
    pub username: String,
    pub credentials: Option<Credentials>,
    pub is_active: bool,
}

/// Register a new account. Usernames are unique per platform.
pub async fn create(db: &DatabaseConnection, new: NewAccount) -> Result<Model> {
    let now = Utc::now().fixed_offset();
    let credentials = new.credentials;
    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        platform: Set(new.platform),
        username: Set(new.username.clone()),
        identity_id: Set(None),
        consumer_key: Set(credentials.as_ref().map(|c| c.consumer_key.clone())),
        consumer_secret: Set(credentials.as_ref().map(|c| c.consumer_secret.clone())),
        access_token: Set(credentials.as_ref().map(|c| c.token.clone())),
        access_token_secret: Set(credentials.as_ref().map(|c| c.token_secret.clone())),
        is_active: Set(new.is_active),
        last_recent_id: Set(None),
        last_favorite_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    model.insert(db).await.map_err(|e| {
        if is_unique_violation(&e) {
            RepositoryError::invalid_input(format!(
                "account {} already exists on {}",
                new.username, new.platform
            ))
        } else {
            e.into()
        }
    })
}

pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> Result<Option<Model>> {
    Ok(Account::find_by_id(id).one(db).await?)
}

pub async fn find_by_username(
    db: &DatabaseConnection,
    platform: PlatformType,
    username: &str,
) -> Result<Option<Model>> {
    Ok(Account::find()
        .filter(Column::Platform.eq(platform))
        .filter(Column::Username.eq(username))
        .one(db)
        .await?)
}

/// All accounts, optionally limited to one platform, ordered by username.
pub async fn list(db: &DatabaseConnection, platform: Option<PlatformType>) -> Result<Vec<Model>> {
    let mut query = Account::find();
    if let Some(platform) = platform {
        query = query.filter(Column::Platform.eq(platform));
    }
    Ok(query
        .order_by_asc(Column::Platform)
        .order_by_asc(Column::Username)
        .all(db)
        .await?)
}

/// Active accounts of a platform, or just the named one if it is active.
pub async fn find_active(
    db: &DatabaseConnection,
    platform: PlatformType,
    username: Option<&str>,
) -> Result<Vec<Model>> {
    let mut query = Account::find()
        .filter(Column::Platform.eq(platform))
        .filter(Column::IsActive.eq(true));
    if let Some(username) = username {
        query = query.filter(Column::Username.eq(username));
    }
    Ok(query.order_by_asc(Column::Username).all(db).await?)
}

pub async fn set_active(db: &DatabaseConnection, id: Uuid, active: bool) -> Result<Model> {
    let model = ActiveModel {
        id: Set(id),
        is_active: Set(active),
        updated_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    };
    model.update(db).await.map_err(|e| match e {
        sea_orm::DbErr::RecordNotUpdated => RepositoryError::not_found_by_id("account", id),
        other => other.into(),
    })
}

/// Link an account to the identity it represents.
pub async fn set_identity(db: &DatabaseConnection, id: Uuid, identity_id: Uuid) -> Result<()> {
    let result = Account::update_many()
        .col_expr(Column::IdentityId, Expr::value(identity_id))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::Id.eq(id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(RepositoryError::not_found_by_id("account", id));
    }
    Ok(())
}

fn cursor_column(feed: FeedKind) -> Column {
    match feed {
        FeedKind::Recent => Column::LastRecentId,
        FeedKind::Favorites => Column::LastFavoriteId,
    }
}

/// Move a feed cursor forward to `high_water`.
///
/// The update is conditional: a cursor never moves backwards, even if a
/// concurrent writer got there first. Returns whether the stored value changed.
pub async fn advance_cursor(
    db: &DatabaseConnection,
    id: Uuid,
    feed: FeedKind,
    high_water: i64,
) -> Result<bool> {
    let column = cursor_column(feed);
    let result = Account::update_many()
        .col_expr(column, Expr::value(high_water))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(Column::Id.eq(id))
        .filter(
            Condition::any()
                .add(column.is_null())
                .add(column.lt(high_water)),
        )
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
