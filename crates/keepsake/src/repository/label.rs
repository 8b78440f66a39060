use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::label::{ActiveModel, Column, Entity as Label, Model, slugify};

use super::errors::{RepositoryError, Result, is_unique_violation};

pub async fn find_by_slug(db: &DatabaseConnection, slug: &str) -> Result<Option<Model>> {
    Ok(Label::find().filter(Column::Slug.eq(slug)).one(db).await?)
}

/// Slug for a raw label. Labels made only of punctuation keep their
/// lowercased text so they still get a stable key.
pub fn label_slug(raw: &str) -> Option<String> {
    let slug = slugify(raw);
    if !slug.is_empty() {
        return Some(slug);
    }
    let trimmed = raw.trim().to_lowercase();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Find the label for `raw` by slug, creating it if needed.
///
/// A concurrent insert of the same slug is resolved by re-reading the
/// existing row instead of failing.
pub async fn get_or_create(db: &DatabaseConnection, raw: &str) -> Result<Model> {
    let slug = label_slug(raw)
        .ok_or_else(|| RepositoryError::invalid_input("label value is empty"))?;

    if let Some(existing) = find_by_slug(db, &slug).await? {
        return Ok(existing);
    }

    let model = ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(slug.clone()),
        name: Set(raw.trim().to_string()),
        created_at: Set(Utc::now().fixed_offset()),
    };
    match model.insert(db).await {
        Ok(created) => Ok(created),
        Err(e) if is_unique_violation(&e) => find_by_slug(db, &slug)
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                context: format!("label slug={slug}"),
            }),
        Err(e) => Err(e.into()),
    }
}

#[cfg(all(test, feature = "sqlite", feature = "migrate"))]
mod tests {
    use super::*;
    use crate::connect_and_migrate;

    #[test]
    fn label_slug_falls_back_for_punctuation() {
        assert_eq!(label_slug("Sun Set").as_deref(), Some("sunset"));
        assert_eq!(label_slug(":-)").as_deref(), Some(":-)"));
        assert_eq!(label_slug("   "), None);
    }

    #[tokio::test]
    async fn differently_cased_labels_share_a_row() {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        let first = get_or_create(&db, "Sunset").await.unwrap();
        let second = get_or_create(&db, "sun set").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Sunset");
    }

    #[tokio::test]
    async fn empty_label_is_invalid() {
        let db = connect_and_migrate("sqlite::memory:").await.unwrap();
        let err = get_or_create(&db, "").await.unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidInput { .. }));
    }
}
