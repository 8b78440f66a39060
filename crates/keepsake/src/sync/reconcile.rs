//! Tag reconciliation: converge an item's stored associations to the remote set.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};
use uuid::Uuid;

use crate::entity::association::ActiveModel as AssociationActiveModel;
use crate::entity::identity::Model as IdentityModel;
use crate::entity::item::Model as ItemModel;
use crate::repository::{association, identity, label};

use super::canonical::RemoteAssociation;
use super::error::{ItemError, ItemFailure};

/// What a reconciliation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Make the stored associations of `item` equal `remote`, keyed by external id.
///
/// Stale rows are removed before new ones are added, so a run interrupted
/// by an unresolvable author still moves the stored set toward `remote`
/// and a rerun converges without duplicating rows. Remote entries repeating
/// an external id are collapsed to the first.
pub async fn reconcile(
    db: &DatabaseConnection,
    item: &ItemModel,
    owner: &IdentityModel,
    remote: &[RemoteAssociation],
) -> Result<ReconcileReport, ItemFailure> {
    let local_ids = association::external_ids(db, item.id).await?;

    let mut remote_by_id: BTreeMap<&str, &RemoteAssociation> = BTreeMap::new();
    for entry in remote {
        remote_by_id.entry(entry.external_id.as_str()).or_insert(entry);
    }

    let to_remove: BTreeSet<String> = local_ids
        .iter()
        .filter(|id| !remote_by_id.contains_key(id.as_str()))
        .cloned()
        .collect();
    let removed = association::delete_by_external_ids(db, item.id, &to_remove).await?;

    let mut added = 0;
    for (external_id, entry) in remote_by_id {
        if local_ids.contains(external_id) {
            continue;
        }

        let author_id = resolve_author(db, item, owner, entry).await?;
        let label = label::get_or_create(db, &entry.raw_value)
            .await
            .map_err(|e| match e {
                crate::repository::RepositoryError::InvalidInput { message } => {
                    ItemFailure::Item(ItemError::malformed(format!(
                        "association {external_id}: {message}"
                    )))
                }
                other => other.into(),
            })?;

        association::insert(
            db,
            AssociationActiveModel {
                id: Set(Uuid::new_v4()),
                item_id: Set(item.id),
                label_id: Set(label.id),
                author_id: Set(author_id),
                external_id: Set(external_id.to_string()),
                raw_value: Set(entry.raw_value.clone()),
                is_machine_tag: Set(entry.is_machine_tag),
                created_at: Set(Utc::now().fixed_offset()),
            },
        )
        .await?;
        added += 1;
    }

    Ok(ReconcileReport {
        added,
        removed: usize::try_from(removed).unwrap_or(usize::MAX),
    })
}

/// The owner is reused directly; any other author must already be stored.
async fn resolve_author(
    db: &DatabaseConnection,
    item: &ItemModel,
    owner: &IdentityModel,
    entry: &RemoteAssociation,
) -> Result<Uuid, ItemFailure> {
    if entry.author_external_id == owner.external_id {
        return Ok(owner.id);
    }
    match identity::find_by_external_id(db, item.platform, &entry.author_external_id).await? {
        Some(author) => Ok(author.id),
        None => Err(ItemError::UnknownAuthor {
            item: item.external_id.clone(),
            association: entry.external_id.clone(),
            author: entry.author_external_id.clone(),
        }
        .into()),
    }
}
