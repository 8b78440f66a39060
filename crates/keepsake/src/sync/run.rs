//! Per-account run state: identity and item memos, recursion guards, and
//! the save path from canonical item to stored rows.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entity::account::Model as AccountModel;
use crate::entity::identity::Model as IdentityModel;
use crate::entity::item_kind::ItemKind;
use crate::media::MediaFetcher;
use crate::platform::{PlatformError, short_error_message};
use crate::repository::{favorite, identity, item, media};

use super::binding::{Normalizer, PlatformBinding};
use super::canonical::{CanonicalIdentity, CanonicalItem, CanonicalMedia, OwnerRef};
use super::cursor::PageSink;
use super::error::{ItemError, ItemFailure, SyncError};
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::reconcile;
use super::types::EngineConfig;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything a run borrows from its caller.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    pub db: &'a DatabaseConnection,
    pub config: &'a EngineConfig,
    /// `None` disables media and avatar downloads.
    pub media: Option<&'a dyn MediaFetcher>,
    pub on_progress: Option<&'a ProgressCallback>,
}

impl<'a> SyncContext<'a> {
    pub fn new(db: &'a DatabaseConnection, config: &'a EngineConfig) -> Self {
        Self {
            db,
            config,
            media: None,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_media(mut self, media: &'a dyn MediaFetcher) -> Self {
        self.media = Some(media);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: &'a ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }
}

type ItemKey = (ItemKind, String);

/// State for one account's run.
///
/// Identities are fetched at most once per run and items already saved in
/// this run are reused without recursing into them again.
pub struct SyncRun<'a> {
    ctx: SyncContext<'a>,
    normalizer: &'a dyn Normalizer,
    /// `None` for offline runs (archive import): nothing is fetched.
    remote: Option<&'a dyn PlatformBinding>,
    account: &'a AccountModel,
    /// Identity to record favorites for, when syncing the favorites feed.
    favoriter: Option<Uuid>,
    identities: HashMap<String, IdentityModel>,
    saved: HashMap<ItemKey, Uuid>,
    in_progress: HashSet<ItemKey>,
    failures: Vec<String>,
    /// Lowest id of a top-level record that failed in a way a later run may fix.
    retry_floor: Option<i64>,
}

impl<'a> SyncRun<'a> {
    /// A run that can fetch missing identities through `binding`.
    pub fn online(
        ctx: SyncContext<'a>,
        binding: &'a dyn PlatformBinding,
        account: &'a AccountModel,
    ) -> Self {
        Self::build(ctx, binding, Some(binding), account)
    }

    /// A run that only resolves identities from the store.
    pub fn offline(
        ctx: SyncContext<'a>,
        normalizer: &'a dyn Normalizer,
        account: &'a AccountModel,
    ) -> Self {
        Self::build(ctx, normalizer, None, account)
    }

    fn build(
        ctx: SyncContext<'a>,
        normalizer: &'a dyn Normalizer,
        remote: Option<&'a dyn PlatformBinding>,
        account: &'a AccountModel,
    ) -> Self {
        Self {
            ctx,
            normalizer,
            remote,
            account,
            favoriter: None,
            identities: HashMap::new(),
            saved: HashMap::new(),
            in_progress: HashSet::new(),
            failures: Vec::new(),
            retry_floor: None,
        }
    }

    /// Record every top-level item saved by this run as a favorite of `identity_id`.
    pub fn record_favorites_for(&mut self, identity_id: Uuid) {
        self.favoriter = Some(identity_id);
    }

    /// Cursor value that is safe to commit after a walk reaching `high_water`.
    ///
    /// Stays below every record that failed on a missing identity so that
    /// the next [`FetchMode::New`](super::types::FetchMode::New) run fetches
    /// it again.
    pub fn committable(&self, high_water: Option<i64>) -> Option<i64> {
        match (high_water, self.retry_floor) {
            (Some(hw), Some(floor)) => Some(hw.min(floor.saturating_sub(1))),
            (hw, _) => hw,
        }
    }

    pub fn into_failures(self) -> Vec<String> {
        self.failures
    }

    // ─── Pages ───────────────────────────────────────────────────────────────

    /// Normalize and save a page of raw records.
    ///
    /// Item-local failures are collected and the page continues; an
    /// account-fatal failure stops the page and is returned.
    pub async fn save_records(&mut self, records: Vec<Value>) -> Result<usize, SyncError> {
        let mut saved = 0;
        for raw in records {
            let canonical = match self.normalizer.normalize_item(&raw) {
                Ok(canonical) => canonical,
                Err(e) => {
                    let id = raw_external_id(&raw);
                    self.record_failure(&id, &e);
                    continue;
                }
            };
            let external_id = canonical.external_id.clone();

            match self.save_top_level(canonical).await {
                Ok(_) => saved += 1,
                Err(ItemFailure::Item(e)) => self.record_failure(&external_id, &e),
                Err(ItemFailure::Fatal(e)) => return Err(e),
            }
        }
        Ok(saved)
    }

    async fn save_top_level(&mut self, canonical: CanonicalItem) -> Result<Uuid, ItemFailure> {
        let id = self.save_item(canonical, 0).await?;
        if let Some(identity_id) = self.favoriter {
            favorite::add(self.ctx.db, identity_id, id).await?;
        }
        Ok(id)
    }

    fn record_failure(&mut self, external_id: &str, err: &ItemError) {
        if err.is_retryable()
            && let Ok(id) = external_id.parse::<i64>()
        {
            self.retry_floor = Some(self.retry_floor.map_or(id, |floor| floor.min(id)));
        }
        warn!(
            account = %self.account.label(),
            external_id,
            "item skipped: {err}"
        );
        emit(
            self.ctx.on_progress,
            SyncProgress::ItemFailed {
                external_id: external_id.to_string(),
                error: err.to_string(),
            },
        );
        self.failures.push(format!("{external_id}: {err}"));
    }

    // ─── Identities ──────────────────────────────────────────────────────────

    /// Upsert an identity payload, once per run per external id.
    pub async fn save_identity(
        &mut self,
        canonical: CanonicalIdentity,
    ) -> Result<IdentityModel, ItemFailure> {
        if let Some(known) = self.identities.get(&canonical.external_id) {
            return Ok(known.clone());
        }

        let avatar_url = canonical.avatar_url().map(str::to_string);
        let mut fields = canonical.fields;
        fields.platform = Set(self.normalizer.platform());
        fields.external_id = Set(canonical.external_id.clone());
        fields.fetch_time = Set(Utc::now().fixed_offset());

        let mut stored = identity::upsert(self.ctx.db, fields).await?.model;

        if stored.avatar_path.is_none()
            && let Some(url) = avatar_url
            && let Some(path) = self.download(&url, &["image/jpeg", "image/png", "image/gif"]).await
        {
            identity::set_avatar_path(self.ctx.db, stored.id, &path).await?;
            stored.avatar_path = Some(path);
        }

        self.identities
            .insert(canonical.external_id, stored.clone());
        Ok(stored)
    }

    /// Resolve an identity by external id: memo, then platform, then store.
    pub async fn resolve_identity(&mut self, external_id: &str) -> Result<IdentityModel, ItemFailure> {
        if let Some(known) = self.identities.get(external_id) {
            return Ok(known.clone());
        }

        let Some(remote) = self.remote else {
            let platform = self.normalizer.platform();
            return match identity::find_by_external_id(self.ctx.db, platform, external_id).await? {
                Some(stored) => {
                    self.identities
                        .insert(external_id.to_string(), stored.clone());
                    Ok(stored)
                }
                None => Err(ItemError::UnknownIdentity {
                    external_id: external_id.to_string(),
                }
                .into()),
            };
        };

        debug!(external_id, "fetching identity");
        let raw = match remote.fetch_identity(external_id).await {
            Ok(raw) => raw,
            Err(PlatformError::NotFound { .. }) => {
                return Err(ItemError::UnknownIdentity {
                    external_id: external_id.to_string(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        let canonical = self.normalizer.normalize_identity(&raw)?;
        let stored = self.save_identity(canonical).await?;
        emit(
            self.ctx.on_progress,
            SyncProgress::IdentityFetched {
                external_id: external_id.to_string(),
                username: stored.username.clone(),
            },
        );
        // The payload may carry a different id form; remember the requested one too.
        self.identities
            .insert(external_id.to_string(), stored.clone());
        Ok(stored)
    }

    async fn resolve_owner(&mut self, owner: OwnerRef) -> Result<IdentityModel, ItemFailure> {
        match owner {
            OwnerRef::Inline(canonical) => self.save_identity(canonical).await,
            OwnerRef::ById(external_id) => self.resolve_identity(&external_id).await,
        }
    }

    // ─── Items ───────────────────────────────────────────────────────────────

    /// Save an item and everything it references, nested items first.
    ///
    /// An item already saved in this run returns its stored id. Meeting an
    /// item that is still being saved further up the path is a cycle.
    pub fn save_item<'r>(
        &'r mut self,
        canonical: CanonicalItem,
        depth: usize,
    ) -> BoxFuture<'r, Result<Uuid, ItemFailure>> {
        Box::pin(async move {
            let key = canonical.key();
            if let Some(id) = self.saved.get(&key) {
                return Ok(*id);
            }
            if self.in_progress.contains(&key) {
                return Err(ItemError::Cycle {
                    external_id: canonical.external_id,
                }
                .into());
            }
            if depth > self.ctx.config.max_depth {
                return Err(ItemError::DepthExceeded {
                    external_id: canonical.external_id,
                    max_depth: self.ctx.config.max_depth,
                }
                .into());
            }

            self.in_progress.insert(key.clone());
            let result = self.write_item(canonical, depth).await;
            self.in_progress.remove(&key);

            if let Ok(id) = &result {
                self.saved.insert(key, *id);
            }
            result
        })
    }

    async fn write_item(&mut self, canonical: CanonicalItem, depth: usize) -> Result<Uuid, ItemFailure> {
        let CanonicalItem {
            external_id,
            kind,
            owner,
            mut fields,
            media,
            tags,
            quoted,
            reshared,
        } = canonical;

        let owner = self.resolve_owner(owner).await?;

        if let Some(quoted) = quoted {
            let id = self.save_item(*quoted, depth + 1).await?;
            fields.quoted_item_id = Set(Some(id));
        }
        if let Some(reshared) = reshared {
            let id = self.save_item(*reshared, depth + 1).await?;
            fields.reshared_item_id = Set(Some(id));
        }

        fields.platform = Set(self.normalizer.platform());
        fields.kind = Set(kind);
        fields.external_id = Set(external_id.clone());
        fields.owner_id = Set(owner.id);
        fields.fetch_time = Set(Utc::now().fixed_offset());

        let stored = item::upsert(self.ctx.db, fields).await?;
        emit(
            self.ctx.on_progress,
            SyncProgress::ItemSaved {
                external_id: external_id.clone(),
                created: stored.created,
            },
        );
        let item_model = stored.model;

        if let Some(media) = media {
            self.save_media(item_model.id, media).await?;
        }

        if let Some(tags) = tags {
            if self.remote.is_some() {
                for author in tags
                    .iter()
                    .map(|t| t.author_external_id.as_str())
                    .filter(|a| *a != owner.external_id)
                    .collect::<HashSet<_>>()
                {
                    // Unresolvable authors are reported by the reconciler.
                    match self.resolve_identity(author).await {
                        Ok(_) | Err(ItemFailure::Item(_)) => {}
                        Err(fatal) => return Err(fatal),
                    }
                }
            }
            let report = reconcile::reconcile(self.ctx.db, &item_model, &owner, &tags).await?;
            if report.changed() {
                debug!(
                    external_id,
                    added = report.added,
                    removed = report.removed,
                    "reconciled associations"
                );
            }
        }

        Ok(item_model.id)
    }

    async fn save_media(&mut self, item_id: Uuid, media: Vec<CanonicalMedia>) -> Result<(), ItemFailure> {
        let mut ids = Vec::with_capacity(media.len());
        for attachment in media {
            let CanonicalMedia {
                external_id,
                kind,
                mut fields,
            } = attachment;
            fields.platform = Set(self.normalizer.platform());
            fields.kind = Set(kind);
            fields.external_id = Set(external_id);
            fields.fetch_time = Set(Utc::now().fixed_offset());

            let stored = media::upsert(self.ctx.db, fields).await?.model;
            if stored.local_path.is_none() {
                let url = stored.best_video_url().unwrap_or_else(|| stored.url.clone());
                if let Some(path) = self.download(&url, kind.acceptable_content_types()).await {
                    media::set_local_path(self.ctx.db, stored.id, &path).await?;
                }
            }
            ids.push(stored.id);
        }
        media::attach(self.ctx.db, item_id, &ids).await?;
        Ok(())
    }

    /// Best-effort download. Failures are logged and swallowed.
    async fn download(&self, url: &str, acceptable: &[&str]) -> Option<String> {
        let fetcher = self.ctx.media?;
        match fetcher.download(url, acceptable).await {
            Ok(path) => Some(path.to_string_lossy().into_owned()),
            Err(e) => {
                let error = short_error_message(&e);
                warn!(url, "media download failed: {error}");
                emit(
                    self.ctx.on_progress,
                    SyncProgress::MediaDownloadFailed {
                        url: url.to_string(),
                        error,
                    },
                );
                None
            }
        }
    }
}

#[async_trait]
impl PageSink for SyncRun<'_> {
    async fn save_page(&mut self, records: Vec<Value>) -> Result<usize, SyncError> {
        self.save_records(records).await
    }
}

/// Best-effort id of a record that failed to normalize, for error messages.
fn raw_external_id(raw: &Value) -> String {
    ["id_str", "id"]
        .iter()
        .find_map(|key| match raw.get(*key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "<unknown>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_external_id_prefers_string_ids() {
        assert_eq!(raw_external_id(&json!({"id": 5, "id_str": "5"})), "5");
        assert_eq!(raw_external_id(&json!({"id": 7})), "7");
        assert_eq!(raw_external_id(&json!({"text": "?"})), "<unknown>");
    }
}
