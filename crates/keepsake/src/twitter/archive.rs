//! Offline import of a downloaded Twitter archive.
//!
//! Two layouts are understood:
//! - current exports: `data/account.js`, `data/profile.js` and
//!   `data/tweets.js` / `data/tweet.js` / `data/tweets-partN.js`, each a
//!   `window.YTD.<name>.partN = [...]` fragment;
//! - legacy exports: `data/js/user_details.js` and one
//!   `data/js/tweets/YYYY_MM.js` per month (`Grailbird.data.tweets_YYYY_MM = [...]`).
//!
//! Records go through the same normalize, upsert and reconcile path as a
//! live sync, but nothing is fetched: an identity that is not in the
//! archive or the store is an item-local error.

use std::path::Path;

use serde_json::{Map, Value, json};
use tracing::{info, instrument};

use crate::archive::{ArchiveError, list_files, read_fragment};
use crate::entity::account::Model as AccountModel;
use crate::entity::platform_type::PlatformType;
use crate::platform::convert::{i64_at, path};
use crate::repository::{account, identity};
use crate::sync::{
    FeedKind, ItemFailure, Normalizer, SyncContext, SyncError, SyncOutcome, SyncProgress,
    SyncRun, emit,
};

use super::convert::TwitterNormalizer;

/// Import every tweet in the archive rooted at `root` for `account`.
#[instrument(skip_all, fields(account = %account.label(), root = %root.display()))]
pub async fn import_archive(
    ctx: SyncContext<'_>,
    account: &AccountModel,
    root: &Path,
) -> Result<SyncOutcome, SyncError> {
    if account.platform != PlatformType::Twitter {
        return Err(SyncError::Unsupported {
            platform: account.platform,
            operation: "archive import".to_string(),
        });
    }

    let label = account.label();
    let normalizer = TwitterNormalizer;
    let mut run = SyncRun::offline(ctx, &normalizer, account);

    let owner_external_id = match read_account_user(root).await? {
        Some(user) => {
            let canonical = normalizer
                .normalize_identity(&user)
                .map_err(|e| ArchiveError::Format {
                    path: root.join("data"),
                    message: e.to_string(),
                })?;
            let owner = match run.save_identity(canonical).await {
                Ok(owner) => owner,
                Err(ItemFailure::Fatal(e)) => return Err(e),
                Err(ItemFailure::Item(e)) => {
                    return Err(ArchiveError::Format {
                        path: root.join("data"),
                        message: e.to_string(),
                    }
                    .into());
                }
            };
            if account.identity_id != Some(owner.id) {
                account::set_identity(ctx.db, account.id, owner.id).await?;
            }
            owner.external_id
        }
        None => {
            let linked = match account.identity_id {
                Some(id) => identity::find_by_id(ctx.db, id).await?,
                None => None,
            };
            linked
                .map(|owner| owner.external_id)
                .ok_or_else(|| ArchiveError::MissingAccount {
                    path: root.to_path_buf(),
                })?
        }
    };

    let files = tweet_files(root).await?;
    if files.is_empty() {
        return Err(ArchiveError::Empty {
            path: root.to_path_buf(),
        }
        .into());
    }

    let batch = usize::try_from(ctx.config.batch_size.max(1)).unwrap_or(usize::MAX);
    let mut total = 0;
    let mut high_water: Option<i64> = None;

    for (index, file) in files.iter().enumerate() {
        let records = archive_records(file, &owner_external_id).await?;
        for record in &records {
            if let Some(id) = i64_at(record, "id_str").or_else(|| i64_at(record, "id")) {
                high_water = Some(high_water.map_or(id, |hw| hw.max(id)));
            }
        }

        total += records.len();
        emit(
            ctx.on_progress,
            SyncProgress::FetchedPage {
                account: label.clone(),
                page: u32::try_from(index + 1).unwrap_or(u32::MAX),
                count: records.len(),
                total_so_far: total,
            },
        );

        let mut records = records.into_iter().peekable();
        while records.peek().is_some() {
            let chunk: Vec<Value> = records.by_ref().take(batch).collect();
            run.save_records(chunk).await?;
        }
    }

    if let Some(high_water) = run.committable(high_water)
        && account::advance_cursor(ctx.db, account.id, FeedKind::Recent, high_water).await?
    {
        emit(
            ctx.on_progress,
            SyncProgress::CursorAdvanced {
                account: label.clone(),
                feed: FeedKind::Recent.to_string(),
                high_water,
            },
        );
    }

    let errors = run.into_failures();
    info!(items = total, errors = errors.len(), "archive imported");
    Ok(SyncOutcome {
        account_id: account.id,
        account: label,
        success: true,
        items_fetched: total,
        errors,
    })
}

/// The archive owner's profile as an API-shaped user object.
async fn read_account_user(root: &Path) -> Result<Option<Value>, ArchiveError> {
    let data = root.join("data");

    let account_js = data.join("account.js");
    if tokio::fs::try_exists(&account_js).await.unwrap_or(false) {
        let fragment = read_fragment(&account_js).await?;
        let details = fragment
            .get(0)
            .and_then(|entry| entry.get("account"))
            .ok_or_else(|| ArchiveError::MissingAccount {
                path: account_js.clone(),
            })?;

        let mut user = Map::new();
        copy(&mut user, "id_str", details.get("accountId"));
        copy(&mut user, "screen_name", details.get("username"));
        copy(&mut user, "name", details.get("accountDisplayName"));
        copy(&mut user, "created_at", details.get("createdAt"));

        let profile_js = data.join("profile.js");
        if tokio::fs::try_exists(&profile_js).await.unwrap_or(false) {
            let profile = read_fragment(&profile_js).await?;
            if let Some(profile) = profile.get(0).and_then(|entry| entry.get("profile")) {
                copy(&mut user, "description", path(profile, &["description", "bio"]));
                copy(&mut user, "url", path(profile, &["description", "website"]));
                copy(&mut user, "location", path(profile, &["description", "location"]));
                copy(&mut user, "profile_image_url_https", profile.get("avatarMediaUrl"));
            }
        }
        return Ok(Some(Value::Object(user)));
    }

    let legacy_js = data.join("js").join("user_details.js");
    if tokio::fs::try_exists(&legacy_js).await.unwrap_or(false) {
        let details = read_fragment(&legacy_js).await?;
        let mut user = Map::new();
        copy(&mut user, "id_str", details.get("id"));
        copy(&mut user, "screen_name", details.get("screen_name"));
        copy(&mut user, "name", details.get("full_name"));
        copy(&mut user, "created_at", details.get("created_at"));
        copy(&mut user, "location", details.get("location"));
        copy(&mut user, "description", details.get("bio"));
        return Ok(Some(Value::Object(user)));
    }

    Ok(None)
}

fn copy(target: &mut Map<String, Value>, key: &str, value: Option<&Value>) {
    if let Some(value) = value.filter(|v| !v.is_null()) {
        let value = match value {
            Value::Number(n) => Value::String(n.to_string()),
            other => other.clone(),
        };
        target.insert(key.to_string(), value);
    }
}

/// Tweet fragments of either layout, current layout first.
async fn tweet_files(root: &Path) -> Result<Vec<std::path::PathBuf>, ArchiveError> {
    let mut files = list_files(&root.join("data"), |name| {
        let stem = name.strip_suffix(".js").unwrap_or(name);
        stem == "tweets"
            || stem == "tweet"
            || stem.starts_with("tweets-part")
            || stem.starts_with("tweet-part")
    })
    .await?;
    files.extend(
        list_files(&root.join("data").join("js").join("tweets"), |name| {
            name.ends_with(".js")
        })
        .await?,
    );
    Ok(files)
}

/// Raw tweet records of one fragment, each carrying a `user`.
async fn archive_records(file: &Path, owner_external_id: &str) -> Result<Vec<Value>, ArchiveError> {
    let fragment = read_fragment(file).await?;
    let Value::Array(entries) = fragment else {
        return Err(ArchiveError::Format {
            path: file.to_path_buf(),
            message: "expected an array of tweets".to_string(),
        });
    };

    Ok(entries
        .into_iter()
        .map(|entry| {
            let mut tweet = match entry {
                Value::Object(mut wrapper) if wrapper.contains_key("tweet") => {
                    wrapper.remove("tweet").unwrap_or(Value::Null)
                }
                other => other,
            };
            if let Value::Object(map) = &mut tweet
                && !map.contains_key("user")
            {
                map.insert("user".to_string(), json!({ "id_str": owner_external_id }));
            }
            tweet
        })
        .collect())
}
