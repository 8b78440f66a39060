//! End-to-end sync tests against an in-memory SQLite store.
//!
//! A scripted Twitter-shaped binding stands in for the network: it serves
//! id-window pages from a fixed timeline and counts every identity fetch.
//! Records go through the real normalizer and save path.

#![cfg(all(feature = "sqlite", feature = "migrate", feature = "twitter"))]

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use keepsake::connect_and_migrate;
use keepsake::entity::account::Model as AccountModel;
use keepsake::entity::item_kind::ItemKind;
use keepsake::entity::platform_type::PlatformType;
use keepsake::media::{DownloadError, MediaFetcher};
use keepsake::platform::PlatformError;
use keepsake::repository::account::{self, NewAccount};
use keepsake::repository::query::{self, Pagination};
use keepsake::repository::{identity, item};
use keepsake::sync::{
    AccountSelection, BindingFactory, CanonicalIdentity, CanonicalItem, EngineConfig, FeedKind,
    FetchMode, ItemError, Normalizer, Page, PageRequest, PaginationMode, PlatformBinding,
    ProgressCallback, SyncContext, SyncError, SyncOutcome, SyncProgress, sync_account_identity,
    sync_favorites, sync_recent,
};
use keepsake::twitter::{TwitterNormalizer, import_archive};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

/// If exceeded, a walk is most likely looping.
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(SYNC_TIMEOUT, future)
        .await
        .expect("sync should finish in time")
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn user(id: &str, screen_name: &str, protected: bool) -> Value {
    json!({
        "id_str": id,
        "screen_name": screen_name,
        "name": screen_name.to_uppercase(),
        "protected": protected,
        "created_at": "Tue Mar 21 20:50:14 +0000 2006",
    })
}

fn tweet(id: i64, author: Value) -> Value {
    json!({
        "id_str": id.to_string(),
        "full_text": format!("tweet number {id}"),
        "created_at": "Wed Oct 10 20:19:24 +0000 2018",
        "user": author,
    })
}

fn by_id(id: &str) -> Value {
    json!({ "id_str": id })
}

// ─── Scripted binding ────────────────────────────────────────────────────────

#[derive(Default)]
struct FeedState {
    timeline: BTreeMap<i64, Value>,
    favorites: BTreeMap<i64, Value>,
    users: HashMap<String, Value>,
    account_user: Option<Value>,
    /// 1-indexed page request that fails with a transient error.
    fail_on_page: Option<usize>,
    pages_served: usize,
    identity_fetches: usize,
}

#[derive(Clone, Default)]
struct ScriptedTwitter {
    state: Arc<Mutex<FeedState>>,
}

impl ScriptedTwitter {
    fn with_timeline(records: impl IntoIterator<Item = Value>) -> Self {
        let feed = Self::default();
        feed.set_timeline(records);
        feed
    }

    fn set_timeline(&self, records: impl IntoIterator<Item = Value>) {
        let mut state = self.state.lock().unwrap();
        state.timeline = keyed(records);
    }

    fn set_favorites(&self, records: impl IntoIterator<Item = Value>) {
        self.state.lock().unwrap().favorites = keyed(records);
    }

    fn add_user(&self, raw: Value) {
        let id = raw["id_str"].as_str().unwrap().to_string();
        self.state.lock().unwrap().users.insert(id, raw);
    }

    fn set_account_user(&self, raw: Value) {
        self.state.lock().unwrap().account_user = Some(raw);
    }

    fn fail_on_page(&self, page: usize) {
        self.state.lock().unwrap().fail_on_page = Some(page);
    }

    fn identity_fetches(&self) -> usize {
        self.state.lock().unwrap().identity_fetches
    }
}

fn keyed(records: impl IntoIterator<Item = Value>) -> BTreeMap<i64, Value> {
    records
        .into_iter()
        .map(|r| (r["id_str"].as_str().unwrap().parse().unwrap(), r))
        .collect()
}

impl Normalizer for ScriptedTwitter {
    fn platform(&self) -> PlatformType {
        PlatformType::Twitter
    }

    fn normalize_identity(&self, raw: &Value) -> Result<CanonicalIdentity, ItemError> {
        TwitterNormalizer.normalize_identity(raw)
    }

    fn normalize_item(&self, raw: &Value) -> Result<CanonicalItem, ItemError> {
        TwitterNormalizer.normalize_item(raw)
    }
}

#[async_trait]
impl PlatformBinding for ScriptedTwitter {
    fn pagination(&self) -> PaginationMode {
        PaginationMode::IdWindow
    }

    fn supports(&self, _feed: FeedKind) -> bool {
        true
    }

    async fn fetch_page(&self, feed: FeedKind, request: &PageRequest) -> Result<Page, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.pages_served += 1;
        if state.fail_on_page == Some(state.pages_served) {
            return Err(PlatformError::transient("HTTP 503"));
        }
        let PageRequest::Window {
            count,
            max_id,
            since_id,
        } = *request
        else {
            return Err(PlatformError::protocol("offset request"));
        };
        let source = match feed {
            FeedKind::Recent => &state.timeline,
            FeedKind::Favorites => &state.favorites,
        };
        let records = source
            .iter()
            .rev()
            .filter(|(id, _)| max_id.is_none_or(|m| **id <= m))
            .filter(|(id, _)| since_id.is_none_or(|s| **id > s))
            .take(count as usize)
            .map(|(_, raw)| raw.clone())
            .collect();
        Ok(Page {
            records,
            total_pages: None,
        })
    }

    fn record_id(&self, raw: &Value) -> Option<i64> {
        raw["id_str"].as_str()?.parse().ok()
    }

    async fn fetch_identity(&self, external_id: &str) -> Result<Value, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.identity_fetches += 1;
        state
            .users
            .get(external_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("user {external_id}")))
    }

    async fn fetch_account_identity(&self) -> Result<Value, PlatformError> {
        self.state
            .lock()
            .unwrap()
            .account_user
            .clone()
            .ok_or_else(|| PlatformError::unauthorized("HTTP 401"))
    }
}

/// Hands out the scripted binding registered for each username.
#[derive(Default)]
struct ScriptedFactory {
    feeds: HashMap<String, ScriptedTwitter>,
}

impl ScriptedFactory {
    fn with(mut self, username: &str, feed: &ScriptedTwitter) -> Self {
        self.feeds.insert(username.to_string(), feed.clone());
        self
    }
}

impl BindingFactory for ScriptedFactory {
    fn binding(&self, account: &AccountModel) -> Result<Box<dyn PlatformBinding>, SyncError> {
        self.feeds
            .get(&account.username)
            .cloned()
            .map(|feed| Box::new(feed) as Box<dyn PlatformBinding>)
            .ok_or_else(|| SyncError::MissingCredentials {
                account: account.label(),
            })
    }
}

/// Media fetcher that fails its first `failures` calls.
struct FlakyFetcher {
    failures: Mutex<usize>,
    calls: Mutex<Vec<String>>,
}

impl FlakyFetcher {
    fn new(failures: usize) -> Self {
        Self {
            failures: Mutex::new(failures),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaFetcher for FlakyFetcher {
    async fn download(&self, url: &str, _acceptable: &[&str]) -> Result<PathBuf, DownloadError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(PathBuf::from("/archive/media/downloaded.jpg"))
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn test_config() -> EngineConfig {
    EngineConfig {
        page_delay: Duration::ZERO,
        ..EngineConfig::default()
    }
}

async fn setup_db() -> DatabaseConnection {
    connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

async fn add_account(db: &DatabaseConnection, username: &str) -> AccountModel {
    account::create(
        db,
        NewAccount {
            platform: PlatformType::Twitter,
            username: username.to_string(),
            credentials: None,
            is_active: true,
        },
    )
    .await
    .expect("account should be created")
}

async fn reload(db: &DatabaseConnection, account: &AccountModel) -> AccountModel {
    account::find_by_id(db, account.id)
        .await
        .unwrap()
        .expect("account should exist")
}

async fn recent(
    db: &DatabaseConnection,
    config: &EngineConfig,
    factory: &ScriptedFactory,
    mode: FetchMode,
) -> Vec<SyncOutcome> {
    within(sync_recent(
        SyncContext::new(db, config),
        factory,
        &AccountSelection::all(PlatformType::Twitter),
        mode,
    ))
    .await
    .expect("sync should run")
}

async fn stored_tweet(db: &DatabaseConnection, id: i64) -> Option<keepsake::ItemModel> {
    item::find_by_external_id(db, PlatformType::Twitter, ItemKind::Tweet, &id.to_string())
        .await
        .unwrap()
}

async fn tweet_count(db: &DatabaseConnection) -> u64 {
    query::count_items_by_platform(db, PlatformType::Twitter)
        .await
        .unwrap()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_sync_converges_to_the_same_store() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;
    let author = user("12", "alice", false);
    let feed = ScriptedTwitter::with_timeline((1..=5).map(|id| tweet(id, author.clone())));
    let factory = ScriptedFactory::default().with("alice", &feed);

    let first = recent(&db, &config, &factory, FetchMode::Count(5)).await;
    assert!(first[0].success);
    assert_eq!(first[0].items_fetched, 5);
    let before = stored_tweet(&db, 3).await.unwrap();

    let second = recent(&db, &config, &factory, FetchMode::Count(5)).await;
    assert!(second[0].success);
    assert_eq!(second[0].items_fetched, 5);
    assert_eq!(tweet_count(&db).await, 5);

    let after = stored_tweet(&db, 3).await.unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.text, before.text);
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(5));
}

#[tokio::test]
async fn new_mode_fetches_only_items_above_the_cursor() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;
    account::advance_cursor(&db, alice.id, FeedKind::Recent, 100)
        .await
        .unwrap();

    let author = user("12", "alice", false);
    let feed = ScriptedTwitter::with_timeline((1..=300).map(|id| tweet(id, author.clone())));
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::New).await;
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].items_fetched, 200);
    assert_eq!(tweet_count(&db).await, 200);
    assert!(stored_tweet(&db, 100).await.is_none());
    assert!(stored_tweet(&db, 101).await.is_some());
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(300));

    // Nothing new: the second run fetches nothing and keeps the cursor.
    let again = recent(&db, &config, &factory, FetchMode::New).await;
    assert_eq!(again[0].items_fetched, 0);
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(300));
}

#[tokio::test]
async fn cursor_never_moves_backwards() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;
    account::advance_cursor(&db, alice.id, FeedKind::Recent, 500)
        .await
        .unwrap();

    let author = user("12", "alice", false);
    let feed = ScriptedTwitter::with_timeline((1..=10).map(|id| tweet(id, author.clone())));
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::Count(3)).await;
    assert_eq!(outcomes[0].items_fetched, 3);
    assert!(stored_tweet(&db, 8).await.is_some());
    assert!(stored_tweet(&db, 7).await.is_none());
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(500));
}

#[tokio::test]
async fn one_failing_account_does_not_stop_the_next() {
    let db = setup_db().await;
    let config = EngineConfig {
        batch_size: 2,
        ..test_config()
    };
    let alice = add_account(&db, "alice").await;
    let bob = add_account(&db, "bob").await;

    let alice_feed =
        ScriptedTwitter::with_timeline((1..=5).map(|id| tweet(id, user("12", "alice", false))));
    alice_feed.fail_on_page(2);
    let bob_feed =
        ScriptedTwitter::with_timeline((11..=13).map(|id| tweet(id, user("13", "bob", false))));
    let factory = ScriptedFactory::default()
        .with("alice", &alice_feed)
        .with("bob", &bob_feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::New).await;
    assert_eq!(outcomes.len(), 2);

    let failed = outcomes.iter().find(|o| o.account_id == alice.id).unwrap();
    assert!(!failed.success);
    assert_eq!(failed.items_fetched, 0);
    assert_eq!(failed.errors.len(), 1);
    assert_eq!(reload(&db, &alice).await.last_recent_id, None);

    let succeeded = outcomes.iter().find(|o| o.account_id == bob.id).unwrap();
    assert!(succeeded.success);
    assert_eq!(succeeded.items_fetched, 3);
    assert_eq!(reload(&db, &bob).await.last_recent_id, Some(13));
}

#[tokio::test]
async fn identity_is_fetched_once_per_run() {
    let db = setup_db().await;
    let config = test_config();
    add_account(&db, "alice").await;

    let feed = ScriptedTwitter::with_timeline((1..=3).map(|id| tweet(id, by_id("77"))));
    feed.add_user(user("77", "carol", false));
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::New).await;
    assert!(outcomes[0].success);
    assert!(outcomes[0].errors.is_empty());
    assert_eq!(feed.identity_fetches(), 1);

    let carol = identity::find_by_external_id(&db, PlatformType::Twitter, "77")
        .await
        .unwrap()
        .expect("owner should be stored");
    assert_eq!(carol.username, "carol");
    let owned = query::items_by_owner(&db, carol.id, Pagination::default())
        .await
        .unwrap();
    assert_eq!(owned.total, 3);
}

#[tokio::test]
async fn unknown_owner_skips_only_that_item() {
    let db = setup_db().await;
    let config = test_config();
    add_account(&db, "alice").await;

    let feed = ScriptedTwitter::with_timeline([
        tweet(1, user("12", "alice", false)),
        tweet(2, by_id("404")),
        tweet(3, user("12", "alice", false)),
    ]);
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::New).await;
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].items_fetched, 3);
    assert_eq!(outcomes[0].errors.len(), 1);
    assert!(outcomes[0].errors[0].starts_with("2:"));
    assert_eq!(tweet_count(&db).await, 2);
}

#[tokio::test]
async fn item_with_missing_owner_is_fetched_again_by_the_next_run() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;

    let feed = ScriptedTwitter::with_timeline([
        tweet(1, user("12", "alice", false)),
        tweet(2, by_id("404")),
        tweet(3, user("12", "alice", false)),
    ]);
    let factory = ScriptedFactory::default().with("alice", &feed);

    let first = recent(&db, &config, &factory, FetchMode::New).await;
    assert_eq!(first[0].errors.len(), 1);
    // The cursor stays below the failed record.
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(1));

    feed.add_user(user("404", "dora", false));
    let second = recent(&db, &config, &factory, FetchMode::New).await;
    assert!(second[0].errors.is_empty());
    assert_eq!(second[0].items_fetched, 2);
    assert!(stored_tweet(&db, 2).await.is_some());
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(3));
}

#[tokio::test]
async fn malformed_records_do_not_hold_the_cursor() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;

    let mut looping = tweet(2, user("12", "alice", false));
    looping["quoted_status"] = tweet(2, user("12", "alice", false));
    let feed = ScriptedTwitter::with_timeline([
        tweet(1, user("12", "alice", false)),
        looping,
        tweet(3, user("12", "alice", false)),
    ]);
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::New).await;
    assert_eq!(outcomes[0].errors.len(), 1);
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(3));
}

#[tokio::test]
async fn capped_walk_keeps_the_cursor_until_the_gap_is_filled() {
    let db = setup_db().await;
    let alice = add_account(&db, "alice").await;
    account::advance_cursor(&db, alice.id, FeedKind::Recent, 40)
        .await
        .unwrap();

    let author = user("12", "alice", false);
    let feed = ScriptedTwitter::with_timeline((1..=100).map(|id| tweet(id, author.clone())));
    let factory = ScriptedFactory::default().with("alice", &feed);

    let capped = EngineConfig {
        batch_size: 10,
        max_pages: 2,
        ..test_config()
    };
    let first = recent(&db, &capped, &factory, FetchMode::New).await;
    assert!(first[0].success);
    assert_eq!(first[0].items_fetched, 20);
    assert!(stored_tweet(&db, 50).await.is_none());
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(40));

    let second = recent(&db, &test_config(), &factory, FetchMode::New).await;
    assert!(second[0].success);
    assert_eq!(second[0].items_fetched, 60);
    assert!(stored_tweet(&db, 50).await.is_some());
    assert!(stored_tweet(&db, 40).await.is_none());
    assert_eq!(tweet_count(&db).await, 60);
    assert_eq!(reload(&db, &alice).await.last_recent_id, Some(100));
}

#[tokio::test]
async fn absent_fields_keep_stored_values() {
    let db = setup_db().await;
    let config = test_config();
    add_account(&db, "alice").await;

    let mut first = tweet(1, user("12", "alice", false));
    first["place"] = json!({"full_name": "Paris, France"});
    first["favorite_count"] = json!(3);
    let feed = ScriptedTwitter::with_timeline([first]);
    let factory = ScriptedFactory::default().with("alice", &feed);
    recent(&db, &config, &factory, FetchMode::Count(1)).await;

    let mut second = tweet(1, user("12", "alice", false));
    second["favorite_count"] = json!(9);
    feed.set_timeline([second]);
    recent(&db, &config, &factory, FetchMode::Count(1)).await;

    let stored = stored_tweet(&db, 1).await.unwrap();
    assert_eq!(stored.place_name.as_deref(), Some("Paris, France"));
    assert_eq!(stored.favorite_count, Some(9));
}

#[tokio::test]
async fn owner_privacy_cascades_to_items() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;

    let feed = ScriptedTwitter::with_timeline(
        (1..=3)
            .map(|id| tweet(id, user("12", "alice", false)))
            .chain([tweet(4, user("77", "carol", false))]),
    );
    let factory = ScriptedFactory::default().with("alice", &feed);
    recent(&db, &config, &factory, FetchMode::New).await;
    assert!(!stored_tweet(&db, 2).await.unwrap().is_private);

    feed.set_account_user(user("12", "alice", true));
    let outcomes = within(sync_account_identity(
        SyncContext::new(&db, &config),
        &factory,
        &AccountSelection::named(PlatformType::Twitter, "alice"),
    ))
    .await
    .unwrap();
    assert!(outcomes[0].success);

    for id in 1..=3 {
        assert!(stored_tweet(&db, id).await.unwrap().is_private);
    }
    // Items of other owners keep their flag.
    assert!(!stored_tweet(&db, 4).await.unwrap().is_private);
    let linked = reload(&db, &alice).await.identity_id.expect("identity linked");
    let owner = identity::find_by_id(&db, linked).await.unwrap().unwrap();
    assert_eq!(owner.external_id, "12");
    assert!(owner.is_private);
}

#[tokio::test]
async fn hashtags_converge_to_the_latest_payload() {
    let db = setup_db().await;
    let config = test_config();
    add_account(&db, "alice").await;

    let tagged = |tags: &[&str]| {
        let mut raw = tweet(1, user("12", "alice", false));
        raw["entities"] = json!({
            "hashtags": tags.iter().map(|t| json!({"text": t})).collect::<Vec<_>>()
        });
        raw
    };

    let feed = ScriptedTwitter::with_timeline([tagged(&["rust", "Sqlite"])]);
    let factory = ScriptedFactory::default().with("alice", &feed);
    recent(&db, &config, &factory, FetchMode::Count(1)).await;

    feed.set_timeline([tagged(&["sqlite", "tokio"])]);
    recent(&db, &config, &factory, FetchMode::Count(1)).await;

    let stored = stored_tweet(&db, 1).await.unwrap();
    let slugs = |labels: Vec<keepsake::LabelModel>| {
        labels.into_iter().map(|l| l.slug).collect::<Vec<_>>()
    };
    assert_eq!(
        slugs(query::labels_for_item(&db, stored.id).await.unwrap()),
        vec!["sqlite", "tokio"]
    );

    // A payload without entities says nothing about tags.
    feed.set_timeline([tweet(1, user("12", "alice", false))]);
    recent(&db, &config, &factory, FetchMode::Count(1)).await;
    assert_eq!(
        slugs(query::labels_for_item(&db, stored.id).await.unwrap()),
        vec!["sqlite", "tokio"]
    );
}

#[tokio::test]
async fn quoted_items_are_saved_and_linked() {
    let db = setup_db().await;
    let config = test_config();
    add_account(&db, "alice").await;

    let mut quoting = tweet(2, user("12", "alice", false));
    quoting["quoted_status"] = tweet(1, user("77", "carol", false));
    let feed = ScriptedTwitter::with_timeline([quoting]);
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::New).await;
    assert!(outcomes[0].errors.is_empty());

    let quoted = stored_tweet(&db, 1).await.expect("quoted tweet stored");
    let outer = stored_tweet(&db, 2).await.unwrap();
    assert_eq!(outer.quoted_item_id, Some(quoted.id));
    // Cursor only tracks top-level records.
    assert_eq!(outcomes[0].items_fetched, 1);
}

#[tokio::test]
async fn self_reference_is_an_item_local_cycle() {
    let db = setup_db().await;
    let config = test_config();
    add_account(&db, "alice").await;

    let mut looping = tweet(5, user("12", "alice", false));
    looping["quoted_status"] = tweet(5, user("12", "alice", false));
    let feed = ScriptedTwitter::with_timeline([tweet(4, user("12", "alice", false)), looping]);
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::New).await;
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].errors.len(), 1);
    assert!(outcomes[0].errors[0].contains("cycle"));
    assert!(stored_tweet(&db, 5).await.is_none());
    assert!(stored_tweet(&db, 4).await.is_some());
}

#[tokio::test]
async fn nesting_beyond_max_depth_fails_the_outer_item() {
    let db = setup_db().await;
    let config = EngineConfig {
        max_depth: 1,
        ..test_config()
    };
    add_account(&db, "alice").await;

    let author = user("12", "alice", false);
    let mut middle = tweet(2, author.clone());
    middle["quoted_status"] = tweet(1, author.clone());
    let mut outer = tweet(3, author.clone());
    outer["quoted_status"] = middle;
    let feed = ScriptedTwitter::with_timeline([outer]);
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = recent(&db, &config, &factory, FetchMode::New).await;
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].errors.len(), 1);
    assert!(outcomes[0].errors[0].starts_with("3:"));
    assert_eq!(tweet_count(&db).await, 0);
}

#[tokio::test]
async fn favorites_link_the_account_identity() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;

    let feed = ScriptedTwitter::default();
    feed.set_account_user(user("12", "alice", false));
    feed.set_favorites([
        tweet(40, user("77", "carol", false)),
        tweet(41, user("78", "dave", false)),
    ]);
    let factory = ScriptedFactory::default().with("alice", &feed);

    let outcomes = within(sync_favorites(
        SyncContext::new(&db, &config),
        &factory,
        &AccountSelection::named(PlatformType::Twitter, "alice"),
        FetchMode::New,
    ))
    .await
    .unwrap();
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].items_fetched, 2);

    let alice = reload(&db, &alice).await;
    assert_eq!(alice.last_favorite_id, Some(41));
    assert_eq!(alice.last_recent_id, None);
    let favorites = query::favorites_of(&db, alice.identity_id.unwrap(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(favorites.total, 2);
    assert_eq!(favorites.items[0].external_id, "41");
}

#[tokio::test]
async fn failed_media_download_is_retried_on_the_next_run() {
    let db = setup_db().await;
    let config = test_config();
    add_account(&db, "alice").await;

    let mut with_photo = tweet(1, user("12", "alice", false));
    with_photo["extended_entities"] = json!({"media": [{
        "id_str": "900",
        "type": "photo",
        "media_url_https": "https://pbs.twimg.com/media/ABC.jpg",
    }]});
    let feed = ScriptedTwitter::with_timeline([with_photo]);
    let factory = ScriptedFactory::default().with("alice", &feed);
    let fetcher = FlakyFetcher::new(1);

    for _ in 0..2 {
        let ctx = SyncContext::new(&db, &config).with_media(&fetcher);
        let outcomes = within(sync_recent(
            ctx,
            &factory,
            &AccountSelection::all(PlatformType::Twitter),
            FetchMode::Count(1),
        ))
        .await
        .unwrap();
        // A failed download never fails the item.
        assert!(outcomes[0].errors.is_empty());
    }

    let stored = stored_tweet(&db, 1).await.unwrap();
    let media = query::media_for_item(&db, &stored).await.unwrap();
    assert_eq!(media.len(), 1);
    assert_eq!(
        media[0].local_path.as_deref(),
        Some("/archive/media/downloaded.jpg")
    );
    assert_eq!(fetcher.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn progress_events_follow_the_run() {
    let db = setup_db().await;
    let config = test_config();
    add_account(&db, "alice").await;

    let feed = ScriptedTwitter::with_timeline((1..=2).map(|id| tweet(id, user("12", "alice", false))));
    let factory = ScriptedFactory::default().with("alice", &feed);

    let events: Arc<Mutex<Vec<SyncProgress>>> = Arc::default();
    let sink = Arc::clone(&events);
    let on_progress: ProgressCallback = Box::new(move |event| sink.lock().unwrap().push(event));

    within(sync_recent(
        SyncContext::new(&db, &config).with_progress(&on_progress),
        &factory,
        &AccountSelection::all(PlatformType::Twitter),
        FetchMode::New,
    ))
    .await
    .unwrap();

    let events = events.lock().unwrap();
    assert!(matches!(events.first(), Some(SyncProgress::SyncStarted { accounts: 1, .. })));
    assert!(matches!(
        events.last(),
        Some(SyncProgress::SyncComplete {
            succeeded: 1,
            failed: 0
        })
    ));
    let saved = events
        .iter()
        .filter(|e| matches!(e, SyncProgress::ItemSaved { created: true, .. }))
        .count();
    assert_eq!(saved, 2);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SyncProgress::CursorAdvanced { high_water: 2, .. }))
    );
}

#[tokio::test]
async fn no_active_account_fails_before_any_request() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;
    account::set_active(&db, alice.id, false).await.unwrap();

    let feed = ScriptedTwitter::with_timeline([tweet(1, user("12", "alice", false))]);
    let factory = ScriptedFactory::default().with("alice", &feed);

    let err = sync_recent(
        SyncContext::new(&db, &config),
        &factory,
        &AccountSelection::all(PlatformType::Twitter),
        FetchMode::New,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, SyncError::NoActiveAccounts { .. }));
    assert_eq!(feed.state.lock().unwrap().pages_served, 0);
}

#[tokio::test]
async fn archive_import_saves_tweets_and_advances_the_cursor() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;

    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(
        data.join("account.js"),
        r#"window.YTD.account.part0 = [{"account": {"accountId": "12", "username": "alice", "accountDisplayName": "Alice", "createdAt": "2009-01-01T00:00:00.000Z"}}]"#,
    )
    .unwrap();
    std::fs::write(
        data.join("tweets.js"),
        r#"window.YTD.tweets.part0 = [
            {"tweet": {"id_str": "30", "full_text": "third", "created_at": "Wed Oct 10 20:19:24 +0000 2018"}},
            {"tweet": {"id_str": "10", "full_text": "first", "created_at": "Wed Oct 10 20:19:24 +0000 2018"}},
            {"tweet": {"id_str": "20", "full_text": "second", "created_at": "Wed Oct 10 20:19:24 +0000 2018"}}
        ]"#,
    )
    .unwrap();

    let outcome = within(import_archive(SyncContext::new(&db, &config), &alice, root.path()))
        .await
        .unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.items_fetched, 3);
    assert!(outcome.errors.is_empty());

    let alice = reload(&db, &alice).await;
    assert_eq!(alice.last_recent_id, Some(30));
    let owner = identity::find_by_id(&db, alice.identity_id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(owner.username, "alice");
    assert_eq!(
        stored_tweet(&db, 10).await.unwrap().text.as_deref(),
        Some("first")
    );

    // Importing again converges.
    let again = within(import_archive(SyncContext::new(&db, &config), &alice, root.path()))
        .await
        .unwrap();
    assert!(again.success);
    assert_eq!(tweet_count(&db).await, 3);
}

#[tokio::test]
async fn empty_archive_is_rejected() {
    let db = setup_db().await;
    let config = test_config();
    let alice = add_account(&db, "alice").await;

    let root = tempfile::tempdir().unwrap();
    let data = root.path().join("data");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(
        data.join("account.js"),
        r#"window.YTD.account.part0 = [{"account": {"accountId": "12", "username": "alice"}}]"#,
    )
    .unwrap();

    let err = import_archive(SyncContext::new(&db, &config), &alice, root.path())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Archive(_)));
}

// ─── Offset-paginated feed ───────────────────────────────────────────────────

/// Flickr-shaped feed: offset pages of photos whose tags may be authored by
/// other members, through the real Flickr normalizer.
#[cfg(feature = "flickr")]
mod offset_feed {
    use super::*;
    use keepsake::flickr::FlickrNormalizer;

    const OWNER: &str = "1@N01";
    const FRIEND: &str = "2@N01";
    const STRANGER: &str = "3@N01";

    fn person(nsid: &str, username: &str) -> Value {
        json!({"person": {"nsid": nsid, "username": {"_content": username}}, "stat": "ok"})
    }

    fn photo(id: i64, tags: &[(&str, &str)]) -> Value {
        json!({
            "id": id.to_string(),
            "owner": {"nsid": OWNER, "username": "alice"},
            "title": {"_content": format!("photo {id}")},
            "dates": {"posted": "1286000000"},
            "tags": {"tag": tags.iter().map(|(author, raw)| json!({
                "id": format!("{id}-{author}-{raw}"),
                "author": author,
                "raw": raw,
                "machine_tag": 0,
            })).collect::<Vec<_>>()},
        })
    }

    #[derive(Default)]
    struct PhotoState {
        /// Newest first.
        photos: Vec<Value>,
        people: HashMap<String, Value>,
        fetches: HashMap<String, usize>,
    }

    #[derive(Clone, Default)]
    struct ScriptedFlickr {
        state: Arc<Mutex<PhotoState>>,
    }

    impl ScriptedFlickr {
        fn fetches_of(&self, nsid: &str) -> usize {
            self.state.lock().unwrap().fetches.get(nsid).copied().unwrap_or(0)
        }
    }

    impl Normalizer for ScriptedFlickr {
        fn platform(&self) -> PlatformType {
            PlatformType::Flickr
        }

        fn normalize_identity(&self, raw: &Value) -> Result<CanonicalIdentity, ItemError> {
            FlickrNormalizer.normalize_identity(raw)
        }

        fn normalize_item(&self, raw: &Value) -> Result<CanonicalItem, ItemError> {
            FlickrNormalizer.normalize_item(raw)
        }
    }

    #[async_trait]
    impl PlatformBinding for ScriptedFlickr {
        fn pagination(&self) -> PaginationMode {
            PaginationMode::Offset
        }

        fn supports(&self, feed: FeedKind) -> bool {
            feed == FeedKind::Recent
        }

        async fn fetch_page(&self, _feed: FeedKind, request: &PageRequest) -> Result<Page, PlatformError> {
            let PageRequest::Offset { page, per_page } = *request else {
                return Err(PlatformError::protocol("window request"));
            };
            let state = self.state.lock().unwrap();
            let per_page = per_page as usize;
            let total_pages = state.photos.len().div_ceil(per_page) as u32;
            let records = state
                .photos
                .iter()
                .skip((page as usize - 1) * per_page)
                .take(per_page)
                .cloned()
                .collect();
            Ok(Page {
                records,
                total_pages: Some(total_pages),
            })
        }

        fn record_id(&self, raw: &Value) -> Option<i64> {
            raw["id"].as_str()?.parse().ok()
        }

        async fn fetch_identity(&self, external_id: &str) -> Result<Value, PlatformError> {
            let mut state = self.state.lock().unwrap();
            *state.fetches.entry(external_id.to_string()).or_default() += 1;
            state
                .people
                .get(external_id)
                .cloned()
                .ok_or_else(|| PlatformError::not_found(format!("person {external_id}")))
        }

        async fn fetch_account_identity(&self) -> Result<Value, PlatformError> {
            Ok(person(OWNER, "alice"))
        }
    }

    struct FlickrFactory(ScriptedFlickr);

    impl BindingFactory for FlickrFactory {
        fn binding(&self, _account: &AccountModel) -> Result<Box<dyn PlatformBinding>, SyncError> {
            Ok(Box::new(self.0.clone()))
        }
    }

    #[tokio::test]
    async fn tag_authors_are_fetched_once_and_unknown_ones_fail_only_their_item() {
        let db = setup_db().await;
        let config = EngineConfig {
            per_page: 2,
            ..test_config()
        };
        let alice = account::create(
            &db,
            NewAccount {
                platform: PlatformType::Flickr,
                username: "alice".to_string(),
                credentials: None,
                is_active: true,
            },
        )
        .await
        .unwrap();

        let feed = ScriptedFlickr::default();
        {
            let mut state = feed.state.lock().unwrap();
            state.photos = vec![
                photo(103, &[(OWNER, "bees"), (FRIEND, "honey")]),
                photo(102, &[(FRIEND, "garden"), (STRANGER, "spam")]),
                photo(101, &[(FRIEND, "flowers")]),
            ];
            state.people.insert(OWNER.to_string(), person(OWNER, "alice"));
            state.people.insert(FRIEND.to_string(), person(FRIEND, "bob"));
        }
        let factory = FlickrFactory(feed.clone());

        let outcomes = within(sync_recent(
            SyncContext::new(&db, &config),
            &factory,
            &AccountSelection::all(PlatformType::Flickr),
            FetchMode::New,
        ))
        .await
        .unwrap();

        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].items_fetched, 3);
        assert_eq!(outcomes[0].errors.len(), 1);
        assert!(outcomes[0].errors[0].starts_with("102:"));
        assert!(outcomes[0].errors[0].contains(&format!("Unknown author {STRANGER}")));

        assert_eq!(feed.fetches_of(OWNER), 1);
        assert_eq!(feed.fetches_of(FRIEND), 1);
        assert_eq!(feed.fetches_of(STRANGER), 1);

        let friend = identity::find_by_external_id(&db, PlatformType::Flickr, FRIEND)
            .await
            .unwrap()
            .expect("tag author stored");
        assert_eq!(friend.username, "bob");
        assert!(
            identity::find_by_external_id(&db, PlatformType::Flickr, STRANGER)
                .await
                .unwrap()
                .is_none()
        );

        let labels_of = |id: i64| {
            let db = &db;
            async move {
                let stored = item::find_by_external_id(db, PlatformType::Flickr, ItemKind::Photo, &id.to_string())
                    .await
                    .unwrap()
                    .expect("photo stored");
                query::labels_for_item(db, stored.id).await.unwrap().len()
            }
        };
        assert_eq!(labels_of(103).await, 2);
        assert_eq!(labels_of(101).await, 1);

        // The photo with the unknown author stays above the cursor.
        assert_eq!(reload(&db, &alice).await.last_recent_id, Some(101));
    }
}
