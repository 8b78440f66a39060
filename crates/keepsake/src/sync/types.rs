//! Shared sync types, configuration and constants.

use std::time::Duration;

use uuid::Uuid;

/// Default number of records requested per id-window batch.
pub const DEFAULT_BATCH_SIZE: u32 = 200;

/// Default page size for offset-paginated platforms.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Default politeness delay between two page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Default hard cap on pages fetched in one account run.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Default bound on quoted/reshared item nesting.
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which cursor-tracked feed of an account is being synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// The account's own recent items.
    Recent,
    /// Items the account has favorited.
    Favorites,
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedKind::Recent => write!(f, "recent"),
            FeedKind::Favorites => write!(f, "favorites"),
        }
    }
}

/// How much of a feed to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Exactly this many of the most recent items.
    Count(u32),
    /// Everything newer than the stored cursor.
    New,
}

impl std::str::FromStr for FetchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("new") {
            return Ok(FetchMode::New);
        }
        match s.parse::<u32>() {
            Ok(0) => Err("count must be greater than zero".to_string()),
            Ok(n) => Ok(FetchMode::Count(n)),
            Err(_) => Err(format!("expected a number or \"new\", got {s:?}")),
        }
    }
}

impl std::fmt::Display for FetchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchMode::Count(n) => write!(f, "{n}"),
            FetchMode::New => write!(f, "new"),
        }
    }
}

/// One operation the orchestrator can run per account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Recent(FetchMode),
    Favorites(FetchMode),
    AccountIdentity,
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncOperation::Recent(mode) => write!(f, "recent ({mode})"),
            SyncOperation::Favorites(mode) => write!(f, "favorites ({mode})"),
            SyncOperation::AccountIdentity => write!(f, "account identity"),
        }
    }
}

/// Engine settings, built once by the caller and passed down.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Records per id-window request.
    pub batch_size: u32,
    /// Records per offset page.
    pub per_page: u32,
    /// Sleep between successive page requests.
    pub page_delay: Duration,
    /// Pages fetched before a run stops with a warning.
    pub max_pages: u32,
    /// Deepest quoted/reshared nesting followed.
    pub max_depth: usize,
    /// Shared request budget per platform.
    pub requests_per_second: u32,
    pub request_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            per_page: DEFAULT_PER_PAGE,
            page_delay: DEFAULT_PAGE_DELAY,
            max_pages: DEFAULT_MAX_PAGES,
            max_depth: DEFAULT_MAX_DEPTH,
            requests_per_second: 1,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Per-account report returned by every orchestrated operation.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub account_id: Uuid,
    /// `username@platform` label.
    pub account: String,
    /// False when the account's run aborted.
    pub success: bool,
    /// Records fetched and processed.
    pub items_fetched: usize,
    /// Account-fatal error first, then item-local failures.
    pub errors: Vec<String>,
}

impl SyncOutcome {
    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }
}

/// Whether any outcome in a report failed.
pub fn any_failed(outcomes: &[SyncOutcome]) -> bool {
    outcomes.iter().any(|o| !o.success)
}
