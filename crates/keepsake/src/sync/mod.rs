//! The incremental synchronization engine.
//!
//! # Module Structure
//!
//! - [`types`] - `FeedKind`, `FetchMode`, `EngineConfig`, `SyncOutcome`, defaults
//! - [`progress`] - `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`binding`] - the `PlatformBinding` / `Normalizer` seam and `BindingFactory`
//! - [`canonical`] - normalized item, identity, media and tag shapes
//! - [`cursor`] - the page-walking state machine
//! - [`run`] - per-account memo state and the save path
//! - [`reconcile`] - tag set reconciliation
//! - [`orchestrator`] - multi-account runs
//!
//! # Example
//!
//! ```ignore
//! use keepsake::sync::{AccountSelection, EngineConfig, FetchMode, HttpBindingFactory, SyncContext, sync_recent};
//!
//! let config = EngineConfig::default();
//! let factory = HttpBindingFactory::new(transport, &config);
//! let ctx = SyncContext::new(&db, &config);
//! let outcomes = sync_recent(ctx, &factory, &AccountSelection::all(PlatformType::Twitter), FetchMode::New).await?;
//! ```

pub mod binding;
pub mod canonical;
pub mod cursor;
mod error;
pub mod orchestrator;
mod progress;
pub mod reconcile;
pub mod run;
mod types;

pub use binding::{
    BindingFactory, HttpBindingFactory, Normalizer, Page, PageRequest, PaginationMode,
    PlatformBinding,
};
pub use canonical::{CanonicalIdentity, CanonicalItem, CanonicalMedia, OwnerRef, RemoteAssociation};
pub use cursor::{CursorReport, PageSink, Walk};
pub use error::{ItemError, ItemFailure, SyncError};
pub use orchestrator::{
    AccountSelection, run as run_accounts, select_accounts, sync_account_identity,
    sync_favorites, sync_recent,
};
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use reconcile::{ReconcileReport, reconcile};
pub use run::{SyncContext, SyncRun};
pub use types::{
    DEFAULT_BATCH_SIZE, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PAGES, DEFAULT_PAGE_DELAY,
    DEFAULT_PER_PAGE, DEFAULT_REQUEST_TIMEOUT, EngineConfig, FeedKind, FetchMode, SyncOperation,
    SyncOutcome, any_failed,
};
