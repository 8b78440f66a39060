//! Progress reporting types for sync operations.
//!
//! The engine never prints. Every observable step is emitted as a
//! [`SyncProgress`] event; the CLI decides how to render it.

/// Progress events emitted during sync operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// An orchestrated operation is starting.
    SyncStarted {
        operation: String,
        /// Number of accounts that will be processed.
        accounts: usize,
    },

    /// Starting one account's run.
    AccountStarted { account: String, operation: String },

    /// Requesting a page of records.
    FetchingPage {
        account: String,
        /// Page number within this run (1-indexed).
        page: u32,
        /// `max_id` for id-window platforms.
        max_id: Option<i64>,
        /// `since_id` for id-window platforms.
        since_id: Option<i64>,
    },

    /// A page arrived.
    FetchedPage {
        account: String,
        page: u32,
        count: usize,
        /// Running total of records fetched in this run.
        total_so_far: usize,
    },

    /// The page cap stopped the run before the feed was exhausted.
    PageCapReached { account: String, max_pages: u32 },

    /// A record was normalized and persisted.
    ItemSaved {
        external_id: String,
        /// True when the item did not exist before.
        created: bool,
    },

    /// A record failed without aborting the run.
    ItemFailed { external_id: String, error: String },

    /// An identity was fetched from the platform.
    IdentityFetched { external_id: String, username: String },

    /// The account's feed cursor moved forward.
    CursorAdvanced {
        account: String,
        feed: String,
        high_water: i64,
    },

    /// Best-effort media download failed; the item was still saved.
    MediaDownloadFailed { url: String, error: String },

    /// An account's run finished.
    AccountFinished {
        account: String,
        items: usize,
        /// Item-local failures collected along the way.
        errors: usize,
    },

    /// An account's run aborted.
    AccountFailed { account: String, error: String },

    /// All accounts have been processed.
    SyncComplete { succeeded: usize, failed: usize },

    /// Non-fatal warning.
    Warning { message: String },
}

/// Callback for progress updates during sync operations.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            SyncProgress::ItemSaved {
                external_id: "1".to_string(),
                created: true,
            },
        );
        emit(
            Some(&callback),
            SyncProgress::SyncComplete {
                succeeded: 1,
                failed: 0,
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        emit(
            None,
            SyncProgress::Warning {
                message: "ignored".to_string(),
            },
        );
    }
}
