use keepsake::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::SyncStarted {
                operation,
                accounts,
            } => {
                tracing::info!(operation = %operation, accounts, "Starting sync");
            }

            SyncProgress::AccountStarted { account, operation } => {
                tracing::info!(account = %account, operation = %operation, "Syncing account");
            }

            SyncProgress::FetchingPage {
                account,
                page,
                max_id,
                since_id,
            } => {
                tracing::debug!(account = %account, page, max_id = ?max_id, since_id = ?since_id, "Fetching page");
            }

            SyncProgress::FetchedPage {
                account,
                page,
                count,
                total_so_far,
            } => {
                tracing::debug!(account = %account, page, count, total_so_far, "Fetched page");
            }

            SyncProgress::PageCapReached { account, max_pages } => {
                tracing::warn!(account = %account, max_pages, "Page cap reached, stopping early");
            }

            SyncProgress::ItemSaved {
                external_id,
                created,
            } => {
                tracing::trace!(external_id = %external_id, created, "Saved item");
            }

            SyncProgress::ItemFailed { external_id, error } => {
                tracing::warn!(external_id = %external_id, error = %error, "Item skipped");
            }

            SyncProgress::IdentityFetched {
                external_id,
                username,
            } => {
                tracing::debug!(external_id = %external_id, username = %username, "Fetched identity");
            }

            SyncProgress::CursorAdvanced {
                account,
                feed,
                high_water,
            } => {
                tracing::info!(account = %account, feed = %feed, high_water, "Cursor advanced");
            }

            SyncProgress::MediaDownloadFailed { url, error } => {
                tracing::warn!(url = %url, error = %error, "Media download failed");
            }

            SyncProgress::AccountFinished {
                account,
                items,
                errors,
            } => {
                tracing::info!(account = %account, items, errors, "Account synced");
            }

            SyncProgress::AccountFailed { account, error } => {
                tracing::error!(account = %account, error = %error, "Account failed");
            }

            SyncProgress::SyncComplete { succeeded, failed } => {
                tracing::info!(succeeded, failed, "Sync complete");
            }

            SyncProgress::Warning { message } => {
                tracing::warn!(message = %message, "Warning");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
