use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use keepsake::sync::SyncProgress;

/// Spinner state for the accounts of one run.
#[derive(Default)]
struct ProgressState {
    /// Spinner per account label.
    bars: HashMap<String, ProgressBar>,
    /// Account currently being processed; item events carry no account.
    current: Option<String>,
    /// Items saved for the current account.
    saved: u64,
}

/// Interactive progress reporter using indicatif.
///
/// Accounts are processed one at a time, so item-level events are credited
/// to the most recently started account.
pub struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    pub fn handle(&self, event: SyncProgress) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        match event {
            SyncProgress::AccountStarted { account, operation } => {
                let bar = self.multi.add(ProgressBar::new_spinner());
                bar.set_style(Self::spinner_style());
                bar.set_prefix(format!("{account:24}"));
                bar.set_message(format!("{operation}..."));
                bar.enable_steady_tick(Duration::from_millis(100));
                state.bars.insert(account.clone(), bar);
                state.current = Some(account);
                state.saved = 0;
            }

            SyncProgress::FetchingPage { account, page, .. } => {
                if let Some(bar) = state.bars.get(&account) {
                    bar.set_message(format!("fetching page {page}..."));
                }
            }

            SyncProgress::FetchedPage {
                account,
                page,
                total_so_far,
                ..
            } => {
                if let Some(bar) = state.bars.get(&account) {
                    bar.set_message(format!("page {page} ({total_so_far} records)"));
                }
            }

            SyncProgress::ItemSaved { .. } => {
                state.saved += 1;
                if let Some(bar) = state.current.as_ref().and_then(|a| state.bars.get(a)) {
                    bar.set_message(format!("{} saved", state.saved));
                }
            }

            SyncProgress::PageCapReached { account, max_pages } => {
                if let Some(bar) = state.bars.get(&account) {
                    bar.println(format!("⚠ {account}: stopped at the {max_pages}-page cap"));
                }
            }

            SyncProgress::AccountFinished {
                account,
                items,
                errors,
            } => {
                if let Some(bar) = state.bars.get(&account) {
                    let suffix = if errors > 0 {
                        format!(", {errors} skipped")
                    } else {
                        String::new()
                    };
                    bar.finish_with_message(format!("✓ {items} fetched{suffix}"));
                }
            }

            SyncProgress::AccountFailed { account, error } => {
                if let Some(bar) = state.bars.get(&account) {
                    bar.finish_with_message(format!("✗ {error}"));
                }
            }

            SyncProgress::Warning { message } => {
                let _ = self.multi.println(format!("⚠ {message}"));
            }

            _ => {}
        }
    }

    /// Stop any spinner still ticking.
    pub fn finish(&self) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for bar in state.bars.values() {
            if !bar.is_finished() {
                bar.finish();
            }
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_current_account() {
        let reporter = InteractiveReporter::new();
        reporter.handle(SyncProgress::AccountStarted {
            account: "alice@twitter".to_string(),
            operation: "recent".to_string(),
        });
        reporter.handle(SyncProgress::ItemSaved {
            external_id: "1".to_string(),
            created: true,
        });
        reporter.handle(SyncProgress::AccountFinished {
            account: "alice@twitter".to_string(),
            items: 1,
            errors: 0,
        });

        let state = reporter.state.lock().unwrap();
        assert_eq!(state.current.as_deref(), Some("alice@twitter"));
        assert_eq!(state.saved, 1);
        assert!(state.bars["alice@twitter"].is_finished());
    }
}
