//! Cursor controller: walks a feed page by page.
//!
//! ```text
//! INIT → FETCH_PAGE → EXTRACT → SAVE → (FETCH_PAGE …) → DONE
//!                  ↘         ↘      ↘
//!                           FAILED
//! ```
//!
//! The controller owns pagination, the politeness delay and the page cap.
//! It never touches the stored cursor: it reports the high-water mark and
//! the caller commits it once the walk is done.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::platform::PlatformError;

use super::binding::{Page, PageRequest, PaginationMode, PlatformBinding};
use super::error::SyncError;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{EngineConfig, FeedKind, FetchMode};

/// Receives each page's records once extracted.
#[async_trait]
pub trait PageSink: Send {
    /// Persist a page. Returns the number of records saved.
    async fn save_page(&mut self, records: Vec<Value>) -> Result<usize, SyncError>;
}

/// Summary of a finished walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorReport {
    /// Highest record id seen; the new cursor value.
    pub high_water: Option<i64>,
    pub pages: u32,
    /// Records handed to the sink.
    pub records: usize,
    /// Whether the page cap stopped the walk.
    pub capped: bool,
}

/// Parameters of one walk.
#[derive(Debug, Clone, Copy)]
pub struct Walk<'a> {
    pub feed: FeedKind,
    pub mode: FetchMode,
    /// Stored cursor of the feed, consulted in [`FetchMode::New`].
    pub since: Option<i64>,
    pub config: &'a EngineConfig,
    /// Account label for logs and progress events.
    pub account: &'a str,
}

enum CursorState {
    Init,
    FetchPage(PageRequest),
    Extract(PageRequest, Page),
    Save {
        records: Vec<Value>,
        next: Option<PageRequest>,
    },
    Done,
    Failed(SyncError),
}

struct Controller<'a> {
    walk: Walk<'a>,
    pagination: PaginationMode,
    /// Records still wanted in [`FetchMode::Count`].
    remaining: u32,
    report: CursorReport,
}

/// Walk a feed to completion, handing every page to `sink`.
pub async fn walk(
    binding: &dyn PlatformBinding,
    walk: Walk<'_>,
    sink: &mut dyn PageSink,
    on_progress: Option<&ProgressCallback>,
) -> Result<CursorReport, SyncError> {
    let mut controller = Controller {
        walk,
        pagination: binding.pagination(),
        remaining: match walk.mode {
            FetchMode::Count(n) => n,
            FetchMode::New => u32::MAX,
        },
        report: CursorReport::default(),
    };

    let mut state = CursorState::Init;
    loop {
        state = match state {
            CursorState::Init => CursorState::FetchPage(controller.first_request()),

            CursorState::FetchPage(request) => {
                if controller.report.pages >= walk.config.max_pages {
                    warn!(
                        account = walk.account,
                        max_pages = walk.config.max_pages,
                        "page cap reached, stopping"
                    );
                    emit(
                        on_progress,
                        SyncProgress::PageCapReached {
                            account: walk.account.to_string(),
                            max_pages: walk.config.max_pages,
                        },
                    );
                    controller.report.capped = true;
                    CursorState::Done
                } else {
                    if controller.report.pages > 0 && !walk.config.page_delay.is_zero() {
                        tokio::time::sleep(walk.config.page_delay).await;
                    }
                    controller.report.pages += 1;
                    let (max_id, since_id) = match request {
                        PageRequest::Window {
                            max_id, since_id, ..
                        } => (max_id, since_id),
                        PageRequest::Offset { .. } => (None, None),
                    };
                    emit(
                        on_progress,
                        SyncProgress::FetchingPage {
                            account: walk.account.to_string(),
                            page: controller.report.pages,
                            max_id,
                            since_id,
                        },
                    );
                    match binding.fetch_page(walk.feed, &request).await {
                        Ok(page) => CursorState::Extract(request, page),
                        Err(e) => CursorState::Failed(e.into()),
                    }
                }
            }

            CursorState::Extract(request, page) => {
                let fetched = page.records.len();
                let next = match controller.pagination {
                    PaginationMode::IdWindow => controller.extract_window(binding, request, page),
                    PaginationMode::Offset => controller.extract_offset(binding, request, page),
                };
                match next {
                    Ok(Some((records, next))) => {
                        emit(
                            on_progress,
                            SyncProgress::FetchedPage {
                                account: walk.account.to_string(),
                                page: controller.report.pages,
                                count: fetched,
                                total_so_far: controller.report.records + records.len(),
                            },
                        );
                        CursorState::Save { records, next }
                    }
                    Ok(None) => CursorState::Done,
                    Err(e) => CursorState::Failed(e.into()),
                }
            }

            CursorState::Save { records, next } => {
                let count = records.len();
                match sink.save_page(records).await {
                    Ok(saved) => {
                        debug!(account = walk.account, count, saved, "page saved");
                        controller.report.records += count;
                        next.map_or(CursorState::Done, CursorState::FetchPage)
                    }
                    Err(e) => CursorState::Failed(e),
                }
            }

            CursorState::Done => {
                info!(
                    account = walk.account,
                    feed = %walk.feed,
                    pages = controller.report.pages,
                    records = controller.report.records,
                    "feed walk complete"
                );
                return Ok(controller.report);
            }

            CursorState::Failed(e) => return Err(e),
        };
    }
}

impl Controller<'_> {
    fn since(&self) -> Option<i64> {
        match self.walk.mode {
            FetchMode::New => self.walk.since,
            FetchMode::Count(_) => None,
        }
    }

    fn first_request(&self) -> PageRequest {
        match self.pagination {
            PaginationMode::IdWindow => PageRequest::Window {
                count: self.window_count(),
                max_id: None,
                since_id: self.since(),
            },
            PaginationMode::Offset => PageRequest::Offset {
                page: 1,
                per_page: self.walk.config.per_page.max(1),
            },
        }
    }

    fn window_count(&self) -> u32 {
        self.walk.config.batch_size.max(1).min(self.remaining)
    }

    fn raise_high_water(&mut self, id: i64) {
        self.report.high_water = Some(self.report.high_water.map_or(id, |hw| hw.max(id)));
    }

    /// Narrowing id-window step. `Ok(None)` means the feed is exhausted.
    fn extract_window(
        &mut self,
        binding: &dyn PlatformBinding,
        request: PageRequest,
        page: Page,
    ) -> Result<Option<(Vec<Value>, Option<PageRequest>)>, PlatformError> {
        let PageRequest::Window {
            count: requested, ..
        } = request
        else {
            return Err(PlatformError::protocol("offset request on an id-window feed"));
        };
        if page.records.is_empty() {
            return Ok(None);
        }

        let mut ids = Vec::with_capacity(page.records.len());
        for record in &page.records {
            let id = binding
                .record_id(record)
                .ok_or_else(|| PlatformError::protocol("record without a numeric id"))?;
            ids.push(id);
        }
        let lowest = ids.iter().copied().min().unwrap_or(i64::MIN);
        let highest = ids.iter().copied().max().unwrap_or(i64::MIN);
        self.raise_high_water(highest);

        let since = self.since();
        let mut records: Vec<Value> = page
            .records
            .into_iter()
            .zip(ids)
            .filter(|(_, id)| since.is_none_or(|s| *id > s))
            .map(|(record, _)| record)
            .collect();

        let more = match self.walk.mode {
            FetchMode::New => since.is_none_or(|s| lowest > s),
            FetchMode::Count(_) => {
                records.truncate(requested as usize);
                self.remaining = self.remaining.saturating_sub(requested);
                self.remaining > 0
            }
        };

        let next = (more && lowest > 1).then(|| PageRequest::Window {
            count: self.window_count(),
            max_id: Some(lowest - 1),
            since_id: since,
        });
        Ok(Some((records, next)))
    }

    /// Offset/page-count step. `Ok(None)` means the feed is exhausted.
    fn extract_offset(
        &mut self,
        binding: &dyn PlatformBinding,
        request: PageRequest,
        page: Page,
    ) -> Result<Option<(Vec<Value>, Option<PageRequest>)>, PlatformError> {
        let PageRequest::Offset { page: number, per_page } = request else {
            return Err(PlatformError::protocol("id-window request on an offset feed"));
        };
        if page.records.is_empty() {
            return Ok(None);
        }

        let since = self.since();
        let mut reached_cursor = false;
        let mut records = Vec::with_capacity(page.records.len());
        for record in page.records {
            if let Some(id) = binding.record_id(&record) {
                self.raise_high_water(id);
                if since.is_some_and(|s| id <= s) {
                    reached_cursor = true;
                    continue;
                }
            }
            records.push(record);
        }

        let mut more = !reached_cursor && page.total_pages.is_some_and(|total| number < total);
        if let FetchMode::Count(_) = self.walk.mode {
            records.truncate(self.remaining as usize);
            self.remaining = self.remaining.saturating_sub(records.len() as u32);
            more = more && self.remaining > 0;
        }

        let next = more.then_some(PageRequest::Offset {
            page: number + 1,
            per_page,
        });
        Ok(Some((records, next)))
    }
}
