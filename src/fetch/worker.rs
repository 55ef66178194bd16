//! Paginated worker: one time window, fetched sequentially
//!
//! Follows continuation tokens until the window is exhausted or `cap`
//! records have been collected. A gateway failure mid-loop ends the loop
//! and the records gathered so far are returned as-is.

use crate::types::{ChangeFilters, ChangeRecord, TimeWindow};
use crate::upstream::{WikiApi, MAX_PAGE_SIZE};

pub async fn fetch_window(
    api: &WikiApi,
    window: TimeWindow,
    cap: usize,
    filters: &ChangeFilters,
) -> Vec<ChangeRecord> {
    let mut records: Vec<ChangeRecord> = Vec::new();
    let mut continuation: Option<String> = None;
    let mut pages = 0u32;

    while records.len() < cap {
        let page_size = MAX_PAGE_SIZE.min(cap - records.len());

        let page = match api
            .recent_changes(&window, page_size, continuation.as_deref(), filters)
            .await
        {
            Ok(page) => page,
            Err(e) => {
                log::warn!(
                    "⚠️  Change-log page {} failed for window {:?}..{:?}: {} (keeping {} records)",
                    pages + 1,
                    window.end,
                    window.start,
                    e,
                    records.len()
                );
                break;
            }
        };
        pages += 1;

        if page.records.is_empty() {
            break;
        }
        records.extend(page.records);

        match page.continuation {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }

    // A page larger than requested must not push the window past its cap
    records.truncate(cap);

    log::debug!(
        "Window {:?}..{:?}: {} records in {} pages",
        window.end,
        window.start,
        records.len(),
        pages
    );
    records
}
