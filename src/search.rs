//! Diff search
//!
//! Resolves the recent article edits of a period, pulls their rendered diffs
//! in batches and keeps every edit whose diff markup contains the query.
//! Each hit is classified by where the query sits in the markup:
//!
//! - only inside `diff-addedline` cells: [`MatchStatus::Added`]
//! - only inside `diff-deletedline` cells: [`MatchStatus::Removed`]
//! - in both, or only in context/markup: [`MatchStatus::Unknown`]
//!
//! This is substring matching over HTML, not a diff parse. A query that
//! matches attribute names or tags will produce `Unknown` hits.

use crate::fetch::WindowedFetcher;
use crate::types::{ChangeFilters, ChangeRecord, MatchStatus, Period, LISTING_PROPS};
use std::collections::HashMap;

/// Revisions per diff request
pub const DIFF_BATCH_SIZE: usize = 50;

/// Change records examined per search
pub const SEARCH_SAMPLE_SIZE: usize = 500;

const ADDED_MARKER: &str = "diff-addedline";
const REMOVED_MARKER: &str = "diff-deletedline";
const CELL_END: &str = "</td>";

/// True if `query` occurs inside any cell opened by `marker`
fn found_in_regions(html: &str, marker: &str, query: &str) -> bool {
    let mut rest = html;
    while let Some(at) = rest.find(marker) {
        let region = &rest[at + marker.len()..];
        let region = match region.find(CELL_END) {
            Some(end) => &region[..end],
            None => region,
        };
        if region.contains(query) {
            return true;
        }
        rest = &rest[at + marker.len()..];
    }
    false
}

/// Classify a diff against `query`; `None` if the diff does not mention it at all
pub fn classify_match(html: &str, query: &str) -> Option<MatchStatus> {
    if query.is_empty() || !html.contains(query) {
        return None;
    }
    let added = found_in_regions(html, ADDED_MARKER, query);
    let removed = found_in_regions(html, REMOVED_MARKER, query);

    Some(match (added, removed) {
        (true, false) => MatchStatus::Added,
        (false, true) => MatchStatus::Removed,
        _ => MatchStatus::Unknown,
    })
}

/// Search the article edits of `period` for `query`, in fetch order
///
/// Hits carry their classification in `status`. Thumbnails are not attached.
pub async fn search_diffs(fetcher: &WindowedFetcher, query: &str, period: Period) -> Vec<ChangeRecord> {
    if query.is_empty() {
        return Vec::new();
    }

    let filters = ChangeFilters::default().namespace(0).props(LISTING_PROPS);
    // 7d fans out to 28 sub-windows at the 200-record floor (up to 5600 records)
    // and keeps the newest 500, so weekly searches cover the latest edits only.
    let records = fetcher.fetch_period(period, SEARCH_SAMPLE_SIZE, &filters).await;
    if records.is_empty() {
        return Vec::new();
    }

    let rev_ids: Vec<u64> = records.iter().map(|r| r.rev_id).filter(|id| *id != 0).collect();
    let mut statuses: HashMap<u64, MatchStatus> = HashMap::new();

    for (batch_no, batch) in rev_ids.chunks(DIFF_BATCH_SIZE).enumerate() {
        match fetcher.api().revision_diffs(batch).await {
            Ok(diffs) => {
                for diff in diffs {
                    if let Some(status) = classify_match(&diff.html, query) {
                        statuses.insert(diff.rev_id, status);
                    }
                }
            }
            Err(e) => log::warn!("⚠️  Diff batch {} ({} revisions) failed: {}", batch_no + 1, batch.len(), e),
        }
    }

    let hits: Vec<ChangeRecord> = records
        .into_iter()
        .filter_map(|mut record| {
            let status = statuses.get(&record.rev_id)?;
            record.status = Some(*status);
            Some(record)
        })
        .collect();

    log::info!(
        "🔎 Search for {:?} over {}: {} hits in {} diffs",
        query,
        period.as_str(),
        hits.len(),
        rev_ids.len()
    );
    hits
}
