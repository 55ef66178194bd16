//! Windowed fetcher: fan-out over equal sub-windows for long ranges
//!
//! Ranges longer than the partition threshold (the 7-day case) are split
//! into a fixed number of sub-windows, each fetched by its own paginated
//! worker. All workers are joined before the merge; the merged sample is
//! re-sorted newest-first and truncated to the target count. Shorter or
//! unbounded ranges go through a single sequential worker.
//!
//! The upstream treats both window bounds as inclusive, so an edit stamped
//! exactly on a shared sub-window bound comes back from both neighbours.
//! The merge keeps one copy per revision id.
//!
//! Workers run inside the caller's future, so dropping the caller drops
//! every in-flight request.

use super::worker::fetch_window;
use crate::types::{ChangeFilters, ChangeRecord, Period, TimeWindow};
use crate::upstream::WikiApi;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

/// Partitioning policy for long ranges
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    /// Ranges strictly longer than this are partitioned
    pub partition_threshold: Duration,
    /// Number of sub-windows (4 per day over a week)
    pub partitions: u32,
    /// Lower bound on each sub-window's cap
    pub per_window_floor: usize,
    /// Divisor applied to the target count for each sub-window's cap.
    /// Smaller than `partitions` so each shard over-provisions for uneven density.
    pub per_window_divisor: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            partition_threshold: Duration::hours(24),
            partitions: 28,
            per_window_floor: 200,
            per_window_divisor: 20,
        }
    }
}

impl FetchPolicy {
    pub fn per_window_cap(&self, target_count: usize) -> usize {
        self.per_window_floor
            .max(target_count / self.per_window_divisor.max(1))
    }

    fn should_partition(&self, range: &TimeWindow) -> bool {
        range
            .duration()
            .map(|d| d > self.partition_threshold)
            .unwrap_or(false)
    }
}

#[derive(Clone)]
pub struct WindowedFetcher {
    api: WikiApi,
    policy: FetchPolicy,
    now_fn: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl WindowedFetcher {
    pub fn new(api: WikiApi, policy: FetchPolicy) -> Self {
        Self::new_with_clock(api, policy, Arc::new(Utc::now))
    }

    /// Create a fetcher with a custom clock (deterministic window bounds in tests)
    pub fn new_with_clock(
        api: WikiApi,
        policy: FetchPolicy,
        now_fn: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    ) -> Self {
        Self { api, policy, now_fn }
    }

    pub fn api(&self) -> &WikiApi {
        &self.api
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_fn)()
    }

    /// Fetch up to `target_count` records for a logical period ending now
    pub async fn fetch_period(
        &self,
        period: Period,
        target_count: usize,
        filters: &ChangeFilters,
    ) -> Vec<ChangeRecord> {
        let now = self.now();
        let bounded = period.duration().map(|d| TimeWindow::new(now, now - d));
        // Unpartitioned ranges are sent without rcstart so the upstream uses its own clock
        let range = match bounded {
            Some(range) if self.policy.should_partition(&range) => range,
            _ => period.window_ending(now),
        };
        self.fetch_range(range, target_count, filters).await
    }

    /// Fetch up to `target_count` records inside `range`, newest first
    pub async fn fetch_range(
        &self,
        range: TimeWindow,
        target_count: usize,
        filters: &ChangeFilters,
    ) -> Vec<ChangeRecord> {
        if target_count == 0 {
            return Vec::new();
        }

        if !self.policy.should_partition(&range) {
            return fetch_window(&self.api, range, target_count, filters).await;
        }

        let started = std::time::Instant::now();
        let cap = self.policy.per_window_cap(target_count);
        let windows = range.partition(self.policy.partitions);
        let workers = windows
            .iter()
            .map(|window| fetch_window(&self.api, *window, cap, filters));

        let shards = join_all(workers).await;
        let fetched: usize = shards.iter().map(Vec::len).sum();

        let mut seen: HashSet<u64> = HashSet::with_capacity(fetched);
        let mut merged: Vec<ChangeRecord> = shards
            .into_iter()
            .flatten()
            .filter(|record| record.rev_id == 0 || seen.insert(record.rev_id))
            .collect();
        let duplicates = fetched - merged.len();

        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        merged.truncate(target_count);

        log::info!(
            "📥 Fetched {} records across {} sub-windows (cap {} each, {} on shared bounds), kept {} in {:?}",
            fetched,
            windows.len(),
            cap,
            duplicates,
            merged.len(),
            started.elapsed()
        );
        merged
    }
}
