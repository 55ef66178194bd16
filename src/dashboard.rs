//! Dashboard facade - one entry point per view
//!
//! Wires the typed API, the windowed fetcher, the page-view aggregator, the
//! thumbnail enricher and the TTL cache together. Every view degrades to an
//! empty or partial result on upstream failure; none of them returns an
//! error.
//!
//! ## Flow
//!
//! ```text
//! Dashboard::top_edited()
//!     ↓
//! TtlCache::memoize()  ── hit ──→ cached Arc<Vec<_>>
//!     ↓ miss
//! WindowedFetcher::fetch_period()  (28 sub-windows for 7d)
//!     ↓
//! rank_by_unique_contributors() → truncate(limit)
//!     ↓
//! ThumbnailEnricher::decorate_pages()
//! ```
//!
//! ## Caching
//!
//! | View | Cached | TTL (default) |
//! |---|---|---|
//! | recent_edits | no | |
//! | top_edited / top_editors / top_talk_pages | yes | 300s |
//! | new_articles | yes | 60s |
//! | top_viewed | yes | 900s |
//! | search / revision_diff | no | |

use crate::aggregate::{
    rank_by_edit_count, rank_by_unique_contributors, ActivitySort, EditorActivity, PageActivity,
    PageViewAggregator, RecentSort, ViewedArticle,
};
use crate::cache::{CacheParams, Operation, TtlCache};
use crate::config::EdiscoConfig;
use crate::enrich::ThumbnailEnricher;
use crate::fetch::{fetch_window, FetchPolicy, WindowedFetcher};
use crate::search::search_diffs;
use crate::types::{
    ChangeFilters, ChangeRecord, ChangeType, Period, AGGREGATION_PROPS, LISTING_PROPS, MINIMAL_PROPS,
    NEW_ARTICLE_PROPS,
};
use crate::upstream::{Upstream, WikiApi};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Records examined by the recent-edits listing before sorting
pub const RECENT_SAMPLE_SIZE: usize = 500;

/// Records examined when resolving the articles a user touched (top-viewed by user)
pub const USER_ARTICLE_SAMPLE_SIZE: usize = 500;

/// Most articles looked up per user in the top-viewed view
pub const MAX_USER_ARTICLES: usize = 100;

const ARTICLE_NAMESPACE: i32 = 0;
const TALK_NAMESPACE: i32 = 1;

/// Sample size for page-activity views (top-edited, top talk pages)
pub fn activity_sample_size(period: Period) -> usize {
    match period {
        Period::Week1 => 10_000,
        _ => 2_000,
    }
}

/// Sample size for the top-editors view
pub fn editor_sample_size(period: Period) -> usize {
    match period {
        Period::Week1 => 25_000,
        _ => 5_000,
    }
}

/// Caller-facing filters shared by every change-log view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilters {
    pub anon_only: bool,
    pub user: Option<String>,
    pub title: Option<String>,
}

impl ViewFilters {
    fn change_filters(&self, namespace: i32, props: &'static str) -> ChangeFilters {
        ChangeFilters::default()
            .namespace(namespace)
            .anon_only(self.anon_only)
            .user(self.user.clone())
            .title(self.title.clone())
            .props(props)
    }

    fn cache_params(&self, limit: usize, period: Period) -> CacheParams {
        CacheParams::new()
            .with("limit", limit)
            .with("period", period.as_str())
            .with("anon_only", self.anon_only)
            .with_opt("user", self.user.as_deref())
            .with_opt("title", self.title.as_deref())
    }
}

pub struct Dashboard {
    fetcher: WindowedFetcher,
    pageviews: PageViewAggregator,
    enricher: ThumbnailEnricher,
    cache: TtlCache,
}

impl Dashboard {
    /// Create a dashboard on the system clock
    pub fn new(config: &EdiscoConfig, upstream: Arc<dyn Upstream>) -> Self {
        Self::new_with_clock(config, upstream, Arc::new(Utc::now))
    }

    /// Create a dashboard with a custom clock
    ///
    /// The same clock drives fetch windows, page-view dates and cache expiry.
    ///
    /// # Arguments
    /// * `config` - Endpoints, exclusions and TTLs
    /// * `upstream` - Gateway used for every upstream call
    /// * `now_fn` - Current time (for testing)
    pub fn new_with_clock(
        config: &EdiscoConfig,
        upstream: Arc<dyn Upstream>,
        now_fn: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
    ) -> Self {
        let api = WikiApi::new(upstream, config.project.clone());
        let cache_clock = now_fn.clone();

        Self {
            fetcher: WindowedFetcher::new_with_clock(api.clone(), FetchPolicy::default(), now_fn),
            pageviews: PageViewAggregator::new(
                api.clone(),
                config.main_page.clone(),
                config.excluded_view_prefixes.clone(),
            ),
            enricher: ThumbnailEnricher::new(api, config.talk_prefixes.clone()),
            cache: TtlCache::new_with_timestamp_fn(
                config.ttl_table(),
                Box::new(move || cache_clock().timestamp_millis()),
            ),
        }
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Latest article edits, optionally re-sorted by size delta
    pub async fn recent_edits(
        &self,
        limit: usize,
        period: Period,
        filters: &ViewFilters,
        sort: RecentSort,
    ) -> Vec<ChangeRecord> {
        let change_filters = filters.change_filters(ARTICLE_NAMESPACE, LISTING_PROPS);
        let mut records = self
            .fetcher
            .fetch_period(period, RECENT_SAMPLE_SIZE.max(limit), &change_filters)
            .await;

        sort.apply(&mut records);
        records.truncate(limit);
        self.enricher.decorate_records(&mut records).await;
        records
    }

    /// Articles with the most distinct contributors
    pub async fn top_edited(
        &self,
        limit: usize,
        period: Period,
        filters: &ViewFilters,
        sort: ActivitySort,
    ) -> Arc<Vec<PageActivity>> {
        let params = filters.cache_params(limit, period).with("sort", sort.as_str());
        let change_filters = filters.change_filters(ARTICLE_NAMESPACE, AGGREGATION_PROPS);

        self.cache
            .memoize(Operation::TopEdited, params, || async move {
                let records = self
                    .fetcher
                    .fetch_period(period, activity_sample_size(period), &change_filters)
                    .await;
                let mut ranked = rank_by_unique_contributors(&records, sort);
                ranked.truncate(limit);
                self.enricher.decorate_pages(&mut ranked).await;

                log::info!(
                    "📊 top_edited {}: {} pages from {} records",
                    period.as_str(),
                    ranked.len(),
                    records.len()
                );
                ranked
            })
            .await
    }

    /// Users with the most article edits
    pub async fn top_editors(&self, limit: usize, period: Period, filters: &ViewFilters) -> Arc<Vec<EditorActivity>> {
        let params = filters.cache_params(limit, period);
        let change_filters = filters.change_filters(ARTICLE_NAMESPACE, MINIMAL_PROPS);

        self.cache
            .memoize(Operation::TopEditors, params, || async move {
                let records = self
                    .fetcher
                    .fetch_period(period, editor_sample_size(period), &change_filters)
                    .await;
                let mut ranked = rank_by_edit_count(&records);
                ranked.truncate(limit);

                log::info!(
                    "📊 top_editors {}: {} editors from {} records",
                    period.as_str(),
                    ranked.len(),
                    records.len()
                );
                ranked
            })
            .await
    }

    /// Talk pages with the most distinct participants
    pub async fn top_talk_pages(&self, limit: usize, period: Period, filters: &ViewFilters) -> Arc<Vec<PageActivity>> {
        let params = filters.cache_params(limit, period);
        let change_filters = filters.change_filters(TALK_NAMESPACE, AGGREGATION_PROPS);

        self.cache
            .memoize(Operation::TopTalkPages, params, || async move {
                let records = self
                    .fetcher
                    .fetch_period(period, activity_sample_size(period), &change_filters)
                    .await;
                let mut ranked = rank_by_unique_contributors(&records, ActivitySort::Count);
                ranked.truncate(limit);
                self.enricher.decorate_talk_pages(&mut ranked).await;

                log::info!(
                    "📊 top_talk_pages {}: {} pages from {} records",
                    period.as_str(),
                    ranked.len(),
                    records.len()
                );
                ranked
            })
            .await
    }

    /// Newest article creations, newest first
    pub async fn new_articles(&self, limit: usize, period: Period, filters: &ViewFilters) -> Arc<Vec<ChangeRecord>> {
        let params = filters.cache_params(limit, period);
        let change_filters = filters
            .change_filters(ARTICLE_NAMESPACE, NEW_ARTICLE_PROPS)
            .change_type(ChangeType::New);

        self.cache
            .memoize(Operation::NewArticles, params, || async move {
                let window = period.window_ending(self.fetcher.now());
                let mut records = fetch_window(self.fetcher.api(), window, limit, &change_filters).await;
                self.enricher.decorate_records(&mut records).await;
                records
            })
            .await
    }

    /// Most viewed articles, globally or among the articles a user edited
    ///
    /// A `title` filter restricts the view to that single article; a `user`
    /// filter switches to per-article statistics for the user's articles.
    /// `anon_only` does not apply to page views.
    pub async fn top_viewed(&self, limit: usize, period: Period, filters: &ViewFilters) -> Arc<Vec<ViewedArticle>> {
        let params = CacheParams::new()
            .with("limit", limit)
            .with("period", period.as_str())
            .with_opt("user", filters.user.as_deref())
            .with_opt("title", filters.title.as_deref());

        self.cache
            .memoize(Operation::TopViewed, params, || async move {
                let today = self.fetcher.now().date_naive();

                let mut rows = if let Some(title) = &filters.title {
                    self.pageviews.article_views(&[title.clone()], period, today).await
                } else if let Some(user) = &filters.user {
                    let titles = self.articles_touched_by(user, period).await;
                    self.pageviews.article_views(&titles, period, today).await
                } else {
                    self.pageviews.top_viewed(period, today).await
                };

                rows.truncate(limit);
                self.enricher.decorate_viewed(&mut rows).await;
                rows
            })
            .await
    }

    /// Distinct articles `user` edited in `period`, most recent first
    async fn articles_touched_by(&self, user: &str, period: Period) -> Vec<String> {
        let change_filters = ChangeFilters::default()
            .namespace(ARTICLE_NAMESPACE)
            .user(Some(user.to_string()))
            .props(MINIMAL_PROPS);
        let records = self
            .fetcher
            .fetch_period(period, USER_ARTICLE_SAMPLE_SIZE, &change_filters)
            .await;

        let mut seen = HashSet::new();
        let titles: Vec<String> = records
            .into_iter()
            .filter(|r| !r.title.is_empty() && seen.insert(r.title.clone()))
            .map(|r| r.title)
            .take(MAX_USER_ARTICLES)
            .collect();

        log::debug!("{} touched {} articles in {}", user, titles.len(), period.as_str());
        titles
    }

    /// Article edits in `period` whose diff contains `query`
    pub async fn search(&self, query: &str, period: Period) -> Vec<ChangeRecord> {
        let mut hits = search_diffs(&self.fetcher, query, period).await;
        self.enricher.decorate_records(&mut hits).await;
        hits
    }

    /// Rendered diff of one revision against its parent, `None` on any failure
    pub async fn revision_diff(&self, rev_id: u64) -> Option<String> {
        match self.fetcher.api().compare_with_previous(rev_id).await {
            Ok(html) => Some(html),
            Err(e) => {
                log::warn!("⚠️  Diff for revision {} unavailable: {}", rev_id, e);
                None
            }
        }
    }
}
