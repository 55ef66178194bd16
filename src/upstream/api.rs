//! Typed upstream API
//!
//! Wraps an [`Upstream`] and turns each logical call (one change-log page,
//! one diff batch, one day of page views, ...) into a typed result. Action
//! API responses are checked for the embedded `error` envelope before
//! decoding, since the upstream reports many failures with HTTP 200.

use super::error::GatewayError;
use super::gateway::{Endpoint, Params, Upstream};
use crate::types::{ChangeFilters, ChangeRecord, TimeWindow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Largest page the change-log API serves in one request
pub const MAX_PAGE_SIZE: usize = 500;

/// Thumbnail width requested from the page-image API
pub const THUMBNAIL_SIZE: u32 = 100;

/// One page of change-log results plus the cursor for the next page
#[derive(Debug, Clone, Default)]
pub struct ChangePage {
    pub records: Vec<ChangeRecord>,
    pub continuation: Option<String>,
}

/// Rendered diff for one revision against its parent
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionDiff {
    pub rev_id: u64,
    pub html: String,
}

/// One row of a per-day top-viewed snapshot
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ArticleViews {
    pub article: String,
    pub views: u64,
}

/// Views of one article on one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyViews {
    pub date: NaiveDate,
    pub views: u64,
}

/// Thumbnail resolved for one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub page_id: u64,
    pub title: String,
    pub thumbnail: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Deserialize)]
struct RecentChangesBody {
    #[serde(default)]
    query: Option<RecentChangesQuery>,
    #[serde(rename = "continue", default)]
    continuation: Option<RecentChangesContinue>,
}

#[derive(Deserialize)]
struct RecentChangesQuery {
    #[serde(default)]
    recentchanges: Vec<ChangeRecord>,
}

#[derive(Deserialize)]
struct RecentChangesContinue {
    rccontinue: Option<String>,
}

#[derive(Deserialize)]
#[serde(bound = "P: Deserialize<'de>")]
struct PagesBody<P> {
    #[serde(default)]
    query: Option<PagesQuery<P>>,
}

#[derive(Deserialize)]
#[serde(bound = "P: Deserialize<'de>")]
struct PagesQuery<P> {
    #[serde(default)]
    pages: HashMap<String, P>,
}

#[derive(Deserialize)]
struct RevisionsPage {
    #[serde(default)]
    revisions: Vec<RevisionEntry>,
}

#[derive(Deserialize)]
struct RevisionEntry {
    revid: u64,
    #[serde(default)]
    diff: Option<DiffBody>,
}

#[derive(Deserialize)]
struct DiffBody {
    #[serde(rename = "*", default)]
    html: Option<String>,
}

#[derive(Deserialize)]
struct CompareBody {
    compare: DiffBody,
}

#[derive(Deserialize)]
struct ImagePage {
    #[serde(rename = "pageid", default)]
    page_id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    thumbnail: Option<ThumbnailBody>,
}

#[derive(Deserialize)]
struct ThumbnailBody {
    source: String,
}

#[derive(Deserialize)]
struct TopViewedBody {
    #[serde(default)]
    items: Vec<TopViewedItem>,
}

#[derive(Deserialize)]
struct TopViewedItem {
    #[serde(default)]
    articles: Vec<ArticleViews>,
}

#[derive(Deserialize)]
struct PerArticleBody {
    #[serde(default)]
    items: Vec<PerArticleItem>,
}

#[derive(Deserialize)]
struct PerArticleItem {
    timestamp: String,
    views: u64,
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Typed view over an [`Upstream`]
#[derive(Clone)]
pub struct WikiApi {
    upstream: Arc<dyn Upstream>,
    project: String,
}

impl WikiApi {
    pub fn new(upstream: Arc<dyn Upstream>, project: impl Into<String>) -> Self {
        Self {
            upstream,
            project: project.into(),
        }
    }

    async fn action<T: DeserializeOwned>(&self, params: Params) -> Result<T, GatewayError> {
        let body = self.upstream.query(&Endpoint::Action, &params).await?;
        if let Some(error) = body.get("error") {
            let error: ApiErrorBody = serde_json::from_value(error.clone())?;
            return Err(GatewayError::rejected(error.code, error.info));
        }
        Ok(serde_json::from_value(body)?)
    }

    async fn page_views(&self, segments: Vec<String>) -> Result<Value, GatewayError> {
        self.upstream
            .query(&Endpoint::PageViews(segments), &[])
            .await
    }

    /// Fetch one change-log page
    pub async fn recent_changes(
        &self,
        window: &TimeWindow,
        limit: usize,
        continuation: Option<&str>,
        filters: &ChangeFilters,
    ) -> Result<ChangePage, GatewayError> {
        let mut params: Params = vec![
            ("action", "query".to_string()),
            ("list", "recentchanges".to_string()),
            ("rcprop", filters.props.to_string()),
            ("rcnamespace", filters.namespace.to_string()),
            ("rclimit", limit.min(MAX_PAGE_SIZE).to_string()),
        ];
        if let Some(start) = window.start {
            params.push(("rcstart", format_timestamp(start)));
        }
        if let Some(end) = window.end {
            params.push(("rcend", format_timestamp(end)));
        }
        if let Some(token) = continuation {
            params.push(("rccontinue", token.to_string()));
        }
        if filters.anon_only {
            params.push(("rcshow", "anon".to_string()));
        }
        if let Some(user) = &filters.user {
            params.push(("rcuser", user.clone()));
        }
        if let Some(title) = &filters.title {
            params.push(("rctitle", title.clone()));
        }
        if let Some(change_type) = filters.change_type {
            params.push(("rctype", change_type.as_str().to_string()));
        }

        let body: RecentChangesBody = self.action(params).await?;
        Ok(ChangePage {
            records: body.query.map(|q| q.recentchanges).unwrap_or_default(),
            continuation: body.continuation.and_then(|c| c.rccontinue),
        })
    }

    /// Fetch rendered diffs (against the parent revision) for a batch of revisions
    pub async fn revision_diffs(&self, rev_ids: &[u64]) -> Result<Vec<RevisionDiff>, GatewayError> {
        let ids = rev_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("|");
        let params: Params = vec![
            ("action", "query".to_string()),
            ("prop", "revisions".to_string()),
            ("rvdiffto", "prev".to_string()),
            ("revids", ids),
        ];

        let body: PagesBody<RevisionsPage> = self.action(params).await?;
        let diffs = body
            .query
            .map(|q| q.pages)
            .unwrap_or_default()
            .into_values()
            .flat_map(|page| page.revisions)
            .filter_map(|rev| {
                let html = rev.diff.and_then(|d| d.html)?;
                Some(RevisionDiff {
                    rev_id: rev.revid,
                    html,
                })
            })
            .collect();
        Ok(diffs)
    }

    /// Rendered diff of one revision against its parent
    pub async fn compare_with_previous(&self, rev_id: u64) -> Result<String, GatewayError> {
        let params: Params = vec![
            ("action", "compare".to_string()),
            ("fromrev", rev_id.to_string()),
            ("torelative", "prev".to_string()),
        ];

        let body: CompareBody = self.action(params).await?;
        body.compare
            .html
            .ok_or_else(|| GatewayError::Decode(format!("compare for {} carried no diff body", rev_id)))
    }

    /// Thumbnails for a batch of page ids
    pub async fn page_images_by_ids(&self, page_ids: &[u64]) -> Result<Vec<PageImage>, GatewayError> {
        let ids = page_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("|");
        self.page_images(("pageids", ids)).await
    }

    /// Thumbnails for a batch of titles
    pub async fn page_images_by_titles(&self, titles: &[String]) -> Result<Vec<PageImage>, GatewayError> {
        self.page_images(("titles", titles.join("|"))).await
    }

    async fn page_images(&self, selector: (&'static str, String)) -> Result<Vec<PageImage>, GatewayError> {
        let params: Params = vec![
            ("action", "query".to_string()),
            ("prop", "pageimages".to_string()),
            ("pithumbsize", THUMBNAIL_SIZE.to_string()),
            selector,
        ];

        let body: PagesBody<ImagePage> = self.action(params).await?;
        let images = body
            .query
            .map(|q| q.pages)
            .unwrap_or_default()
            .into_values()
            .filter_map(|page| {
                let thumbnail = page.thumbnail?.source;
                Some(PageImage {
                    page_id: page.page_id,
                    title: page.title,
                    thumbnail,
                })
            })
            .collect();
        Ok(images)
    }

    /// Published top-viewed snapshot for one day (empty if not yet published)
    pub async fn top_viewed_day(&self, date: NaiveDate) -> Result<Vec<ArticleViews>, GatewayError> {
        let segments = vec![
            "top".to_string(),
            self.project.clone(),
            "all-access".to_string(),
            date.format("%Y").to_string(),
            date.format("%m").to_string(),
            date.format("%d").to_string(),
        ];
        let body: TopViewedBody = serde_json::from_value(self.page_views(segments).await?)?;
        Ok(body
            .items
            .into_iter()
            .next()
            .map(|item| item.articles)
            .unwrap_or_default())
    }

    /// Daily views of one article over `[from, to]` (inclusive dates)
    pub async fn article_daily_views(
        &self,
        title: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyViews>, GatewayError> {
        let segments = vec![
            "per-article".to_string(),
            self.project.clone(),
            "all-access".to_string(),
            "user".to_string(),
            title.replace(' ', "_"),
            "daily".to_string(),
            from.format("%Y%m%d00").to_string(),
            to.format("%Y%m%d00").to_string(),
        ];
        let body: PerArticleBody = serde_json::from_value(self.page_views(segments).await?)?;

        body.items
            .into_iter()
            .map(|item| {
                let day = item.timestamp.get(..8).unwrap_or(&item.timestamp);
                let date = NaiveDate::parse_from_str(day, "%Y%m%d")
                    .map_err(|e| GatewayError::Decode(format!("bad page-view timestamp {}: {}", item.timestamp, e)))?;
                Ok(DailyViews {
                    date,
                    views: item.views,
                })
            })
            .collect()
    }
}
