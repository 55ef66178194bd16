//! Page-view aggregation
//!
//! Two strategies, chosen by whether a user filter is present:
//!
//! - **Global**: read the platform's per-day top-viewed snapshots. 24h uses
//!   the most recent published day, stepping back exactly one extra day if
//!   that snapshot is missing (publication lag). 7d reads seven days
//!   concurrently and sums views per title.
//! - **Per user**: an arbitrary user's articles rarely appear in the global
//!   top list, so the caller resolves the user's articles first and this
//!   module fetches per-article daily counts for them over a trailing window.
//!   24h takes the latest available day; 7d sums every available day.
//!
//! Failed fetches contribute zero views.

use crate::types::Period;
use crate::upstream::{ArticleViews, DailyViews, WikiApi};
use chrono::{Duration, NaiveDate};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;

/// Days of page-view history covered by the 7d view
pub const WEEK_DAYS: i64 = 7;

/// Extra days searched when the latest day is not yet published (per-user 24h view)
pub const PUBLICATION_LAG_DAYS: i64 = 2;

/// Per-article requests issued concurrently in the per-user view
pub const ARTICLE_FETCH_CONCURRENCY: usize = 7;

/// One row of a top-viewed view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewedArticle {
    pub rank: usize,
    /// Display title (spaces)
    pub title: String,
    /// Title as used by the page-view and page-image APIs (underscores)
    #[serde(rename = "page_title_for_api")]
    pub api_title: String,
    pub views: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Clone)]
pub struct PageViewAggregator {
    api: WikiApi,
    main_page: String,
    excluded_prefixes: Vec<String>,
}

impl PageViewAggregator {
    pub fn new(api: WikiApi, main_page: impl Into<String>, excluded_prefixes: Vec<String>) -> Self {
        Self {
            api,
            main_page: main_page.into(),
            excluded_prefixes,
        }
    }

    /// Home page, special and project pages never count as articles
    pub fn is_excluded(&self, api_title: &str) -> bool {
        api_title == "-"
            || api_title == self.main_page
            || self
                .excluded_prefixes
                .iter()
                .any(|prefix| api_title.starts_with(prefix.as_str()))
    }

    async fn fetch_day(&self, date: NaiveDate) -> Vec<ArticleViews> {
        match self.api.top_viewed_day(date).await {
            Ok(articles) => articles,
            Err(e) => {
                log::warn!("⚠️  Top-viewed snapshot for {} unavailable: {}", date, e);
                Vec::new()
            }
        }
    }

    /// Snapshot for `day`, or for the day before if `day` is not yet published
    pub async fn latest_published_day(&self, day: NaiveDate) -> Vec<ArticleViews> {
        let articles = self.fetch_day(day).await;
        if !articles.is_empty() {
            return articles;
        }
        let previous = day - Duration::days(1);
        log::info!("Top-viewed snapshot for {} empty, falling back to {}", day, previous);
        self.fetch_day(previous).await
    }

    /// Global top-viewed ranking (untruncated) as of `today`
    pub async fn top_viewed(&self, period: Period, today: NaiveDate) -> Vec<ViewedArticle> {
        let yesterday = today - Duration::days(1);

        let days: Vec<Vec<ArticleViews>> = match period {
            Period::Week1 => {
                let fetches = (0..WEEK_DAYS).map(|i| self.fetch_day(yesterday - Duration::days(i)));
                join_all(fetches).await
            }
            _ => vec![self.latest_published_day(yesterday).await],
        };

        let mut order: Vec<String> = Vec::new();
        let mut totals: HashMap<String, u64> = HashMap::new();
        for article in days.into_iter().flatten() {
            if self.is_excluded(&article.article) {
                continue;
            }
            match totals.get_mut(&article.article) {
                Some(total) => *total += article.views,
                None => {
                    order.push(article.article.clone());
                    totals.insert(article.article, article.views);
                }
            }
        }

        let rows = order.into_iter().map(|api_title| {
            let views = totals.get(&api_title).copied().unwrap_or(0);
            (api_title, views)
        });
        rank_rows(rows)
    }

    /// View ranking for a specific set of articles (titles with spaces or underscores)
    pub async fn article_views(&self, titles: &[String], period: Period, today: NaiveDate) -> Vec<ViewedArticle> {
        let to = today - Duration::days(1);
        let from = match period {
            Period::Week1 => today - Duration::days(WEEK_DAYS),
            _ => to - Duration::days(PUBLICATION_LAG_DAYS),
        };

        let mut rows: Vec<(String, u64)> = Vec::with_capacity(titles.len());
        for chunk in titles.chunks(ARTICLE_FETCH_CONCURRENCY) {
            let fetches = chunk.iter().map(|title| self.api.article_daily_views(title, from, to));
            let results = join_all(fetches).await;

            for (title, result) in chunk.iter().zip(results) {
                let api_title = title.replace(' ', "_");
                if self.is_excluded(&api_title) {
                    continue;
                }
                let views = match result {
                    Ok(days) => views_for_period(&days, period),
                    Err(e) => {
                        log::warn!("⚠️  Page views for {} unavailable: {}", title, e);
                        0
                    }
                };
                rows.push((api_title, views));
            }
        }

        rank_rows(rows.into_iter())
    }
}

/// Collapse daily counts: latest available day for short periods, sum for 7d
pub fn views_for_period(days: &[DailyViews], period: Period) -> u64 {
    match period {
        Period::Week1 => days.iter().map(|d| d.views).sum(),
        _ => days
            .iter()
            .max_by_key(|d| d.date)
            .map(|d| d.views)
            .unwrap_or(0),
    }
}

/// Sort by views (stable, first-seen wins ties) and assign 1-based ranks
fn rank_rows(rows: impl Iterator<Item = (String, u64)>) -> Vec<ViewedArticle> {
    let mut rows: Vec<(String, u64)> = rows.collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows.into_iter()
        .enumerate()
        .map(|(i, (api_title, views))| ViewedArticle {
            rank: i + 1,
            title: api_title.replace('_', " "),
            api_title,
            views,
            thumbnail: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::mock::ScriptedUpstream;
    use crate::upstream::{Endpoint, GatewayError};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn aggregator(upstream: Arc<ScriptedUpstream>) -> PageViewAggregator {
        PageViewAggregator::new(
            WikiApi::new(upstream, "he.wikipedia"),
            "עמוד_ראשי",
            vec!["מיוחד:".into(), "ויקיפדיה:".into()],
        )
    }

    fn segments(endpoint: &Endpoint) -> Vec<String> {
        match endpoint {
            Endpoint::PageViews(segments) => segments.clone(),
            Endpoint::Action => panic!("unexpected action query"),
        }
    }

    fn top_body(articles: &[(&str, u64)]) -> Value {
        let rows: Vec<Value> = articles
            .iter()
            .map(|(title, views)| json!({ "article": title, "views": views }))
            .collect();
        json!({ "items": [ { "articles": rows } ] })
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[tokio::test]
    async fn test_day_view_uses_yesterday_and_filters_non_articles() {
        let upstream = Arc::new(ScriptedUpstream::new(|endpoint, _| {
            let s = segments(endpoint);
            assert_eq!(&s[3..], ["2024", "03", "09"]);
            Ok(top_body(&[
                ("עמוד_ראשי", 90_000),
                ("מיוחד:חיפוש", 50_000),
                ("-", 40_000),
                ("ירושלים", 1_200),
                ("תל_אביב", 3_400),
            ]))
        }));

        let rows = aggregator(upstream.clone()).top_viewed(Period::Day1, today()).await;

        assert_eq!(upstream.call_count(), 1);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "תל אביב");
        assert_eq!(rows[0].api_title, "תל_אביב");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[1].rank, 2);
    }

    #[tokio::test]
    async fn test_unpublished_day_falls_back_exactly_once() {
        let upstream = Arc::new(ScriptedUpstream::new(|endpoint, _| {
            let s = segments(endpoint);
            match s[5].as_str() {
                "09" => Err(GatewayError::UpstreamStatus(404)),
                "08" => Ok(top_body(&[("A", 10)])),
                other => panic!("unexpected day {}", other),
            }
        }));

        let rows = aggregator(upstream.clone()).top_viewed(Period::Day1, today()).await;

        assert_eq!(upstream.call_count(), 2);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].views, 10);
    }

    #[tokio::test]
    async fn test_fallback_gives_up_after_one_extra_day() {
        let upstream = Arc::new(ScriptedUpstream::new(|_, _| Ok(top_body(&[]))));

        let rows = aggregator(upstream.clone()).top_viewed(Period::Day1, today()).await;

        assert!(rows.is_empty());
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_week_sums_seven_days_and_tolerates_failures() {
        let upstream = Arc::new(ScriptedUpstream::new(|endpoint, _| {
            let s = segments(endpoint);
            match s[5].as_str() {
                "05" => Err(GatewayError::Transport("timeout".into())),
                "09" => Ok(top_body(&[("B", 5), ("A", 100)])),
                _ => Ok(top_body(&[("A", 1), ("B", 50)])),
            }
        }));

        let rows = aggregator(upstream.clone()).top_viewed(Period::Week1, today()).await;

        assert_eq!(upstream.call_count(), 7);
        // 5 healthy non-"09" days; "05" contributes nothing
        assert_eq!(rows[0].api_title, "B");
        assert_eq!(rows[0].views, 5 + 50 * 5);
        assert_eq!(rows[1].views, 100 + 5);
    }

    #[tokio::test]
    async fn test_article_views_latest_day_for_24h() {
        let upstream = Arc::new(ScriptedUpstream::new(|endpoint, _| {
            let s = segments(endpoint);
            assert_eq!(s[6], "2024030700");
            assert_eq!(s[7], "2024030900");
            Ok(json!({ "items": [
                { "timestamp": "2024030700", "views": 70 },
                { "timestamp": "2024030800", "views": 80 }
            ]}))
        }));

        let rows = aggregator(upstream)
            .article_views(&["Some Page".to_string()], Period::Day1, today())
            .await;

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].api_title, "Some_Page");
        assert_eq!(rows[0].views, 80);
    }

    #[tokio::test]
    async fn test_article_views_sum_for_week_and_zero_on_failure() {
        let upstream = Arc::new(ScriptedUpstream::new(|endpoint, _| {
            let s = segments(endpoint);
            assert_eq!(s[6], "2024030300");
            if s[4] == "Broken" {
                return Err(GatewayError::UpstreamStatus(404));
            }
            Ok(json!({ "items": [
                { "timestamp": "2024030700", "views": 7 },
                { "timestamp": "2024030800", "views": 8 },
                { "timestamp": "2024030900", "views": 9 }
            ]}))
        }));

        let titles = vec!["Broken".to_string(), "Healthy".to_string()];
        let rows = aggregator(upstream).article_views(&titles, Period::Week1, today()).await;

        assert_eq!(rows[0].api_title, "Healthy");
        assert_eq!(rows[0].views, 24);
        assert_eq!(rows[1].api_title, "Broken");
        assert_eq!(rows[1].views, 0);
    }
}
