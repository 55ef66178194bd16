//! Thumbnail enrichment
//!
//! Applied after ranking and truncation, so only the rows actually returned
//! are looked up. Lookups go out in batches of [`IMAGE_BATCH_SIZE`]; a failed
//! batch is logged and its rows simply stay without a thumbnail.

use crate::aggregate::{PageActivity, ViewedArticle};
use crate::types::ChangeRecord;
use crate::upstream::WikiApi;
use std::collections::{HashMap, HashSet};

/// Pages or titles per page-image request
pub const IMAGE_BATCH_SIZE: usize = 50;

#[derive(Clone)]
pub struct ThumbnailEnricher {
    api: WikiApi,
    talk_prefixes: Vec<String>,
}

impl ThumbnailEnricher {
    pub fn new(api: WikiApi, talk_prefixes: Vec<String>) -> Self {
        Self { api, talk_prefixes }
    }

    /// Title of the article a talk page discusses (unchanged for non-talk titles)
    pub fn subject_title<'a>(&self, title: &'a str) -> &'a str {
        self.talk_prefixes
            .iter()
            .find_map(|prefix| title.strip_prefix(prefix.as_str()))
            .unwrap_or(title)
    }

    /// Thumbnail URL per page id; ids without an image are absent
    pub async fn by_page_id(&self, page_ids: &[u64]) -> HashMap<u64, String> {
        let mut seen = HashSet::new();
        let unique: Vec<u64> = page_ids
            .iter()
            .copied()
            .filter(|id| *id != 0 && seen.insert(*id))
            .collect();

        let mut thumbnails = HashMap::new();
        for chunk in unique.chunks(IMAGE_BATCH_SIZE) {
            match self.api.page_images_by_ids(chunk).await {
                Ok(images) => {
                    for image in images {
                        thumbnails.insert(image.page_id, image.thumbnail);
                    }
                }
                Err(e) => log::warn!("⚠️  Thumbnail batch of {} page ids failed: {}", chunk.len(), e),
            }
        }
        thumbnails
    }

    /// Thumbnail URL per title, reachable by both the spaced and underscored form
    pub async fn by_title(&self, titles: &[String]) -> HashMap<String, String> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = titles
            .iter()
            .filter(|t| !t.is_empty() && seen.insert(t.as_str()))
            .cloned()
            .collect();

        let mut thumbnails = HashMap::new();
        for chunk in unique.chunks(IMAGE_BATCH_SIZE) {
            match self.api.page_images_by_titles(chunk).await {
                Ok(images) => {
                    for image in images {
                        thumbnails.insert(image.title.replace(' ', "_"), image.thumbnail.clone());
                        thumbnails.insert(image.title, image.thumbnail);
                    }
                }
                Err(e) => log::warn!("⚠️  Thumbnail batch of {} titles failed: {}", chunk.len(), e),
            }
        }
        thumbnails
    }

    pub async fn decorate_records(&self, records: &mut [ChangeRecord]) {
        if records.is_empty() {
            return;
        }
        let ids: Vec<u64> = records.iter().map(|r| r.page_id).collect();
        let thumbnails = self.by_page_id(&ids).await;
        for record in records.iter_mut() {
            record.thumbnail = thumbnails.get(&record.page_id).cloned();
        }
    }

    pub async fn decorate_pages(&self, pages: &mut [PageActivity]) {
        if pages.is_empty() {
            return;
        }
        let ids: Vec<u64> = pages.iter().map(|p| p.page_id).collect();
        let thumbnails = self.by_page_id(&ids).await;
        for page in pages.iter_mut() {
            page.thumbnail = thumbnails.get(&page.page_id).cloned();
        }
    }

    /// Talk pages rarely carry images, so the subject article's thumbnail is used
    pub async fn decorate_talk_pages(&self, pages: &mut [PageActivity]) {
        if pages.is_empty() {
            return;
        }
        let subjects: Vec<String> = pages
            .iter()
            .map(|p| self.subject_title(&p.title).to_string())
            .collect();
        let thumbnails = self.by_title(&subjects).await;
        for (page, subject) in pages.iter_mut().zip(&subjects) {
            page.thumbnail = thumbnails.get(subject).cloned();
        }
    }

    pub async fn decorate_viewed(&self, rows: &mut [ViewedArticle]) {
        if rows.is_empty() {
            return;
        }
        let titles: Vec<String> = rows.iter().map(|r| r.api_title.clone()).collect();
        let thumbnails = self.by_title(&titles).await;
        for row in rows.iter_mut() {
            row.thumbnail = thumbnails.get(&row.api_title).cloned();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::mock::ScriptedUpstream;
    use crate::upstream::{param, GatewayError};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    fn enricher(upstream: Arc<ScriptedUpstream>) -> ThumbnailEnricher {
        ThumbnailEnricher::new(
            WikiApi::new(upstream, "he.wikipedia"),
            vec!["שיחה:".into(), "Talk:".into()],
        )
    }

    /// Every requested page id gets an image except those divisible by 3
    fn images_for_ids(params: &[(&'static str, String)]) -> Value {
        let mut pages = Map::new();
        for id in param(params, "pageids").unwrap().split('|') {
            let n: u64 = id.parse().unwrap();
            let mut page = json!({ "pageid": n, "title": format!("P{}", n) });
            if n % 3 != 0 {
                page["thumbnail"] = json!({ "source": format!("https://img/{}.jpg", n) });
            }
            pages.insert(id.to_string(), page);
        }
        json!({ "query": { "pages": pages } })
    }

    #[test]
    fn test_subject_title_strips_talk_prefix() {
        let enricher = enricher(Arc::new(ScriptedUpstream::new(|_, _| Ok(json!({})))));
        assert_eq!(enricher.subject_title("שיחה:ירושלים"), "ירושלים");
        assert_eq!(enricher.subject_title("Talk:Paris"), "Paris");
        assert_eq!(enricher.subject_title("Paris"), "Paris");
    }

    #[tokio::test]
    async fn test_ids_are_deduplicated_and_batched() {
        let upstream = Arc::new(ScriptedUpstream::new(|_, p| Ok(images_for_ids(p))));
        let enricher = enricher(upstream.clone());
        let mut ids: Vec<u64> = (1..=120).collect();
        ids.extend(1..=10);

        let thumbnails = enricher.by_page_id(&ids).await;

        assert_eq!(upstream.call_count(), 3);
        assert_eq!(thumbnails.len(), 120 - 40);
        assert_eq!(thumbnails.get(&1).map(String::as_str), Some("https://img/1.jpg"));
        assert!(thumbnails.get(&3).is_none());
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_rows_undecorated() {
        let upstream = Arc::new(ScriptedUpstream::new(|_, p| {
            let first: u64 = param(p, "pageids").unwrap().split('|').next().unwrap().parse().unwrap();
            if first > 50 {
                Err(GatewayError::Transport("timeout".into()))
            } else {
                Ok(images_for_ids(p))
            }
        }));
        let enricher = enricher(upstream);
        let ids: Vec<u64> = (1..=100).collect();

        let thumbnails = enricher.by_page_id(&ids).await;

        assert!(thumbnails.contains_key(&50));
        assert!(!thumbnails.contains_key(&52));
    }

    #[tokio::test]
    async fn test_title_lookup_matches_both_forms() {
        let upstream = Arc::new(ScriptedUpstream::new(|_, p| {
            assert_eq!(param(p, "titles"), Some("תל_אביב|ירושלים"));
            Ok(json!({ "query": { "pages": {
                "1": { "pageid": 1, "title": "תל אביב", "thumbnail": { "source": "https://img/ta.jpg" } },
                "2": { "pageid": 2, "title": "ירושלים" }
            }}}))
        }));
        let enricher = enricher(upstream);

        let thumbnails = enricher
            .by_title(&["תל_אביב".to_string(), "ירושלים".to_string(), "תל_אביב".to_string()])
            .await;

        assert_eq!(thumbnails.get("תל_אביב").map(String::as_str), Some("https://img/ta.jpg"));
        assert_eq!(thumbnails.get("תל אביב").map(String::as_str), Some("https://img/ta.jpg"));
        assert!(thumbnails.get("ירושלים").is_none());
    }
}
