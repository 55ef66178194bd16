//! Configuration from environment variables
//!
//! Loaded once at startup (after `dotenv`) with defaults for the Hebrew
//! Wikipedia deployment.

use crate::cache::{Operation, TtlTable};
use std::env;
use std::time::Duration;

/// Runtime configuration for the dashboard core
#[derive(Debug, Clone, PartialEq)]
pub struct EdiscoConfig {
    /// Action API endpoint (`api.php`)
    pub api_url: String,

    /// Page-view metrics REST root
    pub pageviews_url: String,

    /// Project identifier used by the page-view API (e.g. `he.wikipedia`)
    pub project: String,

    pub user_agent: String,

    /// Per-request timeout in seconds
    pub http_timeout_secs: u64,

    /// Home page title (underscored form) excluded from top-viewed lists
    pub main_page: String,

    /// Title prefixes excluded from top-viewed lists (special, project namespaces)
    pub excluded_view_prefixes: Vec<String>,

    /// Talk namespace prefixes stripped before thumbnail lookup
    pub talk_prefixes: Vec<String>,

    /// TTL for edit-frequency aggregates (top-edited, top-editors, top talk pages)
    pub ttl_edits_secs: u64,

    /// TTL for the new-articles listing
    pub ttl_new_articles_secs: u64,

    /// TTL for page-view aggregates
    pub ttl_top_viewed_secs: u64,
}

impl EdiscoConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `EDISCO_API_URL` (default: https://he.wikipedia.org/w/api.php)
    /// - `EDISCO_PAGEVIEWS_URL` (default: https://wikimedia.org/api/rest_v1/metrics/pageviews)
    /// - `EDISCO_PROJECT` (default: he.wikipedia)
    /// - `EDISCO_USER_AGENT`
    /// - `EDISCO_HTTP_TIMEOUT_SECS` (default: 30)
    /// - `EDISCO_MAIN_PAGE` (default: עמוד_ראשי)
    /// - `EDISCO_EXCLUDED_VIEW_PREFIXES` (comma-separated, default: מיוחד:,ויקיפדיה:)
    /// - `EDISCO_TALK_PREFIXES` (comma-separated, default: שיחה:,Talk:)
    /// - `EDISCO_TTL_EDITS_SECS` (default: 300)
    /// - `EDISCO_TTL_NEW_ARTICLES_SECS` (default: 60)
    /// - `EDISCO_TTL_TOP_VIEWED_SECS` (default: 900)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let number = |key: &str, default: u64| {
            lookup(key)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(default)
        };
        let list = |key: &str, default: &[&str]| {
            lookup(key)
                .map(|s| {
                    s.split(',')
                        .map(|item| item.trim().to_string())
                        .filter(|item| !item.is_empty())
                        .collect::<Vec<String>>()
                })
                .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
        };

        Self {
            api_url: string("EDISCO_API_URL", "https://he.wikipedia.org/w/api.php"),
            pageviews_url: string(
                "EDISCO_PAGEVIEWS_URL",
                "https://wikimedia.org/api/rest_v1/metrics/pageviews",
            ),
            project: string("EDISCO_PROJECT", "he.wikipedia"),
            user_agent: string(
                "EDISCO_USER_AGENT",
                "Edisco/1.0 (https://github.com/edisco/edisco; edisco@example.com)",
            ),
            http_timeout_secs: number("EDISCO_HTTP_TIMEOUT_SECS", 30),
            main_page: string("EDISCO_MAIN_PAGE", "עמוד_ראשי"),
            excluded_view_prefixes: list("EDISCO_EXCLUDED_VIEW_PREFIXES", &["מיוחד:", "ויקיפדיה:"]),
            talk_prefixes: list("EDISCO_TALK_PREFIXES", &["שיחה:", "Talk:"]),
            ttl_edits_secs: number("EDISCO_TTL_EDITS_SECS", 300),
            ttl_new_articles_secs: number("EDISCO_TTL_NEW_ARTICLES_SECS", 60),
            ttl_top_viewed_secs: number("EDISCO_TTL_TOP_VIEWED_SECS", 900),
        }
    }

    /// Per-operation cache TTLs
    pub fn ttl_table(&self) -> TtlTable {
        TtlTable::new(Duration::from_secs(self.ttl_edits_secs))
            .with(Operation::NewArticles, Duration::from_secs(self.ttl_new_articles_secs))
            .with(Operation::TopViewed, Duration::from_secs(self.ttl_top_viewed_secs))
    }
}

impl Default for EdiscoConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
