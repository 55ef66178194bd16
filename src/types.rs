//! Core data types shared by the fetch, aggregation and search layers
//!
//! `ChangeRecord` mirrors one row of the upstream change log. Field names on
//! the wire follow the upstream JSON (`revid`, `pageid`, `oldlen`, ...).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Property set used by listing views (recent edits, search)
pub const LISTING_PROPS: &str = "ids|title|user|timestamp|comment|sizes";

/// Property set used by aggregation views (comment kept for section extraction)
pub const AGGREGATION_PROPS: &str = "ids|title|user|timestamp|comment";

/// Property set used by top-editors (no comment needed)
pub const MINIMAL_PROPS: &str = "ids|title|user|timestamp";

/// Property set used by the new-articles view
pub const NEW_ARTICLE_PROPS: &str = "ids|title|user|timestamp|comment|sizes|tags";

/// One observed edit or page-creation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(rename = "revid", default)]
    pub rev_id: u64,
    #[serde(rename = "pageid", default)]
    pub page_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "ns", default)]
    pub namespace: i32,
    /// Anonymous editors are reported with an IP-shaped user string
    #[serde(default)]
    pub user: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "oldlen", default)]
    pub old_size: u64,
    #[serde(rename = "newlen", default)]
    pub new_size: u64,
    #[serde(default)]
    pub comment: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MatchStatus>,
}

impl ChangeRecord {
    /// Signed byte delta of this change (positive = content added)
    pub fn size_delta(&self) -> i64 {
        self.new_size as i64 - self.old_size as i64
    }
}

/// Classification of a search hit within a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Added,
    Removed,
    Unknown,
}

/// Logical time range requested by a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Hour1,
    Day1,
    Week1,
    /// No lower time bound; the fetch is bounded by count only
    Unbounded,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Hour1 => "1h",
            Period::Day1 => "24h",
            Period::Week1 => "7d",
            Period::Unbounded => "all",
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match self {
            Period::Hour1 => Some(Duration::hours(1)),
            Period::Day1 => Some(Duration::hours(24)),
            Period::Week1 => Some(Duration::days(7)),
            Period::Unbounded => None,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(Period::Hour1),
            "24h" => Some(Period::Day1),
            "7d" => Some(Period::Week1),
            "all" => Some(Period::Unbounded),
            _ => None,
        }
    }

    /// Time window ending at `now` covering this period
    pub fn window_ending(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow {
            start: None,
            end: self.duration().map(|d| now - d),
        }
    }
}

/// Half-open interval `[end, start)` bounding one fetch
///
/// The upstream enumerates newest-first, so `start` is the more recent
/// bound. A missing `start` means "now"; a missing `end` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(start - end),
            _ => None,
        }
    }

    /// Split a bounded window into `parts` equal, non-overlapping slices,
    /// most recent slice first. Unbounded windows are returned unsplit.
    pub fn partition(&self, parts: u32) -> Vec<TimeWindow> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return vec![*self];
        };
        if parts <= 1 {
            return vec![*self];
        }

        let slice = (start - end) / parts as i32;
        (0..parts)
            .map(|i| {
                let slice_start = start - slice * i as i32;
                // Last slice ends exactly on the range bound so rounding never drops time
                let slice_end = if i + 1 == parts {
                    end
                } else {
                    start - slice * (i + 1) as i32
                };
                TimeWindow::new(slice_start, slice_end)
            })
            .collect()
    }
}

/// Upstream change type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Edit,
    New,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Edit => "edit",
            ChangeType::New => "new",
        }
    }
}

/// Filters applied to every change-log page request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeFilters {
    pub namespace: i32,
    pub anon_only: bool,
    pub user: Option<String>,
    pub title: Option<String>,
    pub change_type: Option<ChangeType>,
    pub props: &'static str,
}

impl Default for ChangeFilters {
    fn default() -> Self {
        Self {
            namespace: 0,
            anon_only: false,
            user: None,
            title: None,
            change_type: None,
            props: LISTING_PROPS,
        }
    }
}

impl ChangeFilters {
    pub fn namespace(mut self, namespace: i32) -> Self {
        self.namespace = namespace;
        self
    }

    pub fn anon_only(mut self, anon_only: bool) -> Self {
        self.anon_only = anon_only;
        self
    }

    pub fn user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn change_type(mut self, change_type: ChangeType) -> Self {
        self.change_type = Some(change_type);
        self
    }

    pub fn props(mut self, props: &'static str) -> Self {
        self.props = props;
        self
    }
}
