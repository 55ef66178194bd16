//! Ordering for the recent-edits listing

use crate::types::ChangeRecord;

/// Sort modes for recent-edits listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecentSort {
    /// Upstream order (newest first)
    #[default]
    Date,
    /// Largest additions first
    SizeDesc,
    /// Largest removals first
    SizeAsc,
}

impl RecentSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecentSort::Date => "date",
            RecentSort::SizeDesc => "size_desc",
            RecentSort::SizeAsc => "size_asc",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "date" => Some(RecentSort::Date),
            "size_desc" => Some(RecentSort::SizeDesc),
            "size_asc" => Some(RecentSort::SizeAsc),
            _ => None,
        }
    }

    /// Reorder `records` in place by signed size delta; `Date` keeps fetch order
    pub fn apply(&self, records: &mut [ChangeRecord]) {
        match self {
            RecentSort::Date => {}
            RecentSort::SizeDesc => records.sort_by_key(|r| std::cmp::Reverse(r.size_delta())),
            RecentSort::SizeAsc => records.sort_by_key(|r| r.size_delta()),
        }
    }
}
