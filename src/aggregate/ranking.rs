//! Ranking of change records by unique contributors and by edit count
//!
//! Both rankings scan the whole fetched sample before sorting; truncation to
//! the requested limit happens afterwards, in the caller. Groups are kept in
//! first-seen order and sorted with a stable sort, so equal counts keep the
//! order in which the scan first met them.

use super::sections::SectionTally;
use crate::types::ChangeRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One page ranked by distinct contributors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageActivity {
    pub title: String,
    #[serde(rename = "pageid")]
    pub page_id: u64,
    /// Distinct users who touched the page in the sample
    pub count: usize,
    pub edit_count: usize,
    pub last_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// One user ranked by number of edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditorActivity {
    pub user: String,
    pub count: usize,
}

/// Ordering for page-activity views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActivitySort {
    /// Most distinct contributors first
    #[default]
    Count,
    /// Most recently edited first
    Date,
}

impl ActivitySort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivitySort::Count => "count",
            ActivitySort::Date => "date",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "count" => Some(ActivitySort::Count),
            "date" => Some(ActivitySort::Date),
            _ => None,
        }
    }
}

struct PageGroup<'a> {
    title: &'a str,
    page_id: u64,
    users: HashSet<&'a str>,
    edits: usize,
    last_timestamp: DateTime<Utc>,
    sections: SectionTally,
}

/// Group records by title and rank by distinct contributors
///
/// Records without a title or user are skipped.
pub fn rank_by_unique_contributors(records: &[ChangeRecord], sort: ActivitySort) -> Vec<PageActivity> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<PageGroup> = Vec::new();

    for record in records {
        if record.title.is_empty() || record.user.is_empty() {
            continue;
        }

        let slot = *index.entry(record.title.as_str()).or_insert_with(|| {
            groups.push(PageGroup {
                title: &record.title,
                page_id: record.page_id,
                users: HashSet::new(),
                edits: 0,
                last_timestamp: record.timestamp,
                sections: SectionTally::default(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.users.insert(&record.user);
        group.edits += 1;
        if record.timestamp > group.last_timestamp {
            group.last_timestamp = record.timestamp;
        }
        group.sections.record(&record.comment);
    }

    let mut ranked: Vec<PageActivity> = groups
        .into_iter()
        .map(|group| PageActivity {
            title: group.title.to_string(),
            page_id: group.page_id,
            count: group.users.len(),
            edit_count: group.edits,
            last_timestamp: group.last_timestamp,
            top_section: group.sections.most_discussed().map(str::to_string),
            thumbnail: None,
        })
        .collect();

    match sort {
        ActivitySort::Count => ranked.sort_by(|a, b| b.count.cmp(&a.count)),
        ActivitySort::Date => ranked.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp)),
    }
    ranked
}

/// Group records by user and rank by edit count
pub fn rank_by_edit_count(records: &[ChangeRecord]) -> Vec<EditorActivity> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut ranked: Vec<EditorActivity> = Vec::new();

    for record in records {
        if record.user.is_empty() {
            continue;
        }
        match index.get(record.user.as_str()) {
            Some(&slot) => ranked[slot].count += 1,
            None => {
                index.insert(&record.user, ranked.len());
                ranked.push(EditorActivity {
                    user: record.user.clone(),
                    count: 1,
                });
            }
        }
    }

    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_record(title: &str, user: &str, minutes_ago: i64, comment: &str) -> ChangeRecord {
        let base = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        ChangeRecord {
            rev_id: 0,
            page_id: title.len() as u64,
            title: title.to_string(),
            namespace: 0,
            user: user.to_string(),
            timestamp: base - Duration::minutes(minutes_ago),
            old_size: 0,
            new_size: 0,
            comment: comment.to_string(),
            tags: Vec::new(),
            thumbnail: None,
            status: None,
        }
    }

    #[test]
    fn test_unique_contributors_beat_edit_volume() {
        let mut records = Vec::new();
        // A: 3 distinct users, 30 edits
        for i in 0..30 {
            records.push(make_record("A", &format!("a{}", i % 3), i, ""));
        }
        // B: 5 distinct users, 5 edits
        for i in 0..5 {
            records.push(make_record("B", &format!("b{}", i), 40 + i, ""));
        }

        let ranked = rank_by_unique_contributors(&records, ActivitySort::Count);

        assert_eq!(ranked[0].title, "B");
        assert_eq!(ranked[0].count, 5);
        assert_eq!(ranked[1].title, "A");
        assert_eq!(ranked[1].count, 3);
        assert_eq!(ranked[1].edit_count, 30);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let records = vec![
            make_record("Second", "x", 1, ""),
            make_record("First", "y", 2, ""),
            make_record("Third", "z", 3, ""),
        ];

        let ranked = rank_by_unique_contributors(&records, ActivitySort::Count);
        let titles: Vec<&str> = ranked.iter().map(|p| p.title.as_str()).collect();

        assert_eq!(titles, vec!["Second", "First", "Third"]);
    }

    #[test]
    fn test_group_derives_latest_timestamp_and_section() {
        let records = vec![
            make_record("Talk:X", "u1", 30, "/* Sources */ reply"),
            make_record("Talk:X", "u2", 5, "/* Naming */ new section"),
            make_record("Talk:X", "u3", 10, "/* Sources */ agree"),
            make_record("Talk:X", "u1", 60, "no marker"),
        ];

        let ranked = rank_by_unique_contributors(&records, ActivitySort::Count);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].count, 3);
        assert_eq!(ranked[0].top_section.as_deref(), Some("Sources"));
        assert_eq!(ranked[0].last_timestamp, records[1].timestamp);
    }

    #[test]
    fn test_date_sort_orders_by_last_edit() {
        let records = vec![
            make_record("Old", "a", 50, ""),
            make_record("Old", "b", 49, ""),
            make_record("Fresh", "c", 1, ""),
        ];

        let ranked = rank_by_unique_contributors(&records, ActivitySort::Date);

        assert_eq!(ranked[0].title, "Fresh");
        assert_eq!(ranked[1].title, "Old");
    }

    #[test]
    fn test_records_without_user_or_title_are_skipped() {
        let records = vec![make_record("", "a", 1, ""), make_record("A", "", 1, "")];

        assert!(rank_by_unique_contributors(&records, ActivitySort::Count).is_empty());
        // Editors group by user only; a missing title still counts toward its user
        assert_eq!(
            rank_by_edit_count(&records),
            vec![EditorActivity { user: "a".into(), count: 1 }]
        );
    }

    #[test]
    fn test_rank_by_edit_count() {
        let records = vec![
            make_record("A", "alice", 1, ""),
            make_record("B", "bob", 2, ""),
            make_record("C", "bob", 3, ""),
            make_record("D", "carol", 4, ""),
            make_record("E", "bob", 5, ""),
            make_record("F", "alice", 6, ""),
        ];

        let ranked = rank_by_edit_count(&records);

        assert_eq!(
            ranked,
            vec![
                EditorActivity { user: "bob".into(), count: 3 },
                EditorActivity { user: "alice".into(), count: 2 },
                EditorActivity { user: "carol".into(), count: 1 },
            ]
        );
    }
}
