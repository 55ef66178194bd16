//! Aggregation over fetched change records and page-view snapshots
//!
//! - `ranking`: pages by distinct contributors, users by edit count
//! - `sections`: `/* Section */` markers in edit comments
//! - `pageviews`: global and per-user top-viewed rankings
//! - `recent`: sort modes for the recent-edits listing

pub mod pageviews;
pub mod ranking;
pub mod recent;
pub mod sections;

pub use pageviews::{PageViewAggregator, ViewedArticle};
pub use ranking::{rank_by_edit_count, rank_by_unique_contributors, ActivitySort, EditorActivity, PageActivity};
pub use recent::RecentSort;
pub use sections::{extract_section, SectionTally};
