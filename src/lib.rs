//! Edisco - recent-activity dashboard core for a wiki
//!
//! Turns the wiki's continuation-paginated change log and page-view
//! statistics into bounded, ranked, cached views:
//!
//! - top-edited articles and top talk pages (by distinct contributors)
//! - top editors (by edit count)
//! - new articles and recent edits
//! - top-viewed articles (global or per user)
//! - free-text search over recent diffs
//!
//! [`dashboard::Dashboard`] is the entry point; everything below it is
//! usable on its own.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod enrich;
pub mod fetch;
pub mod search;
pub mod types;
pub mod upstream;

pub use config::EdiscoConfig;
pub use dashboard::{Dashboard, ViewFilters};
