//! Upstream Gateway
//!
//! Single client abstraction over the two upstream services:
//! - the wiki action API (change log, revision diffs, page images)
//! - the page-view statistics REST API (daily top lists, per-article counts)
//!
//! ## Layers
//!
//! ```text
//! WikiApi (typed calls, error-envelope checks)
//!     ↓
//! dyn Upstream (one query → JSON | GatewayError)
//!     ↓
//! HttpGateway (reqwest, fixed timeout, no retries)
//! ```
//!
//! Callers treat any `GatewayError` as "no data for this call".

pub mod api;
pub mod error;
pub mod gateway;
pub mod http;

#[cfg(test)]
pub(crate) mod mock;

pub use api::{ArticleViews, ChangePage, DailyViews, PageImage, RevisionDiff, WikiApi, MAX_PAGE_SIZE};
pub use error::GatewayError;
pub use gateway::{param, Endpoint, Params, Upstream};
pub use http::HttpGateway;
