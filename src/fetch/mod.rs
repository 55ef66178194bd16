//! Change-log fetching
//!
//! ```text
//! WindowedFetcher::fetch_range()
//!     ├─ range ≤ 24h or unbounded → one fetch_window()
//!     └─ range > 24h → 28 × fetch_window() (joined) → sort newest-first → truncate
//!                              ↓
//!                      WikiApi::recent_changes() per page
//! ```

pub mod windowed;
pub mod worker;

pub use windowed::{FetchPolicy, WindowedFetcher};
pub use worker::fetch_window;
