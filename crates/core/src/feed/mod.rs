//! Paginated photo feed.
//!
//! The [`PhotoFeed`] drives pagination against a [`PhotoFetcher`] and merges
//! results into the shared [`PhotoStore`]:
//! - **Pages**: one fetch at a time; requests while fetching are dropped
//! - **Caching**: eager (whole page cached before insert) or lazy (one
//!   background task per photo, single-flight through the [`TaskRegistry`])
//!
//! [`PhotoFetcher`]: crate::fetcher::PhotoFetcher
//! [`PhotoStore`]: crate::store::PhotoStore
//! [`TaskRegistry`]: crate::registry::TaskRegistry

mod config;
mod debounce;
mod orchestrator;
mod types;

pub use config::{CachingMode, FeedConfig};
pub use debounce::SearchDebouncer;
pub use orchestrator::PhotoFeed;
pub use types::{FeedError, FeedErrorEvent, FeedState, FeedStatus, PageCursor, PageOutcome};
