//! Feed pagination and search.
//!
//! - [`fetcher`]: one bounded page of recipes plus the count hint
//! - [`controller`]: cursor, merged list, load-more and refresh
//! - [`search`]: debounced title search shown in place of the feed
//! - [`debounce`]: the timer behind the search overlay
//!
//! # Example
//!
//! ```ignore
//! let feed = FeedController::new(store, session, FeedOptions::default());
//! feed.initial_load().await;
//! while feed.load_more().await {}
//! feed.set_search_query("cake");
//! ```

mod controller;
mod debounce;
mod fetcher;
mod search;

pub use controller::{FeedController, FeedOptions, FeedPhase, FeedSnapshot};
pub use debounce::Debouncer;
pub use fetcher::{fetch_page, FeedPage, DEFAULT_PAGE_SIZE};
pub use search::{SearchOverlay, DEFAULT_SEARCH_DEBOUNCE};
