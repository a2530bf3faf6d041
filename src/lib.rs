//! Client library for a hosted recipe-sharing backend.
//!
//! The crate is organized as:
//!
//! - [`backend`] - REST + object-store client over `reqwest`
//! - [`recipes`] - typed records and every read/write the app performs
//! - [`feed`] - paginated feed engine: page fetcher, controller, debounced search
//! - [`config`] - optional TOML configuration with env overrides
//! - [`session`] - injected session context (user, token, language)

pub mod backend;
pub mod config;
pub mod feed;
pub mod recipes;
pub mod session;

pub use backend::{Backend, BackendError};
pub use config::{Config, ConfigError};
pub use feed::{FeedController, FeedOptions, FeedPhase, FeedSnapshot, SearchOverlay};
pub use recipes::{Recipe, RecipeError, RecipeStore};
pub use session::{Language, SessionContext};
