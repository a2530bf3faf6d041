//! Typed recipe repository over the backend: listings, detail lookups,
//! reference tables, ratings and the recipe/image write paths.
//!
//! Everything returned from here has already been decoded from the wire rows
//! and had its average rating computed.

mod detail;
mod listing;
mod rating;
mod reference;
mod store;
mod types;
mod validation;
mod write;

pub use rating::{average_rating, RatingValue};
pub use reference::localized_label;
pub use store::{RecipeError, RecipeStore, DEFAULT_IMAGE_BUCKET};
pub use types::{
    Category, Condition, Profile, Recipe, RecipeDetail, RecipeId, RecipeImage, ReferenceItem,
};
pub use validation::{RecipeForm, ValidRecipe, ValidationError};
