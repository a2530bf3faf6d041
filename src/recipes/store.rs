use thiserror::Error;

use super::validation::ValidationError;
use crate::backend::{Backend, BackendError};
use crate::session::SessionContext;

pub(crate) const RECIPES_TABLE: &str = "recipes";
pub(crate) const IMAGES_TABLE: &str = "recipe_images";
pub(crate) const RATINGS_TABLE: &str = "ratings";
pub(crate) const CATEGORIES_TABLE: &str = "categories";
pub(crate) const CONDITIONS_TABLE: &str = "conditions";
pub(crate) const PROFILES_TABLE: &str = "profiles";

/// Projection used by every feed-style listing: the row plus its images and
/// rating values in one round trip.
pub(crate) const RECIPE_WITH_RELATIONS: &str =
    "*, recipe_images(id, recipe_id, image_url), ratings(rating)";

pub const DEFAULT_IMAGE_BUCKET: &str = "recipe-images";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum RecipeError {
    /// Input rejected before any request was made
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A write that should echo the stored row returned nothing
    #[error("{table} insert returned no row")]
    MissingRow { table: &'static str },

    /// An earlier step was committed and a later one failed; nothing is rolled back.
    #[error("{committed} succeeded but {failed} failed: {source}")]
    PartialWrite {
        committed: &'static str,
        failed: &'static str,
        #[source]
        source: BackendError,
    },
}

// ============================================================================
// Store
// ============================================================================

/// Typed access to the recipe tables and the image bucket. Cheap to clone.
#[derive(Clone, Debug)]
pub struct RecipeStore {
    pub(crate) backend: Backend,
    pub(crate) image_bucket: String,
}

impl RecipeStore {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            image_bucket: DEFAULT_IMAGE_BUCKET.to_string(),
        }
    }

    pub fn with_image_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.image_bucket = bucket.into();
        self
    }

    /// Send the session's bearer token on every request made through this store.
    pub fn with_session(mut self, session: &SessionContext) -> Self {
        self.backend = self.backend.with_session(session);
        self
    }

    pub fn image_bucket(&self) -> &str {
        &self.image_bucket
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}
