use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rating::average_rating;
use crate::session::Language;

pub type RecipeId = i64;

// ============================================================================
// Wire Rows
// ============================================================================

/// Recipe row as returned by the backend, nested collections included.
///
/// Converted to [`Recipe`] via `into_recipe()`; nothing past the fetcher
/// boundary sees this shape.
#[derive(Debug, Deserialize)]
pub(crate) struct RecipeRow {
    pub id: RecipeId,
    pub title: Option<String>,
    pub cooking_time: Option<f64>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub difficulty: Option<i64>,
    pub origin: Option<String>,
    /// Older rows carry the origin under this name
    pub location: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub hilight: Option<bool>,
    pub recipe_images: Option<Vec<ImageRow>>,
    pub ratings: Option<Vec<RatingRow>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageRow {
    pub id: i64,
    pub recipe_id: RecipeId,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RatingRow {
    pub rating: i64,
}

impl RecipeRow {
    pub(crate) fn into_recipe(self) -> Recipe {
        let id = self.id;
        let ratings: Vec<i32> = self
            .ratings
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| match i32::try_from(r.rating) {
                Ok(value) if (1..=5).contains(&value) => Some(value),
                _ => {
                    tracing::warn!(recipe_id = id, rating = r.rating, "Dropping out-of-range rating");
                    None
                }
            })
            .collect();

        Recipe {
            id,
            title: self.title.unwrap_or_default(),
            cooking_time: self.cooking_time.unwrap_or(0.0),
            description: self.description.unwrap_or_default(),
            category_id: self.category_id,
            difficulty: self.difficulty,
            origin: self.origin.or(self.location).unwrap_or_default(),
            user_id: self.user_id,
            created_at: self.created_at,
            highlighted: self.hilight.unwrap_or(false),
            images: self
                .recipe_images
                .unwrap_or_default()
                .into_iter()
                .map(ImageRow::into_image)
                .collect(),
            average_rating: average_rating(&ratings),
            ratings,
        }
    }
}

impl ImageRow {
    pub(crate) fn into_image(self) -> RecipeImage {
        RecipeImage {
            id: self.id,
            recipe_id: self.recipe_id,
            image_url: self.image_url,
        }
    }
}

// ============================================================================
// Domain Records
// ============================================================================

/// A recipe with its images, ratings and derived average.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    /// Minutes
    pub cooking_time: f64,
    pub description: String,
    pub category_id: Option<i64>,
    /// Condition (difficulty) id
    pub difficulty: Option<i64>,
    pub origin: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub highlighted: bool,
    pub images: Vec<RecipeImage>,
    pub ratings: Vec<i32>,
    /// Mean of `ratings`, 0 when unrated. Recomputed on every fetch.
    pub average_rating: f64,
}

impl Recipe {
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(|i| i.image_url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeImage {
    pub id: i64,
    pub recipe_id: RecipeId,
    pub image_url: String,
}

impl RecipeImage {
    /// Object name within the image bucket: the last path segment of the URL.
    pub fn object_name(&self) -> Option<&str> {
        self.image_url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
    }
}

/// Category or condition (difficulty) reference entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    pub id: i64,
    pub name_th: String,
    pub name_en: String,
    /// Active flag; inactive entries stay resolvable but are hidden in pickers
    #[serde(default)]
    pub status: bool,
}

pub type Category = ReferenceItem;
pub type Condition = ReferenceItem;

impl ReferenceItem {
    pub fn localized_name(&self, language: Language) -> &str {
        match language {
            Language::Thai => &self.name_th,
            Language::English => &self.name_en,
        }
    }
}

/// Author profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Everything the detail view shows for one recipe.
#[derive(Debug, Clone)]
pub struct RecipeDetail {
    pub recipe: Recipe,
    pub images: Vec<RecipeImage>,
    pub category: Option<Category>,
    pub difficulty: Option<Condition>,
    pub author: Option<Profile>,
}
