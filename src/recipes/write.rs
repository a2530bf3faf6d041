//! Recipe and image writes.
//!
//! Writes span several requests (row, blobs, image rows) and nothing is rolled
//! back: once the first step has committed, a later failure surfaces as
//! [`RecipeError::PartialWrite`].
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::store::{RecipeError, RecipeStore, IMAGES_TABLE, RECIPES_TABLE};
use super::types::{RecipeId, RecipeImage, RecipeRow};
use super::validation::{RecipeForm, ValidRecipe, ValidationError};
use crate::backend::BackendError;
use crate::session::SessionContext;

const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Serialize)]
struct NewRecipeRow<'a> {
    title: &'a str,
    cooking_time: f64,
    description: &'a str,
    category_id: i64,
    difficulty: i64,
    origin: &'a str,
    user_id: Uuid,
}

#[derive(Serialize)]
struct RecipePatch<'a> {
    title: &'a str,
    cooking_time: f64,
    description: &'a str,
    category_id: i64,
    difficulty: i64,
    origin: &'a str,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct NewImageRow {
    recipe_id: RecipeId,
    image_url: String,
}

/// Object path for the `index`th image of a freshly created recipe.
fn created_image_path(user_id: Uuid, recipe_id: RecipeId, millis: i64, index: usize) -> String {
    format!("{}/{}/{}_{}.jpg", user_id, recipe_id, millis, index)
}

/// Object path for an image added while editing.
fn edited_image_path(recipe_id: RecipeId, millis: i64, index: usize) -> String {
    format!("recipes_{}_{}_{}.jpg", recipe_id, millis, index)
}

/// Path of an image's blob within `bucket`, recovered from its public URL.
fn object_path<'a>(image: &'a RecipeImage, bucket: &str) -> Option<&'a str> {
    let marker = format!("/{}/", bucket);
    match image.image_url.find(&marker) {
        Some(pos) => Some(&image.image_url[pos + marker.len()..]).filter(|p| !p.is_empty()),
        None => image.object_name(),
    }
}

impl RecipeStore {
    /// Upload `images` under the paths `path_for(i)` and insert one image row
    /// per upload. Returns which step failed alongside the error.
    async fn attach_images(
        &self,
        recipe_id: RecipeId,
        images: Vec<Vec<u8>>,
        upsert: bool,
        path_for: impl Fn(usize) -> String,
    ) -> Result<usize, (&'static str, BackendError)> {
        let mut rows = Vec::with_capacity(images.len());
        for (index, bytes) in images.into_iter().enumerate() {
            let path = path_for(index);
            self.backend
                .upload_object(&self.image_bucket, &path, bytes, IMAGE_CONTENT_TYPE, upsert)
                .await
                .map_err(|e| ("image upload", e))?;
            let image_url = self
                .backend
                .public_url(&self.image_bucket, &path)
                .map_err(|e| ("image upload", e))?;
            rows.push(NewImageRow {
                recipe_id,
                image_url,
            });
        }

        if rows.is_empty() {
            return Ok(0);
        }
        self.backend
            .mutate(IMAGES_TABLE)
            .insert_minimal(&rows)
            .await
            .map_err(|e| ("image rows", e))?;
        Ok(rows.len())
    }

    /// Create a recipe authored by the session user with at least one image.
    ///
    /// Validation runs before any request. Returns the new recipe id.
    pub async fn create_recipe(
        &self,
        session: &SessionContext,
        form: &RecipeForm,
        images: Vec<Vec<u8>>,
    ) -> Result<RecipeId, RecipeError> {
        let user_id = session.user_id.ok_or(ValidationError::NotSignedIn)?;
        let valid: ValidRecipe = form.validate(images.len(), true)?;

        let row = NewRecipeRow {
            title: &valid.title,
            cooking_time: valid.cooking_time,
            description: &valid.description,
            category_id: valid.category_id,
            difficulty: valid.difficulty,
            origin: &valid.origin,
            user_id,
        };
        let inserted: Vec<RecipeRow> = self.backend.mutate(RECIPES_TABLE).insert(&[row]).await?;
        let recipe_id = inserted
            .first()
            .map(|r| r.id)
            .ok_or(RecipeError::MissingRow {
                table: RECIPES_TABLE,
            })?;
        tracing::info!(recipe_id, user_id = %user_id, "Created recipe");

        let millis = Utc::now().timestamp_millis();
        let attached = self
            .attach_images(recipe_id, images, false, |i| {
                created_image_path(user_id, recipe_id, millis, i)
            })
            .await
            .map_err(|(failed, source)| RecipeError::PartialWrite {
                committed: "recipe row",
                failed,
                source,
            })?;
        tracing::debug!(recipe_id, images = attached, "Attached recipe images");

        Ok(recipe_id)
    }

    /// Overwrite a recipe's fields and append `new_images` to it.
    ///
    /// Existing images are untouched; remove them with [`RecipeStore::remove_image`].
    pub async fn update_recipe(
        &self,
        id: RecipeId,
        form: &RecipeForm,
        new_images: Vec<Vec<u8>>,
    ) -> Result<(), RecipeError> {
        let valid = form.validate(new_images.len(), false)?;

        let patch = RecipePatch {
            title: &valid.title,
            cooking_time: valid.cooking_time,
            description: &valid.description,
            category_id: valid.category_id,
            difficulty: valid.difficulty,
            origin: &valid.origin,
            updated_at: Utc::now(),
        };
        self.backend
            .mutate(RECIPES_TABLE)
            .eq("id", id)
            .update(&patch)
            .await?;
        tracing::info!(recipe_id = id, "Updated recipe");

        let millis = Utc::now().timestamp_millis();
        self.attach_images(id, new_images, true, |i| edited_image_path(id, millis, i))
            .await
            .map_err(|(failed, source)| RecipeError::PartialWrite {
                committed: "recipe fields",
                failed,
                source,
            })?;
        Ok(())
    }

    /// Delete a recipe row. Dependent rows are removed by the server.
    pub async fn delete_recipe(&self, id: RecipeId) -> Result<(), RecipeError> {
        self.backend
            .mutate(RECIPES_TABLE)
            .eq("id", id)
            .delete()
            .await?;
        tracing::info!(recipe_id = id, "Deleted recipe");
        Ok(())
    }

    /// Remove an image: metadata row first, then the blob.
    pub async fn remove_image(&self, image: &RecipeImage) -> Result<(), RecipeError> {
        self.backend
            .mutate(IMAGES_TABLE)
            .eq("id", image.id)
            .delete()
            .await?;

        let Some(path) = object_path(image, &self.image_bucket) else {
            tracing::warn!(image_id = image.id, url = %image.image_url, "Image URL names no object, blob left in place");
            return Ok(());
        };

        self.backend
            .remove_objects(&self.image_bucket, &[path.to_string()])
            .await
            .map_err(|source| RecipeError::PartialWrite {
                committed: "image row",
                failed: "image blob",
                source,
            })?;
        tracing::debug!(image_id = image.id, path = %path, "Removed image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str) -> RecipeImage {
        RecipeImage {
            id: 3,
            recipe_id: 7,
            image_url: url.to_string(),
        }
    }

    #[test]
    fn test_created_image_path() {
        let user = Uuid::nil();
        assert_eq!(
            created_image_path(user, 7, 1_700_000_000_000, 1),
            "00000000-0000-0000-0000-000000000000/7/1700000000000_1.jpg"
        );
    }

    #[test]
    fn test_edited_image_path() {
        assert_eq!(edited_image_path(7, 42, 0), "recipes_7_42_0.jpg");
    }

    #[test]
    fn test_object_path_keeps_nested_folders() {
        let img = image("https://x/storage/v1/object/public/recipe-images/u/7/1_0.jpg");
        assert_eq!(object_path(&img, "recipe-images"), Some("u/7/1_0.jpg"));
    }

    #[test]
    fn test_object_path_falls_back_to_last_segment() {
        let img = image("https://cdn.example.com/files/recipes_7_1.jpg");
        assert_eq!(object_path(&img, "recipe-images"), Some("recipes_7_1.jpg"));
    }

    #[test]
    fn test_object_path_empty() {
        let img = image("https://x/storage/v1/object/public/recipe-images/");
        assert_eq!(object_path(&img, "recipe-images"), None);
    }
}
