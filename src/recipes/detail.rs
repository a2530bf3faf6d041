use uuid::Uuid;

use super::store::{
    RecipeError, RecipeStore, IMAGES_TABLE, PROFILES_TABLE, RECIPES_TABLE, RECIPE_WITH_RELATIONS,
};
use super::types::{ImageRow, Profile, RecipeDetail, RecipeId, RecipeImage, RecipeRow};
use super::Recipe;

impl RecipeStore {
    /// One recipe with its images and ratings. Errors if the id does not exist.
    pub async fn recipe(&self, id: RecipeId) -> Result<Recipe, RecipeError> {
        let row: RecipeRow = self
            .backend
            .select(RECIPES_TABLE, RECIPE_WITH_RELATIONS)
            .eq("id", id)
            .single()
            .await?;
        Ok(row.into_recipe())
    }

    /// Images of a recipe in upload order.
    pub async fn recipe_images(&self, id: RecipeId) -> Result<Vec<RecipeImage>, RecipeError> {
        let rows: Vec<ImageRow> = self
            .backend
            .select(IMAGES_TABLE, "id, recipe_id, image_url")
            .eq("recipe_id", id)
            .order("id", true)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(ImageRow::into_image).collect())
    }

    /// Profile of `user_id`; a user without a profile row yields `None`.
    pub async fn profile(&self, user_id: Uuid) -> Result<Option<Profile>, RecipeError> {
        let profile = self
            .backend
            .select(PROFILES_TABLE, "*")
            .eq("id", user_id)
            .maybe_single()
            .await?;
        if profile.is_none() {
            tracing::debug!(user_id = %user_id, "No profile row for user");
        }
        Ok(profile)
    }

    /// Avatar URL of `user_id`, if the profile exists and has one.
    pub async fn avatar_url(&self, user_id: Uuid) -> Result<Option<String>, RecipeError> {
        Ok(self.profile(user_id).await?.and_then(|p| p.avatar_url))
    }

    /// Recipe plus the lookups the detail view needs.
    ///
    /// The recipe itself must load; category, difficulty and author lookups
    /// degrade to `None` on failure so one broken reference does not hide the
    /// recipe.
    pub async fn recipe_detail(&self, id: RecipeId) -> Result<RecipeDetail, RecipeError> {
        let (recipe, images) = tokio::try_join!(self.recipe(id), self.recipe_images(id))?;

        let category = async {
            match recipe.category_id {
                Some(category_id) => self.category(category_id).await,
                None => Ok(None),
            }
        };
        let difficulty = async {
            match recipe.difficulty {
                Some(condition_id) => self.condition(condition_id).await,
                None => Ok(None),
            }
        };
        let author = async {
            match recipe.user_id {
                Some(user_id) => self.profile(user_id).await,
                None => Ok(None),
            }
        };
        let (category, difficulty, author) = tokio::join!(category, difficulty, author);

        Ok(RecipeDetail {
            category: log_lookup(id, "category", category),
            difficulty: log_lookup(id, "difficulty", difficulty),
            author: log_lookup(id, "author", author),
            images,
            recipe,
        })
    }
}

fn log_lookup<T>(recipe_id: RecipeId, what: &str, result: Result<Option<T>, RecipeError>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(recipe_id, lookup = what, error = %e, "Detail lookup failed");
            None
        }
    }
}
