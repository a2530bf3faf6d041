//! Recipe listings: the counted, ranged and filtered queries the feed runs,
//! plus the highlighted and per-author lists.
use uuid::Uuid;

use super::store::{RecipeError, RecipeStore, RECIPES_TABLE, RECIPE_WITH_RELATIONS};
use super::types::{Recipe, RecipeRow};
use crate::backend::BackendError;

/// Build an ILIKE substring pattern, escaping the user's own wildcards.
pub(crate) fn substring_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn into_recipes(rows: Vec<RecipeRow>) -> Vec<Recipe> {
    rows.into_iter().map(RecipeRow::into_recipe).collect()
}

impl RecipeStore {
    /// Exact number of recipes (count-only request, no rows transferred).
    pub async fn count_recipes(&self) -> Result<u64, BackendError> {
        self.backend.select(RECIPES_TABLE, "*").count().await
    }

    /// Recipes in the inclusive range `[from, to]`, newest first.
    pub async fn recipes_in_range(&self, from: u64, to: u64) -> Result<Vec<Recipe>, BackendError> {
        let rows: Vec<RecipeRow> = self
            .backend
            .select(RECIPES_TABLE, RECIPE_WITH_RELATIONS)
            .order("created_at", false)
            .range(from, to)
            .fetch()
            .await?;
        Ok(into_recipes(rows))
    }

    /// Recipes whose title contains `text` (case-insensitive) in `[from, to]`,
    /// newest first, with the filtered total when the server reports it.
    pub async fn search_in_range(
        &self,
        text: &str,
        from: u64,
        to: u64,
    ) -> Result<(Vec<Recipe>, Option<u64>), BackendError> {
        let (rows, total): (Vec<RecipeRow>, _) = self
            .backend
            .select(RECIPES_TABLE, RECIPE_WITH_RELATIONS)
            .ilike("title", &substring_pattern(text))
            .order("created_at", false)
            .range(from, to)
            .fetch_counted()
            .await?;
        Ok((into_recipes(rows), total))
    }

    /// Editorially highlighted recipes, newest first. Not paginated.
    pub async fn highlighted_recipes(&self) -> Result<Vec<Recipe>, RecipeError> {
        let rows: Vec<RecipeRow> = self
            .backend
            .select(RECIPES_TABLE, RECIPE_WITH_RELATIONS)
            .eq("hilight", true)
            .order("created_at", false)
            .fetch()
            .await?;
        Ok(into_recipes(rows))
    }

    /// Recipes authored by `user_id`, newest first.
    pub async fn user_recipes(&self, user_id: Uuid) -> Result<Vec<Recipe>, RecipeError> {
        let rows: Vec<RecipeRow> = self
            .backend
            .select(RECIPES_TABLE, RECIPE_WITH_RELATIONS)
            .eq("user_id", user_id)
            .order("created_at", false)
            .fetch()
            .await?;
        Ok(into_recipes(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_pattern_plain() {
        assert_eq!(substring_pattern("cake"), "%cake%");
    }

    #[test]
    fn test_substring_pattern_escapes_wildcards() {
        assert_eq!(substring_pattern("50%_off"), "%50\\%\\_off%");
    }
}
