//! Category and condition (difficulty) reference tables.
//!
//! Both tables are small and always loaded whole.
use super::store::{RecipeError, RecipeStore, CATEGORIES_TABLE, CONDITIONS_TABLE};
use super::types::{Category, Condition, ReferenceItem};
use crate::session::Language;

impl RecipeStore {
    /// Every condition, active or not. Feed cards resolve labels against this.
    pub async fn conditions(&self) -> Result<Vec<Condition>, RecipeError> {
        Ok(self.backend.select(CONDITIONS_TABLE, "*").fetch().await?)
    }

    /// Active conditions only, for pickers.
    pub async fn active_conditions(&self) -> Result<Vec<Condition>, RecipeError> {
        Ok(self
            .backend
            .select(CONDITIONS_TABLE, "*")
            .eq("status", true)
            .fetch()
            .await?)
    }

    pub async fn categories(&self) -> Result<Vec<Category>, RecipeError> {
        Ok(self.backend.select(CATEGORIES_TABLE, "*").fetch().await?)
    }

    /// Active categories only, for pickers.
    pub async fn active_categories(&self) -> Result<Vec<Category>, RecipeError> {
        Ok(self
            .backend
            .select(CATEGORIES_TABLE, "*")
            .eq("status", true)
            .fetch()
            .await?)
    }

    pub async fn category(&self, id: i64) -> Result<Option<Category>, RecipeError> {
        Ok(self
            .backend
            .select(CATEGORIES_TABLE, "*")
            .eq("id", id)
            .maybe_single()
            .await?)
    }

    pub async fn condition(&self, id: i64) -> Result<Option<Condition>, RecipeError> {
        Ok(self
            .backend
            .select(CONDITIONS_TABLE, "*")
            .eq("id", id)
            .maybe_single()
            .await?)
    }
}

/// Localized name of entry `id` in `items`, or `None` when the id is unknown
/// (callers show their own "no difficulty" placeholder).
pub fn localized_label(items: &[ReferenceItem], id: Option<i64>, language: Language) -> Option<&str> {
    let id = id?;
    items
        .iter()
        .find(|item| item.id == id)
        .map(|item| item.localized_name(language))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<ReferenceItem> {
        vec![
            ReferenceItem {
                id: 1,
                name_th: "ง่าย".into(),
                name_en: "Easy".into(),
                status: true,
            },
            ReferenceItem {
                id: 2,
                name_th: "ยาก".into(),
                name_en: "Hard".into(),
                status: false,
            },
        ]
    }

    #[test]
    fn test_label_lookup() {
        let items = items();
        assert_eq!(localized_label(&items, Some(2), Language::English), Some("Hard"));
        assert_eq!(localized_label(&items, Some(1), Language::Thai), Some("ง่าย"));
    }

    #[test]
    fn test_unknown_or_missing_id() {
        let items = items();
        assert_eq!(localized_label(&items, Some(9), Language::English), None);
        assert_eq!(localized_label(&items, None, Language::English), None);
    }
}
