//! Form validation for recipe create/edit.
//!
//! Runs before any request; the first failing field wins, in form order.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,
    #[error("Cooking time is required")]
    MissingCookingTime,
    #[error("Cooking time must be a positive number of minutes, got {0:?}")]
    InvalidCookingTime(String),
    #[error("Description is required")]
    MissingDescription,
    #[error("Category is required")]
    MissingCategory,
    #[error("Difficulty is required")]
    MissingDifficulty,
    #[error("Origin is required")]
    MissingOrigin,
    #[error("At least one image is required")]
    MissingImages,
    #[error("Rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),
    #[error("Sign in required")]
    NotSignedIn,
}

/// Raw form input as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct RecipeForm {
    pub title: String,
    pub cooking_time: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub difficulty: Option<i64>,
    pub origin: String,
}

/// Validated, trimmed recipe fields ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecipe {
    pub title: String,
    pub cooking_time: f64,
    pub description: String,
    pub category_id: i64,
    pub difficulty: i64,
    pub origin: String,
}

fn required(value: &str, err: ValidationError) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(err)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Ids come from pickers whose unset value is 0.
fn selected(id: Option<i64>, err: ValidationError) -> Result<i64, ValidationError> {
    match id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(err),
    }
}

impl RecipeForm {
    /// Validate the form. `image_count` counts images attached to this submit;
    /// new recipes need at least one, edits may add none.
    pub fn validate(
        &self,
        image_count: usize,
        require_images: bool,
    ) -> Result<ValidRecipe, ValidationError> {
        let title = required(&self.title, ValidationError::MissingTitle)?;

        let raw_time = required(&self.cooking_time, ValidationError::MissingCookingTime)?;
        let cooking_time = match raw_time.parse::<f64>() {
            Ok(minutes) if minutes.is_finite() && minutes > 0.0 => minutes,
            _ => return Err(ValidationError::InvalidCookingTime(raw_time)),
        };

        let description = required(&self.description, ValidationError::MissingDescription)?;
        let category_id = selected(self.category_id, ValidationError::MissingCategory)?;
        let difficulty = selected(self.difficulty, ValidationError::MissingDifficulty)?;
        let origin = required(&self.origin, ValidationError::MissingOrigin)?;

        if require_images && image_count == 0 {
            return Err(ValidationError::MissingImages);
        }

        Ok(ValidRecipe {
            title,
            cooking_time,
            description,
            category_id,
            difficulty,
            origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form() -> RecipeForm {
        RecipeForm {
            title: "  Pad Thai ".into(),
            cooking_time: "30".into(),
            description: "Stir-fried noodles".into(),
            category_id: Some(1),
            difficulty: Some(2),
            origin: "Ayutthaya".into(),
        }
    }

    #[test]
    fn test_valid_form_is_trimmed() {
        let valid = form().validate(1, true).unwrap();
        assert_eq!(valid.title, "Pad Thai");
        assert_eq!(valid.cooking_time, 30.0);
        assert_eq!(valid.category_id, 1);
    }

    #[test]
    fn test_decimal_cooking_time() {
        let mut f = form();
        f.cooking_time = "12.5".into();
        assert_eq!(f.validate(1, true).unwrap().cooking_time, 12.5);
    }

    #[test]
    fn test_rejects_non_numeric_cooking_time() {
        let mut f = form();
        f.cooking_time = "soon".into();
        assert_eq!(
            f.validate(1, true),
            Err(ValidationError::InvalidCookingTime("soon".into()))
        );
    }

    #[test]
    fn test_rejects_non_positive_cooking_time() {
        for bad in ["0", "-5", "NaN", "inf"] {
            let mut f = form();
            f.cooking_time = bad.into();
            assert!(
                matches!(f.validate(1, true), Err(ValidationError::InvalidCookingTime(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_missing_fields_in_form_order() {
        let empty = RecipeForm::default();
        assert_eq!(empty.validate(0, true), Err(ValidationError::MissingTitle));

        let mut f = form();
        f.description = "   ".into();
        f.origin = String::new();
        assert_eq!(f.validate(1, true), Err(ValidationError::MissingDescription));
    }

    #[test]
    fn test_zero_id_counts_as_unselected() {
        let mut f = form();
        f.category_id = Some(0);
        assert_eq!(f.validate(1, true), Err(ValidationError::MissingCategory));

        let mut f = form();
        f.difficulty = None;
        assert_eq!(f.validate(1, true), Err(ValidationError::MissingDifficulty));
    }

    #[test]
    fn test_images_required_only_on_create() {
        assert_eq!(form().validate(0, true), Err(ValidationError::MissingImages));
        assert!(form().validate(0, false).is_ok());
    }
}
