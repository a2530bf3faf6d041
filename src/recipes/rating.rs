use serde::Serialize;
use uuid::Uuid;

use super::store::{RecipeError, RecipeStore, RATINGS_TABLE};
use super::types::RecipeId;
use super::validation::ValidationError;

/// Arithmetic mean of `ratings`, or exactly `0.0` for an empty slice.
///
/// No rounding happens here; display code decides the precision.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    sum as f64 / ratings.len() as f64
}

/// A rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RatingValue(u8);

impl RatingValue {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for RatingValue {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::RatingOutOfRange(value))
        }
    }
}

#[derive(Serialize)]
struct RatingUpsert {
    recipe_id: RecipeId,
    user_id: Uuid,
    rating: RatingValue,
}

impl RecipeStore {
    /// Record `user_id`'s rating for a recipe.
    ///
    /// Upserts on the `(recipe_id, user_id)` unique key so repeat submissions
    /// overwrite the earlier value; the server holds at most one row per pair.
    pub async fn rate_recipe(
        &self,
        recipe_id: RecipeId,
        user_id: Uuid,
        rating: RatingValue,
    ) -> Result<(), RecipeError> {
        let row = RatingUpsert {
            recipe_id,
            user_id,
            rating,
        };
        self.backend
            .mutate(RATINGS_TABLE)
            .upsert("recipe_id,user_id", &[row])
            .await?;
        tracing::info!(recipe_id, rating = rating.get(), "Rating saved");
        Ok(())
    }

    /// Rating values stored for one recipe.
    pub async fn ratings_for(&self, recipe_id: RecipeId) -> Result<Vec<i32>, RecipeError> {
        #[derive(serde::Deserialize)]
        struct Row {
            rating: i32,
        }

        let rows: Vec<Row> = self
            .backend
            .select(RATINGS_TABLE, "rating")
            .eq("recipe_id", recipe_id)
            .fetch()
            .await?;
        Ok(rows.into_iter().map(|r| r.rating).collect())
    }

    /// The signed-in user's own rating for a recipe, if any.
    pub async fn user_rating(
        &self,
        recipe_id: RecipeId,
        user_id: Uuid,
    ) -> Result<Option<i32>, RecipeError> {
        #[derive(serde::Deserialize)]
        struct Row {
            rating: i32,
        }

        let row: Option<Row> = self
            .backend
            .select(RATINGS_TABLE, "rating")
            .eq("recipe_id", recipe_id)
            .eq("user_id", user_id)
            .maybe_single()
            .await?;
        Ok(row.map(|r| r.rating))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_average_is_zero() {
        assert_eq!(average_rating(&[]), 0.0);
    }

    #[test]
    fn test_average_is_unrounded() {
        assert_eq!(average_rating(&[5, 4, 4]), 13.0 / 3.0);
        assert_eq!(average_rating(&[1]), 1.0);
    }

    #[test]
    fn test_rating_value_bounds() {
        assert!(RatingValue::try_from(0).is_err());
        assert!(RatingValue::try_from(6).is_err());
        assert_eq!(RatingValue::try_from(1).unwrap().get(), 1);
        assert_eq!(RatingValue::try_from(5).unwrap().get(), 5);
    }

    #[test]
    fn test_rating_serializes_as_number() {
        let value = RatingValue::try_from(4).unwrap();
        assert_eq!(serde_json::to_string(&value).unwrap(), "4");
    }

    proptest! {
        #[test]
        fn prop_average_within_bounds(ratings in prop::collection::vec(1i32..=5, 1..50)) {
            let avg = average_rating(&ratings);
            let min = *ratings.iter().min().unwrap() as f64;
            let max = *ratings.iter().max().unwrap() as f64;
            prop_assert!(avg >= min && avg <= max);
        }

        #[test]
        fn prop_average_matches_sum(ratings in prop::collection::vec(1i32..=5, 1..50)) {
            let avg = average_rating(&ratings);
            let sum: i32 = ratings.iter().sum();
            prop_assert!((avg * ratings.len() as f64 - sum as f64).abs() < 1e-9);
        }
    }
}
