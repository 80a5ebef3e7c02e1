use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::models::{MatchId, ProfileId, RatingId, UserType};
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingCategory {
    Communication,
    Responsiveness,
    PropertyCondition,
    Maintenance,
    Fairness,
    RespectForProperty,
    RentPayment,
}

impl RatingCategory {
    /// Whether the category makes sense for someone of `ratee` type.
    pub fn applies_to(self, ratee: UserType) -> bool {
        use RatingCategory::*;
        match ratee {
            UserType::Renter => matches!(self, Communication | RespectForProperty | RentPayment),
            UserType::Landlord => matches!(
                self,
                Communication | Responsiveness | PropertyCondition | Maintenance | Fairness
            ),
            UserType::Agency => matches!(self, Communication | Responsiveness | Maintenance | Fairness),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RatingInput {
    pub match_id: MatchId,
    #[validate(range(min = 1, max = 5, message = "Scores run from 1 to 5"))]
    pub overall_score: u8,
    #[serde(default)]
    pub category_scores: BTreeMap<RatingCategory, u8>,
    #[validate(custom(function = "validation::review_text"))]
    pub review: String,
    pub would_recommend: bool,
}

impl RatingInput {
    pub fn check(&self, ratee: UserType) -> AppResult<()> {
        let mut errors = validation::collect(self.validate());

        for (category, score) in &self.category_scores {
            if !category.applies_to(ratee) {
                errors.add(
                    "category_scores",
                    validation::error("category", format!("{category:?} does not apply to a {ratee:?}")),
                );
            } else if !(1..=5).contains(score) {
                errors.add(
                    "category_scores",
                    validation::error("range", "Scores run from 1 to 5"),
                );
            }
        }

        validation::finish(errors)
    }
}

/// A submitted review; only the moderation flags change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: RatingId,
    pub match_id: MatchId,
    pub rater_id: ProfileId,
    pub rater_type: UserType,
    pub ratee_id: ProfileId,
    pub ratee_type: UserType,
    pub overall_score: u8,
    pub category_scores: BTreeMap<RatingCategory, u8>,
    pub review: String,
    pub would_recommend: bool,
    pub created_at: DateTime<Utc>,
    pub is_hidden: bool,
    pub is_reported: bool,
    #[serde(skip)]
    pub version: u64,
}

impl Rating {
    /// Counts towards summaries.
    pub fn is_visible(&self) -> bool {
        !self.is_hidden && !self.is_reported
    }
}
