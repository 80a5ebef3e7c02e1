//! Read-side aggregation of submitted ratings.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{ProfileId, Rating, RatingCategory, UserType};

/// Derived on read; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRatingsSummary {
    pub user_id: ProfileId,
    pub role: UserType,
    pub total_ratings: usize,
    /// `None` when there is nothing to average.
    pub average_overall: Option<f64>,
    pub category_averages: BTreeMap<RatingCategory, f64>,
    pub would_recommend_percentage: Option<f64>,
}

pub fn summarize(user_id: ProfileId, role: UserType, ratings: &[Rating]) -> UserRatingsSummary {
    let counted: Vec<&Rating> = ratings
        .iter()
        .filter(|r| r.ratee_id == user_id && r.ratee_type == role && r.is_visible())
        .collect();

    let total_ratings = counted.len();
    let average_overall = mean(counted.iter().map(|r| f64::from(r.overall_score)));

    let mut per_category: BTreeMap<RatingCategory, Vec<f64>> = BTreeMap::new();
    for rating in &counted {
        for (category, score) in &rating.category_scores {
            per_category
                .entry(*category)
                .or_default()
                .push(f64::from(*score));
        }
    }
    let category_averages = per_category
        .into_iter()
        .filter_map(|(category, scores)| mean(scores.into_iter()).map(|avg| (category, avg)))
        .collect();

    let would_recommend_percentage = if total_ratings == 0 {
        None
    } else {
        let recommending = counted.iter().filter(|r| r.would_recommend).count();
        Some(recommending as f64 * 100.0 / total_ratings as f64)
    };

    UserRatingsSummary {
        user_id,
        role,
        total_ratings,
        average_overall,
        category_averages,
        would_recommend_percentage,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchId, RatingId};
    use chrono::Utc;

    fn rating(ratee: ProfileId, overall: u8, categories: &[(RatingCategory, u8)]) -> Rating {
        Rating {
            id: RatingId::new(),
            match_id: MatchId::new(),
            rater_id: ProfileId::new(),
            rater_type: UserType::Landlord,
            ratee_id: ratee,
            ratee_type: UserType::Renter,
            overall_score: overall,
            category_scores: categories.iter().copied().collect(),
            review: "x".repeat(60),
            would_recommend: overall >= 4,
            created_at: Utc::now(),
            is_hidden: false,
            is_reported: false,
            version: 0,
        }
    }

    #[test]
    fn five_and_four_average_to_four_and_a_half() {
        let renter = ProfileId::new();
        let summary = summarize(
            renter,
            UserType::Renter,
            &[rating(renter, 5, &[]), rating(renter, 4, &[])],
        );
        assert_eq!(summary.total_ratings, 2);
        assert_eq!(summary.average_overall, Some(4.5));
        assert_eq!(summary.would_recommend_percentage, Some(100.0));
    }

    #[test]
    fn no_ratings_means_no_average() {
        let summary = summarize(ProfileId::new(), UserType::Landlord, &[]);
        assert_eq!(summary.total_ratings, 0);
        assert_eq!(summary.average_overall, None);
        assert!(summary.category_averages.is_empty());
        assert_eq!(summary.would_recommend_percentage, None);
    }

    #[test]
    fn categories_average_only_where_present() {
        let renter = ProfileId::new();
        let ratings = [
            rating(renter, 5, &[(RatingCategory::RespectForProperty, 5)]),
            rating(renter, 3, &[(RatingCategory::RespectForProperty, 2), (RatingCategory::RentPayment, 4)]),
            rating(renter, 4, &[]),
        ];
        let summary = summarize(renter, UserType::Renter, &ratings);
        assert_eq!(
            summary.category_averages.get(&RatingCategory::RespectForProperty),
            Some(&3.5)
        );
        assert_eq!(summary.category_averages.get(&RatingCategory::RentPayment), Some(&4.0));
    }

    #[test]
    fn hidden_and_reported_ratings_are_excluded() {
        let renter = ProfileId::new();
        let mut hidden = rating(renter, 1, &[]);
        hidden.is_hidden = true;
        let mut reported = rating(renter, 1, &[]);
        reported.is_reported = true;
        let summary = summarize(renter, UserType::Renter, &[hidden, reported, rating(renter, 5, &[])]);
        assert_eq!(summary.total_ratings, 1);
        assert_eq!(summary.average_overall, Some(5.0));
    }
}
