use tracing::info;

use crate::error::{AppResult, AuthError};
use crate::models::{Match, Party, Profile, ProfileId, Rating, RatingId, RatingInput, UserType};
use crate::ratings::{self, UserRatingsSummary};
use crate::storage::PersistenceAdapter;
use crate::store::{Action, Store};

impl<A: PersistenceAdapter> Store<A> {
    /// Rates the other side of an ended tenancy, once per side.
    pub async fn submit_rating(&self, rater_id: ProfileId, input: RatingInput) -> AppResult<Rating> {
        let _ticket = self.begin_submission(format!("rating:{}:{}", input.match_id, rater_id))?;
        let repo = self.repo();
        let rater = self.active_profile(rater_id).await?;
        let mut m: Match = repo.require(input.match_id).await?;
        let party = m.party_of(rater_id).ok_or(AuthError::Forbidden)?;

        let (ratee_id, ratee_type) = match party {
            Party::Renter => (m.landlord_id, UserType::Landlord),
            Party::Landlord => (m.renter_id, UserType::Renter),
        };
        input.check(ratee_type)?;

        let now = self.now();
        m.mark_rated(party, now)?;
        // The lockout is written first so a second submission always conflicts.
        repo.save(&mut m).await?;

        let mut rating = Rating {
            id: RatingId::new(),
            match_id: m.id,
            rater_id,
            rater_type: rater.user_type(),
            ratee_id,
            ratee_type,
            overall_score: input.overall_score,
            category_scores: input.category_scores,
            review: input.review.trim().to_string(),
            would_recommend: input.would_recommend,
            created_at: now,
            is_hidden: false,
            is_reported: false,
            version: 0,
        };
        repo.save(&mut rating).await?;
        info!("Rating {} by {} on match {}", rating.id, rater_id, m.id);

        self.dispatch_all(vec![Action::MatchSaved(m), Action::RatingSaved(rating.clone())]);
        Ok(rating)
    }

    pub async fn ratings_summary(&self, user_id: ProfileId) -> AppResult<UserRatingsSummary> {
        let profile: Profile = self.repo().require(user_id).await?;
        let received: Vec<Rating> = self
            .repo()
            .list_where(|r: &Rating| r.ratee_id == user_id)
            .await?;
        Ok(ratings::summarize(user_id, profile.user_type(), &received))
    }

    /// Hides or restores a rating; the only edit a submitted rating allows.
    pub async fn moderate(&self, rating_id: RatingId, hidden: bool) -> AppResult<Rating> {
        self.flag_rating(rating_id, |r| r.is_hidden = hidden).await
    }

    pub async fn report_rating(&self, rating_id: RatingId) -> AppResult<Rating> {
        self.flag_rating(rating_id, |r| r.is_reported = true).await
    }

    async fn flag_rating(&self, rating_id: RatingId, flag: impl FnOnce(&mut Rating)) -> AppResult<Rating> {
        let mut rating: Rating = self.repo().require(rating_id).await?;
        flag(&mut rating);
        self.repo().save(&mut rating).await?;
        info!(
            "Rating {} moderation: hidden={} reported={}",
            rating_id, rating.is_hidden, rating.is_reported
        );
        self.dispatch(Action::RatingSaved(rating.clone()));
        Ok(rating)
    }
}
