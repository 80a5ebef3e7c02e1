use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, AuthError};
use crate::matching::{self, LikeOutcome};
use crate::models::{
    Conversation, Issue, Match, MatchId, Participant, Party, Profile, ProfileId, Property, PropertyId,
    RenterStatus, TenancyStatus, UserType, ViewingPreference,
};
use crate::storage::PersistenceAdapter;
use crate::store::{Action, Store};

/// A match with the records around it, as listed to one side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOverview {
    #[serde(rename = "match")]
    pub record: Match,
    /// `None` when the property could not be loaded.
    pub property: Option<Property>,
    /// The other side's profile; `None` when the lookup failed.
    pub counterpart: Option<Profile>,
}

impl<A: PersistenceAdapter> Store<A> {
    /// Records a like and creates the match when the policy allows.
    pub async fn handle_like(&self, renter_id: ProfileId, property_id: PropertyId) -> AppResult<LikeOutcome> {
        let _ticket = self.begin_submission(format!("like:{renter_id}:{property_id}"))?;
        let repo = self.repo();
        let mut renter = self.profile_as(renter_id, UserType::Renter).await?;
        let property: Property = repo.require(property_id).await?;
        let Some(landlord_id) = property.landlord_id.filter(|_| property.is_listed()) else {
            return Err(AppError::conflict("This property is not currently listed"));
        };

        let existing: Vec<Match> = repo
            .list_where(|m: &Match| m.renter_id == renter_id && m.property_id == property_id)
            .await?;

        let Some(r) = renter.as_renter_mut() else {
            return Err(AuthError::Forbidden.into());
        };
        let recorded = matching::record_like(r, property_id);
        if recorded {
            r.identity.updated_at = self.now();
            repo.save(&mut renter).await?;
            debug!("Renter {} liked {}", renter_id, property_id);
            self.dispatch(Action::ProfileSaved(renter.clone()));
        }
        if !existing.is_empty() {
            return Ok(LikeOutcome::AlreadyLiked);
        }

        let landlord = self.profile_as(landlord_id, UserType::Landlord).await?;
        let ready = match (renter.as_renter(), landlord.as_landlord()) {
            (Some(r), Some(l)) => matching::should_match(self.config().match_policy, r, l, property_id),
            _ => false,
        };
        if ready {
            let m = self.create_match(&renter, &landlord, &property).await?;
            return Ok(LikeOutcome::Matched(Box::new(m)));
        }
        Ok(if recorded {
            LikeOutcome::Liked
        } else {
            LikeOutcome::AlreadyLiked
        })
    }

    /// Landlord-side interest; completes a pending like under the mutual policy.
    pub async fn express_landlord_interest(
        &self,
        landlord_id: ProfileId,
        renter_id: ProfileId,
        property_id: PropertyId,
    ) -> AppResult<Option<Match>> {
        let repo = self.repo();
        let mut landlord = self.profile_as(landlord_id, UserType::Landlord).await?;
        let renter = self.profile_as(renter_id, UserType::Renter).await?;
        let property: Property = repo.require(property_id).await?;
        if !property.is_owned_by(landlord_id) {
            return Err(AuthError::Forbidden.into());
        }

        let (Some(l), Some(r)) = (landlord.as_landlord_mut(), renter.as_renter()) else {
            return Err(AuthError::Forbidden.into());
        };
        if matching::record_interest(l, r, property_id, self.now()) {
            repo.save(&mut landlord).await?;
            info!("Landlord {} interested in renter {} for {}", landlord_id, renter_id, property_id);
            self.dispatch(Action::ProfileSaved(landlord.clone()));
        }

        let existing: Vec<Match> = repo
            .list_where(|m: &Match| m.renter_id == renter_id && m.property_id == property_id)
            .await?;
        if !existing.is_empty() || !property.is_listed() {
            return Ok(None);
        }
        let ready = match (renter.as_renter(), landlord.as_landlord()) {
            (Some(r), Some(l)) => matching::should_match(self.config().match_policy, r, l, property_id),
            _ => false,
        };
        if !ready {
            return Ok(None);
        }
        Ok(Some(self.create_match(&renter, &landlord, &property).await?))
    }

    /// Records a pass. Passing is permanent: the property never returns to the deck.
    pub async fn handle_dislike(&self, renter_id: ProfileId, property_id: PropertyId) -> AppResult<()> {
        let repo = self.repo();
        let mut renter = self.profile_as(renter_id, UserType::Renter).await?;
        repo.require::<Property>(property_id).await?;

        if let Some(r) = renter.as_renter_mut() {
            if !matching::record_pass(r, property_id) {
                return Ok(());
            }
            r.identity.updated_at = self.now();
        }
        repo.save(&mut renter).await?;
        debug!("Renter {} passed on {}", renter_id, property_id);
        self.dispatch(Action::ProfileSaved(renter));
        Ok(())
    }

    /// The renter's deck over the persisted catalog.
    pub async fn unseen_properties(&self, renter_id: ProfileId) -> AppResult<Vec<Property>> {
        let profile = self.profile_as(renter_id, UserType::Renter).await?;
        let Some(renter) = profile.as_renter() else {
            return Err(AuthError::Forbidden.into());
        };
        let repo = self.repo();
        let catalog: Vec<Property> = repo.list().await?;
        let matches: Vec<Match> = repo.list_where(|m: &Match| m.renter_id == renter_id).await?;
        Ok(matching::unseen_properties(renter, &catalog, &matches)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Either side may unmatch, unless a tenancy is running.
    pub async fn unmatch(&self, match_id: MatchId, actor_id: ProfileId) -> AppResult<()> {
        let repo = self.repo();
        let m: Match = repo.require(match_id).await?;
        if m.party_of(actor_id).is_none() {
            return Err(AuthError::Forbidden.into());
        }
        if m.tenancy_status == TenancyStatus::Active {
            return Err(AppError::conflict("End the tenancy before unmatching"));
        }

        let issues: Vec<Issue> = repo.list_where(|i: &Issue| i.match_id == match_id).await?;
        for issue in &issues {
            repo.remove::<Issue>(issue.id).await?;
        }
        repo.remove::<Match>(match_id).await?;
        info!("Match {} removed by {}", match_id, actor_id);
        self.dispatch(Action::MatchRemoved(match_id));
        Ok(())
    }

    pub async fn record_viewing_preference(
        &self,
        match_id: MatchId,
        renter_id: ProfileId,
        preference: ViewingPreference,
    ) -> AppResult<Match> {
        let now = self.now();
        self.update_match(match_id, renter_id, Party::Renter, |m| {
            m.record_viewing_preference(preference, now)
        })
        .await
    }

    pub async fn request_pet(&self, match_id: MatchId, renter_id: ProfileId, description: &str) -> AppResult<Match> {
        let now = self.now();
        let window = Duration::days(self.config().pet_response_days);
        self.update_match(match_id, renter_id, Party::Renter, |m| {
            m.request_pet(description, window, now)
        })
        .await
    }

    pub async fn respond_to_pet_request(
        &self,
        match_id: MatchId,
        landlord_id: ProfileId,
        approve: bool,
        reason: Option<String>,
    ) -> AppResult<Match> {
        let now = self.now();
        self.update_match(match_id, landlord_id, Party::Landlord, |m| {
            m.respond_to_pet_request(approve, reason, now)
        })
        .await
    }

    pub async fn verify_right_to_rent(&self, match_id: MatchId, landlord_id: ProfileId) -> AppResult<Match> {
        let now = self.now();
        self.update_match(match_id, landlord_id, Party::Landlord, |m| {
            m.verify_right_to_rent(now);
            Ok(())
        })
        .await
    }

    /// Starts the tenancy; the renter becomes a current tenant and the
    /// property leaves the market.
    pub async fn activate_tenancy(
        &self,
        match_id: MatchId,
        landlord_id: ProfileId,
        start_date: NaiveDate,
    ) -> AppResult<Match> {
        let now = self.now();
        let m = self
            .update_match(match_id, landlord_id, Party::Landlord, |m| m.activate(start_date, now))
            .await?;
        self.settle_tenancy(&m, RenterStatus::CurrentTenant).await?;
        info!("Tenancy {} active from {}", match_id, start_date);
        Ok(m)
    }

    /// Ends the tenancy; the renter is prospective again and ratings open.
    pub async fn end_tenancy(&self, match_id: MatchId, landlord_id: ProfileId, end_date: NaiveDate) -> AppResult<Match> {
        let now = self.now();
        let m = self
            .update_match(match_id, landlord_id, Party::Landlord, |m| m.end(end_date, now))
            .await?;
        self.settle_tenancy(&m, RenterStatus::Prospective).await?;
        info!("Tenancy {} ended on {}", match_id, end_date);
        Ok(m)
    }

    pub async fn can_rate(&self, match_id: MatchId, actor_id: ProfileId) -> AppResult<bool> {
        let m: Match = self.repo().require(match_id).await?;
        let party = m.party_of(actor_id).ok_or(AuthError::Forbidden)?;
        Ok(m.can_rate(party))
    }

    /// The viewer's matches with counterpart profiles. Lookups that fail are
    /// logged and left empty rather than failing the list.
    pub async fn match_overviews(&self, viewer_id: ProfileId) -> AppResult<Vec<MatchOverview>> {
        let repo = self.repo();
        let mut matches: Vec<Match> = repo
            .list_where(|m: &Match| m.party_of(viewer_id).is_some())
            .await?;
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut overviews = Vec::with_capacity(matches.len());
        for m in matches {
            let counterpart_id = match m.party_of(viewer_id) {
                Some(Party::Renter) => m.landlord_id,
                _ => m.renter_id,
            };
            let counterpart = match repo.load::<Profile>(counterpart_id).await {
                Ok(Some(profile)) => Some(profile),
                Ok(None) => {
                    warn!("Counterpart {} of match {} not found", counterpart_id, m.id);
                    None
                }
                Err(err) => {
                    warn!("Failed to load counterpart {} of match {}: {}", counterpart_id, m.id, err);
                    None
                }
            };
            let property = match repo.load::<Property>(m.property_id).await {
                Ok(found) => found,
                Err(err) => {
                    warn!("Failed to load property {} of match {}: {}", m.property_id, m.id, err);
                    None
                }
            };
            overviews.push(MatchOverview {
                record: m,
                property,
                counterpart,
            });
        }
        Ok(overviews)
    }

    async fn create_match(&self, renter: &Profile, landlord: &Profile, property: &Property) -> AppResult<Match> {
        let repo = self.repo();
        let now = self.now();

        let _lock = self.conversation_lock.lock().await;
        let existing: Vec<Conversation> = repo
            .list_where(|c: &Conversation| c.connects(renter.id(), landlord.id(), Some(property.id)))
            .await?;
        let mut conversation = existing.into_iter().next().unwrap_or_else(|| {
            Conversation::new(
                Participant::new(renter.id(), renter.user_type(), renter.display_name()),
                Participant::new(landlord.id(), landlord.user_type(), landlord.display_name()),
                Some(property.id),
                None,
                now,
            )
        });

        let mut m = Match::new(
            renter.id(),
            landlord.id(),
            property.id,
            property.managing_agency_id,
            conversation.id,
            now,
        );
        repo.save(&mut m).await?;
        conversation.match_id = Some(m.id);
        repo.save(&mut conversation).await?;
        info!("Matched renter {} with property {} ({})", renter.id(), property.id, m.id);

        self.dispatch_all(vec![
            Action::MatchSaved(m.clone()),
            Action::ConversationSaved(conversation),
        ]);
        Ok(m)
    }

    /// Loads a match, checks `actor_id` is on `side`, applies `change` and saves.
    async fn update_match<F>(&self, match_id: MatchId, actor_id: ProfileId, side: Party, change: F) -> AppResult<Match>
    where
        F: FnOnce(&mut Match) -> AppResult<()>,
    {
        let repo = self.repo();
        let mut m: Match = repo.require(match_id).await?;
        if m.party_of(actor_id) != Some(side) {
            debug!("{} is not the {:?} side of match {}", actor_id, side, match_id);
            return Err(AuthError::Forbidden.into());
        }
        change(&mut m)?;
        repo.save(&mut m).await?;
        self.dispatch(Action::MatchSaved(m.clone()));
        Ok(m)
    }

    async fn settle_tenancy(&self, m: &Match, status: RenterStatus) -> AppResult<()> {
        let repo = self.repo();
        let now = self.now();
        let mut actions = Vec::new();

        let mut renter: Profile = repo.require(m.renter_id).await?;
        if let Some(r) = renter.as_renter_mut() {
            r.status = status;
            r.current_property_id = match status {
                RenterStatus::CurrentTenant => Some(m.property_id),
                RenterStatus::Prospective => None,
            };
            r.identity.updated_at = now;
        }
        repo.save(&mut renter).await?;
        actions.push(Action::ProfileSaved(renter));

        match repo.load::<Property>(m.property_id).await? {
            Some(mut property) => {
                property.is_available = status == RenterStatus::Prospective;
                property.updated_at = now;
                repo.save(&mut property).await?;
                actions.push(Action::PropertySaved(property));
            }
            None => warn!("Property {} of match {} is gone", m.property_id, m.id),
        }
        self.dispatch_all(actions);
        Ok(())
    }
}
