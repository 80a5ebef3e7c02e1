use std::collections::BTreeMap;

use crate::models::{
    Conversation, ConversationId, Issue, IssueId, Match, MatchId, Profile, ProfileId, Property,
    PropertyId, Rating, RatingId,
};
use crate::storage::Session;

/// In-memory view of everything the store has loaded or written.
///
/// Issues are kept crate-private: callers read them through role-filtered
/// views so internal notes never leak to renters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub session: Option<Session>,
    /// Catalog order.
    pub properties: Vec<Property>,
    pub profiles: BTreeMap<ProfileId, Profile>,
    pub matches: BTreeMap<MatchId, Match>,
    pub(crate) issues: BTreeMap<IssueId, Issue>,
    pub conversations: BTreeMap<ConversationId, Conversation>,
    pub ratings: BTreeMap<RatingId, Rating>,
}

impl AppState {
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }
}

/// A state change, applied only after the adapter accepted the write.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SessionStarted(Session),
    SessionEnded,
    /// Replaces the whole catalog.
    CatalogLoaded(Vec<Property>),
    PropertySaved(Property),
    /// Drops the property plus its matches and their issues.
    PropertyRemoved(PropertyId),
    ProfileSaved(Profile),
    MatchSaved(Match),
    MatchRemoved(MatchId),
    IssueSaved(Issue),
    ConversationSaved(Conversation),
    RatingSaved(Rating),
    Reset,
}

impl Action {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::SessionStarted(_) => "session_started",
            Action::SessionEnded => "session_ended",
            Action::CatalogLoaded(_) => "catalog_loaded",
            Action::PropertySaved(_) => "property_saved",
            Action::PropertyRemoved(_) => "property_removed",
            Action::ProfileSaved(_) => "profile_saved",
            Action::MatchSaved(_) => "match_saved",
            Action::MatchRemoved(_) => "match_removed",
            Action::IssueSaved(_) => "issue_saved",
            Action::ConversationSaved(_) => "conversation_saved",
            Action::RatingSaved(_) => "rating_saved",
            Action::Reset => "reset",
        }
    }
}

pub fn reduce(mut state: AppState, action: Action) -> AppState {
    match action {
        Action::SessionStarted(session) => state.session = Some(session),
        Action::SessionEnded => state.session = None,
        Action::CatalogLoaded(properties) => state.properties = properties,
        Action::PropertySaved(property) => {
            match state.properties.iter_mut().find(|p| p.id == property.id) {
                Some(slot) => *slot = property,
                None => state.properties.push(property),
            }
        }
        Action::PropertyRemoved(id) => {
            state.properties.retain(|p| p.id != id);
            let orphaned: Vec<MatchId> = state
                .matches
                .values()
                .filter(|m| m.property_id == id)
                .map(|m| m.id)
                .collect();
            for match_id in &orphaned {
                state.matches.remove(match_id);
            }
            state.issues.retain(|_, issue| issue.property_id != id);
            for profile in state.profiles.values_mut() {
                match profile {
                    Profile::Landlord(landlord) => landlord.property_ids.retain(|p| *p != id),
                    Profile::Agency(agency) => agency.managed_property_ids.retain(|p| *p != id),
                    Profile::Renter(_) => {}
                }
            }
        }
        Action::ProfileSaved(profile) => {
            state.profiles.insert(profile.id(), profile);
        }
        Action::MatchSaved(m) => {
            state.matches.insert(m.id, m);
        }
        Action::MatchRemoved(id) => {
            state.matches.remove(&id);
            state.issues.retain(|_, issue| issue.match_id != id);
        }
        Action::IssueSaved(issue) => {
            state.issues.insert(issue.id, issue);
        }
        Action::ConversationSaved(conversation) => {
            state.conversations.insert(conversation.id, conversation);
        }
        Action::RatingSaved(rating) => {
            state.ratings.insert(rating.id, rating);
        }
        Action::Reset => state = AppState::default(),
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, PropertyInput};
    use chrono::{NaiveDate, Utc};

    fn property(street: &str) -> Property {
        Property::from_input(
            PropertyInput {
                address: Address {
                    street: street.to_string(),
                    city: "Leeds".to_string(),
                    postcode: "LS1 4AP".to_string(),
                    council: None,
                },
                rent_pcm: Some(850),
                bathrooms: 1,
                available_from: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
                ..Default::default()
            },
            ProfileId::new(),
            Utc::now(),
        )
    }

    #[test]
    fn saving_keeps_catalog_order() {
        let a = property("1 A St");
        let b = property("2 B St");
        let state = reduce(AppState::default(), Action::PropertySaved(a.clone()));
        let state = reduce(state, Action::PropertySaved(b.clone()));

        let mut edited = a.clone();
        edited.rent_pcm = 900;
        let state = reduce(state, Action::PropertySaved(edited));

        let ids: Vec<_> = state.properties.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(state.properties[0].rent_pcm, 900);
    }

    #[test]
    fn removing_a_property_cascades_to_matches() {
        let p = property("1 A St");
        let landlord = p.landlord_id.unwrap();
        let m = Match::new(
            ProfileId::new(),
            landlord,
            p.id,
            None,
            ConversationId::new(),
            Utc::now(),
        );
        let state = reduce(AppState::default(), Action::PropertySaved(p.clone()));
        let state = reduce(state, Action::MatchSaved(m.clone()));
        assert_eq!(state.matches.len(), 1);

        let state = reduce(state, Action::PropertyRemoved(p.id));
        assert!(state.properties.is_empty());
        assert!(state.matches.is_empty());
    }

    #[test]
    fn reset_empties_everything() {
        let state = reduce(AppState::default(), Action::PropertySaved(property("1 A St")));
        assert_eq!(reduce(state, Action::Reset), AppState::default());
    }
}
