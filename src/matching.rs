//! Swipe decisions and deck derivation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{LandlordProfile, Match, Property, PropertyId, RenterInterest, RenterProfile};

/// When a renter's like turns into a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Every like creates a match.
    #[default]
    Unconditional,
    /// The landlord must also have expressed interest in the renter.
    MutualInterest,
}

impl FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unconditional" => Ok(MatchPolicy::Unconditional),
            "mutual" | "mutual_interest" => Ok(MatchPolicy::MutualInterest),
            other => Err(format!("unknown match policy {other:?}")),
        }
    }
}

/// Result of a like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    /// Already liked before; nothing changed.
    AlreadyLiked,
    /// Like recorded, waiting on the landlord.
    Liked,
    Matched(Box<Match>),
}

/// Records a like. Returns `false` when it was already there.
pub fn record_like(renter: &mut RenterProfile, property_id: PropertyId) -> bool {
    if renter.liked_property_ids.contains(&property_id) {
        return false;
    }
    // A later like overrides an earlier pass.
    renter.passed_property_ids.retain(|id| *id != property_id);
    renter.liked_property_ids.push(property_id);
    true
}

/// Records a pass. Returns `false` when it was already there.
pub fn record_pass(renter: &mut RenterProfile, property_id: PropertyId) -> bool {
    if renter.passed_property_ids.contains(&property_id) {
        return false;
    }
    renter.liked_property_ids.retain(|id| *id != property_id);
    renter.passed_property_ids.push(property_id);
    true
}

/// Records landlord-side interest. Returns `false` when it was already there.
pub fn record_interest(
    landlord: &mut LandlordProfile,
    renter: &RenterProfile,
    property_id: PropertyId,
    now: DateTime<Utc>,
) -> bool {
    let renter_id = renter.identity.id;
    if landlord.is_interested_in(renter_id, property_id) {
        return false;
    }
    landlord.renter_interests.push(RenterInterest {
        renter_id,
        property_id,
        expressed_at: now,
    });
    true
}

/// Whether a like on `property_id` should produce a match now.
pub fn should_match(
    policy: MatchPolicy,
    renter: &RenterProfile,
    landlord: &LandlordProfile,
    property_id: PropertyId,
) -> bool {
    if !renter.liked_property_ids.contains(&property_id) {
        return false;
    }
    match policy {
        MatchPolicy::Unconditional => true,
        MatchPolicy::MutualInterest => landlord.is_interested_in(renter.identity.id, property_id),
    }
}

pub fn existing_match<'m>(
    matches: &'m [Match],
    renter: &RenterProfile,
    property_id: PropertyId,
) -> Option<&'m Match> {
    matches
        .iter()
        .find(|m| m.renter_id == renter.identity.id && m.property_id == property_id)
}

/// The renter's deck: listed properties not yet liked, passed or matched,
/// in catalog order.
pub fn unseen_properties<'p>(
    renter: &RenterProfile,
    catalog: &'p [Property],
    matches: &[Match],
) -> Vec<&'p Property> {
    catalog
        .iter()
        .filter(|p| p.is_listed())
        .filter(|p| !renter.has_swiped(p.id))
        .filter(|p| existing_match(matches, renter, p.id).is_none())
        .collect()
}
