use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{ConversationId, IssueId, MatchId, ProfileId, PropertyId};
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenancyStatus {
    #[default]
    Prospective,
    Active,
    Ended,
}

/// Which side of a match an action comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Renter,
    Landlord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetRequestStatus {
    #[default]
    None,
    Requested,
    Approved,
    Refused,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetRequest {
    pub status: PetRequestStatus,
    pub description: Option<String>,
    pub requested_at: Option<DateTime<Utc>>,
    pub respond_by: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub refusal_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ViewingPreference {
    #[validate(length(min = 1, max = 10, message = "Pick between one and ten viewing slots"))]
    pub preferred_slots: Vec<String>,
    pub flexible: bool,
    #[validate(length(max = 500, message = "Notes are too long"))]
    pub notes: Option<String>,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
}

/// Renter ⇄ property relationship and its tenancy lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub renter_id: ProfileId,
    pub landlord_id: ProfileId,
    pub property_id: PropertyId,
    pub agency_id: Option<ProfileId>,
    pub tenancy_status: TenancyStatus,
    pub conversation_id: ConversationId,
    pub viewing_preference: Option<ViewingPreference>,
    #[serde(default)]
    pub pet_request: PetRequest,
    pub right_to_rent_verified_at: Option<DateTime<Utc>>,
    pub tenancy_start_date: Option<NaiveDate>,
    pub tenancy_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub issue_ids: Vec<IssueId>,
    pub has_renter_rated: bool,
    pub has_landlord_rated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: u64,
}

impl Match {
    pub fn new(
        renter_id: ProfileId,
        landlord_id: ProfileId,
        property_id: PropertyId,
        agency_id: Option<ProfileId>,
        conversation_id: ConversationId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MatchId::new(),
            renter_id,
            landlord_id,
            property_id,
            agency_id,
            tenancy_status: TenancyStatus::Prospective,
            conversation_id,
            viewing_preference: None,
            pet_request: PetRequest::default(),
            right_to_rent_verified_at: None,
            tenancy_start_date: None,
            tenancy_end_date: None,
            issue_ids: Vec::new(),
            has_renter_rated: false,
            has_landlord_rated: false,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// The side `profile_id` is on. Managing agencies act for the landlord.
    pub fn party_of(&self, profile_id: ProfileId) -> Option<Party> {
        if profile_id == self.renter_id {
            Some(Party::Renter)
        } else if profile_id == self.landlord_id || Some(profile_id) == self.agency_id {
            Some(Party::Landlord)
        } else {
            None
        }
    }

    pub fn has_rated(&self, party: Party) -> bool {
        match party {
            Party::Renter => self.has_renter_rated,
            Party::Landlord => self.has_landlord_rated,
        }
    }

    pub fn can_rate(&self, party: Party) -> bool {
        self.tenancy_status == TenancyStatus::Ended && !self.has_rated(party)
    }

    /// Locks `party` out of rating this match again.
    pub fn mark_rated(&mut self, party: Party, now: DateTime<Utc>) -> AppResult<()> {
        if self.tenancy_status != TenancyStatus::Ended {
            return Err(validation::field_error(
                "tenancy_status",
                "not_ended",
                "Ratings open once the tenancy has ended",
            ));
        }
        if self.has_rated(party) {
            return Err(AppError::conflict("You have already rated this tenancy"));
        }
        match party {
            Party::Renter => self.has_renter_rated = true,
            Party::Landlord => self.has_landlord_rated = true,
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn record_viewing_preference(
        &mut self,
        mut preference: ViewingPreference,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        preference.validate()?;
        preference.requested_at = Some(now);
        self.viewing_preference = Some(preference);
        self.updated_at = now;
        Ok(())
    }

    pub fn request_pet(
        &mut self,
        description: &str,
        response_window: Duration,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Err(err) = validation::not_blank(description) {
            let mut errors = validator::ValidationErrors::new();
            errors.add("description", err);
            return Err(errors.into());
        }
        match self.pet_request.status {
            PetRequestStatus::None | PetRequestStatus::Refused => {}
            PetRequestStatus::Requested => {
                return Err(AppError::conflict("A pet request is already awaiting a response"))
            }
            PetRequestStatus::Approved => {
                return Err(AppError::conflict("A pet has already been approved"))
            }
        }
        self.pet_request = PetRequest {
            status: PetRequestStatus::Requested,
            description: Some(description.trim().to_string()),
            requested_at: Some(now),
            respond_by: Some(now + response_window),
            responded_at: None,
            refusal_reason: None,
        };
        self.updated_at = now;
        Ok(())
    }

    /// Refusals must give a reason.
    pub fn respond_to_pet_request(
        &mut self,
        approve: bool,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.pet_request.status != PetRequestStatus::Requested {
            return Err(AppError::conflict("There is no pending pet request"));
        }
        if approve {
            self.pet_request.status = PetRequestStatus::Approved;
            self.pet_request.refusal_reason = None;
        } else {
            let reason = reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    validation::field_error(
                        "refusal_reason",
                        "required",
                        "A reason is required when refusing a pet",
                    )
                })?;
            self.pet_request.status = PetRequestStatus::Refused;
            self.pet_request.refusal_reason = Some(reason);
        }
        self.pet_request.responded_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Response deadline passed without an answer.
    pub fn pet_request_overdue(&self, now: DateTime<Utc>) -> bool {
        self.pet_request.status == PetRequestStatus::Requested
            && self.pet_request.respond_by.is_some_and(|deadline| now > deadline)
    }

    pub fn verify_right_to_rent(&mut self, now: DateTime<Utc>) {
        self.right_to_rent_verified_at = Some(now);
        self.updated_at = now;
    }

    pub fn activate(&mut self, start_date: NaiveDate, now: DateTime<Utc>) -> AppResult<()> {
        if self.tenancy_status != TenancyStatus::Prospective {
            return Err(AppError::conflict("Only a prospective match can start a tenancy"));
        }
        if self.right_to_rent_verified_at.is_none() {
            return Err(validation::field_error(
                "right_to_rent_verified_at",
                "required",
                "Right to rent must be verified before the tenancy starts",
            ));
        }
        self.tenancy_status = TenancyStatus::Active;
        self.tenancy_start_date = Some(start_date);
        self.updated_at = now;
        Ok(())
    }

    pub fn end(&mut self, end_date: NaiveDate, now: DateTime<Utc>) -> AppResult<()> {
        if self.tenancy_status != TenancyStatus::Active {
            return Err(AppError::conflict("Only an active tenancy can end"));
        }
        if self.tenancy_start_date.is_some_and(|start| end_date < start) {
            return Err(validation::field_error(
                "tenancy_end_date",
                "before_start",
                "The tenancy cannot end before it started",
            ));
        }
        self.tenancy_status = TenancyStatus::Ended;
        self.tenancy_end_date = Some(end_date);
        self.updated_at = now;
        Ok(())
    }
}
