use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::issues::SlaConfig;
use crate::models::{ProfileId, PropertyId};
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Renter,
    Landlord,
    Agency,
}

impl UserType {
    /// Landlords and agencies see internal issue notes.
    pub fn is_management(self) -> bool {
        match self {
            UserType::Renter => false,
            UserType::Landlord | UserType::Agency => true,
        }
    }
}

/// Fields every account carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: ProfileId,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub is_active: bool,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenterSituation {
    #[default]
    Single,
    Couple,
    Family,
    Professionals,
    Students,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenterStatus {
    #[default]
    Prospective,
    CurrentTenant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenterProfile {
    pub identity: Identity,
    pub monthly_income: Option<u32>,
    pub ages: String,
    pub situation: RenterSituation,
    pub preferred_move_in: Option<NaiveDate>,
    pub has_pets: bool,
    pub status: RenterStatus,
    pub current_property_id: Option<PropertyId>,
    #[serde(default)]
    pub liked_property_ids: Vec<PropertyId>,
    #[serde(default)]
    pub passed_property_ids: Vec<PropertyId>,
}

impl RenterProfile {
    pub fn has_swiped(&self, property_id: PropertyId) -> bool {
        self.liked_property_ids.contains(&property_id) || self.passed_property_ids.contains(&property_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OmbudsmanScheme {
    PropertyOmbudsman,
    PropertyRedressScheme,
    HousingOmbudsman,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EpcRating {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certifications {
    pub gas_safety_expiry: Option<NaiveDate>,
    pub eicr_expiry: Option<NaiveDate>,
    pub epc_rating: Option<EpcRating>,
}

impl Certifications {
    /// Expired or missing certificates as of `today`.
    pub fn outstanding(&self, today: NaiveDate) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.gas_safety_expiry.map_or(true, |expiry| expiry < today) {
            missing.push("gas_safety");
        }
        if self.eicr_expiry.map_or(true, |expiry| expiry < today) {
            missing.push("eicr");
        }
        if self.epc_rating.is_none() {
            missing.push("epc");
        }
        missing
    }
}

/// Landlord-side interest in a renter for one property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenterInterest {
    pub renter_id: ProfileId,
    pub property_id: PropertyId,
    pub expressed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandlordProfile {
    pub identity: Identity,
    pub registration_number: Option<String>,
    pub ombudsman_scheme: Option<OmbudsmanScheme>,
    #[serde(default)]
    pub certifications: Certifications,
    #[serde(default)]
    pub property_ids: Vec<PropertyId>,
    #[serde(default)]
    pub renter_interests: Vec<RenterInterest>,
}

impl LandlordProfile {
    pub fn is_interested_in(&self, renter_id: ProfileId, property_id: PropertyId) -> bool {
        self.renter_interests
            .iter()
            .any(|i| i.renter_id == renter_id && i.property_id == property_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyProfile {
    pub identity: Identity,
    pub company_name: String,
    pub company_registration_number: String,
    #[serde(default)]
    pub service_areas: Vec<String>,
    #[serde(default)]
    pub sla_config: SlaConfig,
    #[serde(default)]
    pub managed_property_ids: Vec<PropertyId>,
    #[serde(default)]
    pub landlord_client_ids: Vec<ProfileId>,
}

/// An account, tagged by `userType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "userType", rename_all = "snake_case")]
pub enum Profile {
    Renter(RenterProfile),
    Landlord(LandlordProfile),
    Agency(AgencyProfile),
}

impl Profile {
    pub fn identity(&self) -> &Identity {
        match self {
            Profile::Renter(p) => &p.identity,
            Profile::Landlord(p) => &p.identity,
            Profile::Agency(p) => &p.identity,
        }
    }

    pub fn identity_mut(&mut self) -> &mut Identity {
        match self {
            Profile::Renter(p) => &mut p.identity,
            Profile::Landlord(p) => &mut p.identity,
            Profile::Agency(p) => &mut p.identity,
        }
    }

    pub fn id(&self) -> ProfileId {
        self.identity().id
    }

    pub fn user_type(&self) -> UserType {
        match self {
            Profile::Renter(_) => UserType::Renter,
            Profile::Landlord(_) => UserType::Landlord,
            Profile::Agency(_) => UserType::Agency,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Profile::Agency(p) if !p.company_name.trim().is_empty() => &p.company_name,
            other => &other.identity().full_name,
        }
    }

    pub fn is_active(&self) -> bool {
        self.identity().is_active
    }

    pub fn as_renter(&self) -> Option<&RenterProfile> {
        match self {
            Profile::Renter(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_renter_mut(&mut self) -> Option<&mut RenterProfile> {
        match self {
            Profile::Renter(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_landlord(&self) -> Option<&LandlordProfile> {
        match self {
            Profile::Landlord(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_landlord_mut(&mut self) -> Option<&mut LandlordProfile> {
        match self {
            Profile::Landlord(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_agency(&self) -> Option<&AgencyProfile> {
        match self {
            Profile::Agency(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_agency_mut(&mut self) -> Option<&mut AgencyProfile> {
        match self {
            Profile::Agency(p) => Some(p),
            _ => None,
        }
    }
}

// -- =====================
// -- ONBOARDING
// -- =====================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IdentityInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom(function = "validation::not_blank"))]
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenterOnboarding {
    #[validate(nested)]
    pub identity: IdentityInput,
    #[validate(range(max = 1_000_000, message = "Income looks wrong"))]
    pub monthly_income: Option<u32>,
    #[validate(custom(function = "validation::not_blank"))]
    pub ages: String,
    #[serde(default)]
    pub situation: RenterSituation,
    pub preferred_move_in: Option<NaiveDate>,
    #[serde(default)]
    pub has_pets: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LandlordOnboarding {
    #[validate(nested)]
    pub identity: IdentityInput,
    pub registration_number: Option<String>,
    pub ombudsman_scheme: Option<OmbudsmanScheme>,
    #[serde(default)]
    pub certifications: Certifications,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AgencyOnboarding {
    #[validate(nested)]
    pub identity: IdentityInput,
    #[validate(custom(function = "validation::not_blank"))]
    pub company_name: String,
    #[validate(custom(function = "validation::not_blank"))]
    pub company_registration_number: String,
    #[serde(default)]
    pub service_areas: Vec<String>,
    #[validate(nested)]
    #[serde(default)]
    pub sla_config: SlaConfig,
}

/// Completed onboarding form for one of the three account kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "userType", rename_all = "snake_case")]
pub enum OnboardingInput {
    Renter(RenterOnboarding),
    Landlord(LandlordOnboarding),
    Agency(AgencyOnboarding),
}

impl OnboardingInput {
    pub fn check(&self) -> AppResult<()> {
        match self {
            OnboardingInput::Renter(form) => form.validate()?,
            OnboardingInput::Landlord(form) => form.validate()?,
            OnboardingInput::Agency(form) => form.validate()?,
        }
        Ok(())
    }

    pub fn email(&self) -> &str {
        &self.identity_input().email
    }

    fn identity_input(&self) -> &IdentityInput {
        match self {
            OnboardingInput::Renter(form) => &form.identity,
            OnboardingInput::Landlord(form) => &form.identity,
            OnboardingInput::Agency(form) => &form.identity,
        }
    }

    /// Builds the persisted profile, marked as onboarded.
    pub fn into_profile(self, now: DateTime<Utc>) -> Profile {
        let identity = |input: IdentityInput| Identity {
            id: ProfileId::new(),
            email: normalize_email(&input.email),
            full_name: input.full_name.trim().to_string(),
            phone: input.phone,
            is_active: true,
            onboarding_complete: true,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        match self {
            OnboardingInput::Renter(form) => Profile::Renter(RenterProfile {
                identity: identity(form.identity),
                monthly_income: form.monthly_income,
                ages: form.ages,
                situation: form.situation,
                preferred_move_in: form.preferred_move_in,
                has_pets: form.has_pets,
                status: RenterStatus::Prospective,
                current_property_id: None,
                liked_property_ids: Vec::new(),
                passed_property_ids: Vec::new(),
            }),
            OnboardingInput::Landlord(form) => Profile::Landlord(LandlordProfile {
                identity: identity(form.identity),
                registration_number: form.registration_number,
                ombudsman_scheme: form.ombudsman_scheme,
                certifications: form.certifications,
                property_ids: Vec::new(),
                renter_interests: Vec::new(),
            }),
            OnboardingInput::Agency(form) => Profile::Agency(AgencyProfile {
                identity: identity(form.identity),
                company_name: form.company_name,
                company_registration_number: form.company_registration_number,
                service_areas: form.service_areas,
                sla_config: form.sla_config,
                managed_property_ids: Vec::new(),
                landlord_client_ids: Vec::new(),
            }),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renter_form() -> RenterOnboarding {
        RenterOnboarding {
            identity: IdentityInput {
                email: "Sam@Example.com ".to_string(),
                full_name: "Sam Carter".to_string(),
                phone: None,
            },
            monthly_income: Some(3000),
            ages: "28".to_string(),
            situation: RenterSituation::Single,
            preferred_move_in: None,
            has_pets: false,
        }
    }

    #[test]
    fn profile_serializes_with_user_type_tag() {
        let profile = OnboardingInput::Renter(renter_form()).into_profile(Utc::now());
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["userType"], "renter");
        assert_eq!(json["monthlyIncome"], 3000);
        assert_eq!(json["identity"]["onboardingComplete"], true);

        let back: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(back.user_type(), UserType::Renter);
    }

    #[test]
    fn onboarding_normalizes_email() {
        let profile = OnboardingInput::Renter(renter_form()).into_profile(Utc::now());
        assert_eq!(profile.identity().email, "sam@example.com");
    }

    #[test]
    fn agency_form_rejects_invalid_sla() {
        let form = AgencyOnboarding {
            identity: IdentityInput {
                email: "ops@lets.co.uk".to_string(),
                full_name: "Ops".to_string(),
                phone: None,
            },
            company_name: "Lets Ltd".to_string(),
            company_registration_number: "01234567".to_string(),
            service_areas: vec!["Leeds".to_string()],
            sla_config: SlaConfig {
                emergency_response_hours: 48,
                ..SlaConfig::default()
            },
        };
        assert!(OnboardingInput::Agency(form).check().is_err());
    }

    #[test]
    fn expired_certificates_are_outstanding() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let certs = Certifications {
            gas_safety_expiry: NaiveDate::from_ymd_opt(2026, 5, 1),
            eicr_expiry: NaiveDate::from_ymd_opt(2027, 1, 1),
            epc_rating: Some(EpcRating::C),
        };
        assert_eq!(certs.outstanding(today), vec!["gas_safety"]);
    }
}
