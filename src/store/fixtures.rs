//! Shared builders for store unit tests.

use chrono::NaiveDate;

use crate::config::Config;
use crate::issues::SlaConfig;
use crate::models::{
    Address, AgencyOnboarding, IdentityInput, LandlordOnboarding, OnboardingInput, PropertyInput,
    RenterOnboarding, RenterSituation,
};
use crate::storage::MemoryAdapter;
use crate::store::Store;

pub const PASSWORD: &str = "correct horse battery";

pub fn config() -> Config {
    Config {
        bcrypt_cost: 4,
        ..Config::default()
    }
}

pub fn store() -> Store<MemoryAdapter> {
    Store::new(MemoryAdapter::new(), config())
}

fn identity(email: &str, name: &str) -> IdentityInput {
    IdentityInput {
        email: email.to_string(),
        full_name: name.to_string(),
        phone: None,
    }
}

pub fn renter_form(email: &str) -> OnboardingInput {
    OnboardingInput::Renter(RenterOnboarding {
        identity: identity(email, "Sam Carter"),
        monthly_income: Some(3000),
        ages: "28".to_string(),
        situation: RenterSituation::Single,
        preferred_move_in: None,
        has_pets: false,
    })
}

pub fn landlord_form(email: &str) -> OnboardingInput {
    OnboardingInput::Landlord(LandlordOnboarding {
        identity: identity(email, "Priya Shah"),
        registration_number: Some("PRS-1234".to_string()),
        ombudsman_scheme: None,
        certifications: Default::default(),
    })
}

pub fn agency_form(email: &str) -> OnboardingInput {
    OnboardingInput::Agency(AgencyOnboarding {
        identity: identity(email, "Ops Desk"),
        company_name: "Northern Lets".to_string(),
        company_registration_number: "09876543".to_string(),
        service_areas: vec!["Leeds".to_string()],
        sla_config: SlaConfig::default(),
    })
}

pub fn property_input(street: &str) -> PropertyInput {
    PropertyInput {
        address: Address {
            street: street.to_string(),
            city: "Leeds".to_string(),
            postcode: "LS6 2AB".to_string(),
            council: Some("Leeds City Council".to_string()),
        },
        rent_pcm: Some(850),
        deposit: 950,
        bedrooms: 2,
        bathrooms: 1,
        available_from: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
        description: "Bright two-bed terrace close to the park.".to_string(),
        ..Default::default()
    }
}
