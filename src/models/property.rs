use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::models::{ProfileId, PropertyId};
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Furnishing {
    Furnished,
    PartFurnished,
    #[default]
    Unfurnished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetType {
    Dog,
    Cat,
    SmallMammal,
    Bird,
    Fish,
    Reptile,
}

/// Postal address of a rental unit
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(custom(function = "validation::not_blank"))]
    pub street: String,
    #[validate(custom(function = "validation::not_blank"))]
    pub city: String,
    #[validate(custom(function = "validation::not_blank"))]
    pub postcode: String,
    pub council: Option<String>,
}

/// Landlord's stance on pets
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetsPolicy {
    pub allowed: bool,
    /// Per-type preference; types not listed follow `allowed`.
    #[serde(default)]
    pub preferences: BTreeMap<PetType, bool>,
    pub max_pets: u8,
    pub insurance_required: bool,
}

impl PetsPolicy {
    pub fn accepts(&self, pet: PetType) -> bool {
        self.allowed && self.preferences.get(&pet).copied().unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compliance {
    pub meets_decent_homes_standard: bool,
    pub awaabs_law_compliant: bool,
}

/// Landlord-submitted listing form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInput {
    #[validate(nested)]
    pub address: Address,
    #[validate(
        required(message = "Rent is required"),
        range(min = 1, message = "Rent must be greater than zero")
    )]
    pub rent_pcm: Option<u32>,
    #[serde(default)]
    pub deposit: u32,
    pub bedrooms: u8,
    #[validate(range(min = 1, message = "At least one bathroom is required"))]
    pub bathrooms: u8,
    #[serde(default)]
    pub furnishing: Furnishing,
    #[serde(default)]
    pub pets: PetsPolicy,
    pub available_from: NaiveDate,
    #[serde(default)]
    pub compliance: Compliance,
    #[validate(
        length(max = 2000, message = "Description is too long"),
        custom(function = "validation::fair_listing_text")
    )]
    #[serde(default)]
    pub description: String,
}

impl PropertyInput {
    /// Field checks plus the deposit cap of five weeks' rent.
    pub fn check(&self) -> AppResult<()> {
        let mut errors = validation::collect(self.validate());

        if let Some(rent) = self.rent_pcm {
            let weekly_times_52 = u64::from(rent) * 12;
            if u64::from(self.deposit) * 52 > weekly_times_52 * 5 {
                errors.add(
                    "deposit",
                    validation::error("cap", "Deposit may not exceed five weeks' rent"),
                );
            }
        }

        validation::finish(errors)
    }
}

/// A rental unit in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,
    pub address: Address,
    pub rent_pcm: u32,
    pub deposit: u32,
    pub bedrooms: u8,
    pub bathrooms: u8,
    pub furnishing: Furnishing,
    pub pets: PetsPolicy,
    pub available_from: NaiveDate,
    pub compliance: Compliance,
    pub description: String,
    pub landlord_id: Option<ProfileId>,
    pub managing_agency_id: Option<ProfileId>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub version: u64,
}

impl Property {
    /// Builds a listing from a checked form.
    pub fn from_input(input: PropertyInput, landlord_id: ProfileId, now: DateTime<Utc>) -> Self {
        let mut property = Self {
            id: PropertyId::new(),
            address: Address::default(),
            rent_pcm: 0,
            deposit: 0,
            bedrooms: 0,
            bathrooms: 0,
            furnishing: Furnishing::default(),
            pets: PetsPolicy::default(),
            available_from: input.available_from,
            compliance: Compliance::default(),
            description: String::new(),
            landlord_id: Some(landlord_id),
            managing_agency_id: None,
            is_available: true,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        property.apply(input, now);
        property
    }

    pub fn apply(&mut self, input: PropertyInput, now: DateTime<Utc>) {
        self.address = input.address;
        self.rent_pcm = input.rent_pcm.unwrap_or_default();
        self.deposit = input.deposit;
        self.bedrooms = input.bedrooms;
        self.bathrooms = input.bathrooms;
        self.furnishing = input.furnishing;
        self.pets = input.pets;
        self.available_from = input.available_from;
        self.compliance = input.compliance;
        self.description = input.description;
        self.updated_at = now;
    }

    pub fn is_owned_by(&self, landlord_id: ProfileId) -> bool {
        self.landlord_id == Some(landlord_id)
    }

    /// Shown in renter decks: available and currently owned.
    pub fn is_listed(&self) -> bool {
        self.is_available && self.landlord_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> PropertyInput {
        PropertyInput {
            address: Address {
                street: "12 Mill Lane".to_string(),
                city: "Leeds".to_string(),
                postcode: "LS1 4AB".to_string(),
                council: Some("Leeds City Council".to_string()),
            },
            rent_pcm: Some(850),
            deposit: 980,
            bedrooms: 2,
            bathrooms: 1,
            available_from: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            description: "Two bed flat close to the station".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_a_complete_listing() {
        assert!(input().check().is_ok());
    }

    #[test]
    fn missing_rent_and_street_are_reported_per_field() {
        let mut form = input();
        form.rent_pcm = None;
        form.address.street = " ".to_string();

        let err = form.check().unwrap_err();
        let errors = err.field_errors().unwrap().errors();
        assert!(errors.contains_key("rentPcm") || errors.contains_key("rent_pcm"));
        assert!(errors.contains_key("address"));
    }

    #[test]
    fn deposit_above_five_weeks_is_rejected() {
        let mut form = input();
        // 850 * 12 / 52 * 5 = 980.7
        form.deposit = 981;
        let err = form.check().unwrap_err();
        assert!(err.field_errors().unwrap().field_errors().contains_key("deposit"));
    }

    #[test]
    fn pet_preferences_override_blanket_policy() {
        let mut pets = PetsPolicy {
            allowed: true,
            max_pets: 1,
            ..Default::default()
        };
        pets.preferences.insert(PetType::Dog, false);
        assert!(pets.accepts(PetType::Cat));
        assert!(!pets.accepts(PetType::Dog));
    }

    #[test]
    fn unlinked_property_is_not_listed() {
        let mut property = Property::from_input(input(), ProfileId::new(), Utc::now());
        assert!(property.is_listed());
        property.landlord_id = None;
        assert!(!property.is_listed());
    }
}
