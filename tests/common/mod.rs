#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use rental_match::models::{
    Address, IdentityInput, LandlordOnboarding, OnboardingInput, PropertyInput, RenterOnboarding,
    RenterSituation,
};
use rental_match::storage::{Collection, MemoryAdapter, PersistenceAdapter, StoredRecord};
use rental_match::{Config, StorageError};
use serde_json::Value;
use tokio::sync::Notify;

pub const PASSWORD: &str = "correct horse battery";

pub fn config() -> Config {
    Config {
        bcrypt_cost: 4,
        ..Config::default()
    }
}

pub fn renter_form(email: &str, name: &str) -> OnboardingInput {
    OnboardingInput::Renter(RenterOnboarding {
        identity: IdentityInput {
            email: email.to_string(),
            full_name: name.to_string(),
            phone: Some("07700 900123".to_string()),
        },
        monthly_income: Some(3000),
        ages: "28".to_string(),
        situation: RenterSituation::Couple,
        preferred_move_in: NaiveDate::from_ymd_opt(2026, 12, 1),
        has_pets: true,
    })
}

pub fn landlord_form(email: &str, name: &str) -> OnboardingInput {
    OnboardingInput::Landlord(LandlordOnboarding {
        identity: IdentityInput {
            email: email.to_string(),
            full_name: name.to_string(),
            phone: None,
        },
        registration_number: Some("PRS-7781".to_string()),
        ombudsman_scheme: None,
        certifications: Default::default(),
    })
}

pub fn listing(street: &str) -> PropertyInput {
    PropertyInput {
        address: Address {
            street: street.to_string(),
            city: "Manchester".to_string(),
            postcode: "M14 5RZ".to_string(),
            council: None,
        },
        rent_pcm: Some(850),
        deposit: 900,
        bedrooms: 1,
        bathrooms: 1,
        available_from: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        description: "One-bed flat above the high street.".to_string(),
        ..Default::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    List(Collection),
    Put(Collection),
}

/// Holds the first matching call until `release` is notified.
#[derive(Default)]
pub struct GatedAdapter {
    inner: MemoryAdapter,
    armed: Mutex<Option<Gate>>,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self, gate: Gate) {
        *self.armed.lock().unwrap() = Some(gate);
    }

    async fn pass(&self, gate: Gate) {
        let hit = {
            let mut armed = self.armed.lock().unwrap();
            if *armed == Some(gate) {
                *armed = None;
                true
            } else {
                false
            }
        };
        if hit {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

#[async_trait]
impl PersistenceAdapter for GatedAdapter {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError> {
        // Read first, so a held call returns what was there before the hold.
        let records = self.inner.list(collection).await?;
        self.pass(Gate::List(collection)).await;
        Ok(records)
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        self.pass(Gate::Put(collection)).await;
        self.inner.put(collection, id, body, expected_version).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
        self.inner.delete(collection, id).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear().await
    }

    fn backend_name(&self) -> &'static str {
        "gated-memory"
    }
}

/// Fails `get` for chosen record ids.
#[derive(Default)]
pub struct FlakyAdapter {
    inner: MemoryAdapter,
    failing: Mutex<HashSet<String>>,
}

impl FlakyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads_of(&self, id: impl ToString) {
        self.failing.lock().unwrap().insert(id.to_string());
    }
}

#[async_trait]
impl PersistenceAdapter for FlakyAdapter {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<StoredRecord>, StorageError> {
        if self.failing.lock().unwrap().contains(id) {
            return Err(StorageError::Unavailable(format!("{collection}/{id} timed out")));
        }
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<StoredRecord>, StorageError> {
        self.inner.list(collection).await
    }

    async fn put(
        &self,
        collection: Collection,
        id: &str,
        body: Value,
        expected_version: Option<u64>,
    ) -> Result<u64, StorageError> {
        self.inner.put(collection, id, body, expected_version).await
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
        self.inner.delete(collection, id).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear().await
    }

    fn backend_name(&self) -> &'static str {
        "flaky-memory"
    }
}
