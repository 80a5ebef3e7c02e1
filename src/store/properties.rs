use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, AuthError};
use crate::models::{
    Issue, Match, Profile, ProfileId, Property, PropertyId, PropertyInput, TenancyStatus, UserType,
};
use crate::storage::PersistenceAdapter;
use crate::store::{Action, Store};

/// A deletion waiting for explicit confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "nothing is deleted until `confirm` is called"]
pub struct PendingDeletion {
    pub property_id: PropertyId,
    pub landlord_id: ProfileId,
    /// Shown when asking for confirmation.
    pub summary: String,
}

impl PendingDeletion {
    /// Deletes the property, its matches and their issues.
    pub async fn confirm<A: PersistenceAdapter>(self, store: &Store<A>) -> AppResult<()> {
        store.delete_property(self.property_id, self.landlord_id).await
    }
}

/// A full data reset waiting for explicit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "nothing is cleared until `confirm` is called"]
pub struct PendingReset;

impl PendingReset {
    pub async fn confirm<A: PersistenceAdapter>(self, store: &Store<A>) -> AppResult<()> {
        store.adapter().clear().await?;
        warn!("All data cleared from {}", store.adapter().backend_name());
        store.dispatch(Action::Reset);
        Ok(())
    }
}

impl<A: PersistenceAdapter> Store<A> {
    /// Lists a new property and links it to `landlord_id`.
    pub async fn create_property(&self, input: PropertyInput, landlord_id: ProfileId) -> AppResult<PropertyId> {
        input.check()?;
        let _ticket = self.begin_submission(format!("create_property:{landlord_id}"))?;
        let mut landlord = self.profile_as(landlord_id, UserType::Landlord).await?;

        let now = self.now();
        let mut property = Property::from_input(input, landlord_id, now);
        let repo = self.repo();
        repo.save(&mut property).await?;
        let property_id = property.id;
        info!("Created property {} for {}", property_id, landlord_id);
        self.dispatch(Action::PropertySaved(property));

        // Second write; a failure here leaves the property listed but absent from the profile.
        if let Some(l) = landlord.as_landlord_mut() {
            l.property_ids.push(property_id);
        }
        landlord.identity_mut().updated_at = now;
        repo.save(&mut landlord).await?;
        self.dispatch(Action::ProfileSaved(landlord));
        Ok(property_id)
    }

    /// Owner-only edit of the listing fields.
    pub async fn update_property(
        &self,
        property_id: PropertyId,
        landlord_id: ProfileId,
        input: PropertyInput,
    ) -> AppResult<Property> {
        input.check()?;
        let mut property = self.owned_property(property_id, landlord_id).await?;
        property.apply(input, self.now());
        self.repo().save(&mut property).await?;
        debug!("Updated property {}", property_id);
        self.dispatch(Action::PropertySaved(property.clone()));
        Ok(property)
    }

    /// Idempotent for the current owner; another owner is a conflict.
    pub async fn link_property_to_landlord(&self, property_id: PropertyId, landlord_id: ProfileId) -> AppResult<()> {
        let repo = self.repo();
        let mut property: Property = repo.require(property_id).await?;
        let mut landlord = self.profile_as(landlord_id, UserType::Landlord).await?;
        let now = self.now();

        match property.landlord_id {
            Some(owner) if owner == landlord_id => {}
            Some(owner) => {
                debug!("Property {} already owned by {}", property_id, owner);
                return Err(AppError::conflict(format!(
                    "AlreadyLinked: property {property_id} belongs to another landlord"
                )));
            }
            None => {
                property.landlord_id = Some(landlord_id);
                property.updated_at = now;
                repo.save(&mut property).await?;
                info!("Linked property {} to {}", property_id, landlord_id);
                self.dispatch(Action::PropertySaved(property));
            }
        }

        if let Some(l) = landlord.as_landlord_mut() {
            if !l.property_ids.contains(&property_id) {
                l.property_ids.push(property_id);
                l.identity.updated_at = now;
                repo.save(&mut landlord).await?;
                self.dispatch(Action::ProfileSaved(landlord));
            }
        }
        Ok(())
    }

    /// Leaves the property ownerless (and out of every deck). Any managing
    /// agency is released with it.
    pub async fn unlink_property(&self, property_id: PropertyId, landlord_id: ProfileId) -> AppResult<()> {
        let repo = self.repo();
        let mut property: Property = repo.require(property_id).await?;
        if !property.is_owned_by(landlord_id) {
            return Err(AppError::conflict(format!(
                "Property {property_id} is not linked to this landlord"
            )));
        }
        let now = self.now();
        let released_agency = property.managing_agency_id.take();
        property.landlord_id = None;
        property.updated_at = now;
        repo.save(&mut property).await?;
        info!("Unlinked property {} from {}", property_id, landlord_id);

        let mut actions = vec![Action::PropertySaved(property)];
        if let Some(mut landlord) = repo.load::<Profile>(landlord_id).await? {
            if let Some(l) = landlord.as_landlord_mut() {
                l.property_ids.retain(|id| *id != property_id);
                l.identity.updated_at = now;
            }
            repo.save(&mut landlord).await?;
            actions.push(Action::ProfileSaved(landlord));
        }
        if let Some(agency_id) = released_agency {
            if let Some(agency) = self.drop_managed_property(agency_id, property_id).await? {
                actions.push(Action::ProfileSaved(agency));
            }
        }
        self.dispatch_all(actions);
        Ok(())
    }

    /// Puts `agency_id` in charge of the property. At most one agency at a time.
    pub async fn assign_managing_agency(
        &self,
        property_id: PropertyId,
        landlord_id: ProfileId,
        agency_id: ProfileId,
    ) -> AppResult<()> {
        let mut property = self.owned_property(property_id, landlord_id).await?;
        let mut agency = self.profile_as(agency_id, UserType::Agency).await?;

        match property.managing_agency_id {
            Some(current) if current == agency_id => return Ok(()),
            Some(_) => {
                return Err(AppError::conflict(
                    "Property is already managed by another agency; release it first",
                ))
            }
            None => {}
        }

        let now = self.now();
        property.managing_agency_id = Some(agency_id);
        property.updated_at = now;
        let repo = self.repo();
        repo.save(&mut property).await?;

        if let Some(a) = agency.as_agency_mut() {
            if !a.managed_property_ids.contains(&property_id) {
                a.managed_property_ids.push(property_id);
            }
            if !a.landlord_client_ids.contains(&landlord_id) {
                a.landlord_client_ids.push(landlord_id);
            }
            a.identity.updated_at = now;
        }
        repo.save(&mut agency).await?;
        info!("Agency {} now manages property {}", agency_id, property_id);
        self.dispatch_all(vec![Action::PropertySaved(property), Action::ProfileSaved(agency)]);
        Ok(())
    }

    pub async fn release_managing_agency(&self, property_id: PropertyId, landlord_id: ProfileId) -> AppResult<()> {
        let mut property = self.owned_property(property_id, landlord_id).await?;
        let Some(agency_id) = property.managing_agency_id.take() else {
            return Ok(());
        };
        property.updated_at = self.now();
        self.repo().save(&mut property).await?;
        info!("Agency {} released from property {}", agency_id, property_id);

        let mut actions = vec![Action::PropertySaved(property)];
        if let Some(agency) = self.drop_managed_property(agency_id, property_id).await? {
            actions.push(Action::ProfileSaved(agency));
        }
        self.dispatch_all(actions);
        Ok(())
    }

    /// First step of a deletion; only the owner may ask.
    pub async fn request_property_deletion(
        &self,
        property_id: PropertyId,
        landlord_id: ProfileId,
    ) -> AppResult<PendingDeletion> {
        let property = self.owned_property(property_id, landlord_id).await?;
        Ok(PendingDeletion {
            property_id,
            landlord_id,
            summary: format!(
                "{}, {} {}",
                property.address.street, property.address.city, property.address.postcode
            ),
        })
    }

    /// First step of clearing every collection.
    pub fn request_reset(&self) -> PendingReset {
        PendingReset
    }

    /// Reloads the catalog. Returns `false` when a newer refresh started
    /// meanwhile and this result was discarded.
    pub async fn refresh_catalog(&self) -> AppResult<bool> {
        let generation = self.catalog_generations.begin();
        let properties: Vec<Property> = self.repo().list().await?;
        if !self.catalog_generations.is_current(generation) {
            debug!("Discarding stale catalog refresh #{}", generation);
            return Ok(false);
        }
        info!("Catalog refreshed with {} properties", properties.len());
        self.dispatch(Action::CatalogLoaded(properties));
        Ok(true)
    }

    pub(crate) async fn delete_property(&self, property_id: PropertyId, landlord_id: ProfileId) -> AppResult<()> {
        let property = self.owned_property(property_id, landlord_id).await?;
        let repo = self.repo();

        let matches: Vec<Match> = repo.list_where(|m: &Match| m.property_id == property_id).await?;
        if matches.iter().any(|m| m.tenancy_status == TenancyStatus::Active) {
            return Err(AppError::conflict("End the tenancy before deleting this property"));
        }
        let issues: Vec<Issue> = repo.list_where(|i: &Issue| i.property_id == property_id).await?;
        for issue in &issues {
            repo.remove::<Issue>(issue.id).await?;
        }
        for m in &matches {
            repo.remove::<Match>(m.id).await?;
        }
        repo.remove::<Property>(property_id).await?;
        info!(
            "Deleted property {} with {} matches and {} issues",
            property_id,
            matches.len(),
            issues.len()
        );

        let mut actions = Vec::new();
        if let Some(mut landlord) = repo.load::<Profile>(landlord_id).await? {
            if let Some(l) = landlord.as_landlord_mut() {
                l.property_ids.retain(|id| *id != property_id);
            }
            repo.save(&mut landlord).await?;
            actions.push(Action::ProfileSaved(landlord));
        }
        if let Some(agency_id) = property.managing_agency_id {
            if let Some(agency) = self.drop_managed_property(agency_id, property_id).await? {
                actions.push(Action::ProfileSaved(agency));
            }
        }
        actions.push(Action::PropertyRemoved(property_id));
        self.dispatch_all(actions);
        Ok(())
    }

    async fn owned_property(&self, property_id: PropertyId, landlord_id: ProfileId) -> AppResult<Property> {
        let property: Property = self.repo().require(property_id).await?;
        if !property.is_owned_by(landlord_id) {
            debug!("{} does not own property {}", landlord_id, property_id);
            return Err(AuthError::Forbidden.into());
        }
        Ok(property)
    }

    async fn drop_managed_property(&self, agency_id: ProfileId, property_id: PropertyId) -> AppResult<Option<Profile>> {
        let repo = self.repo();
        let Some(mut agency) = repo.load::<Profile>(agency_id).await? else {
            warn!("Managing agency {} no longer exists", agency_id);
            return Ok(None);
        };
        if let Some(a) = agency.as_agency_mut() {
            a.managed_property_ids.retain(|id| *id != property_id);
        }
        repo.save(&mut agency).await?;
        Ok(Some(agency))
    }
}
