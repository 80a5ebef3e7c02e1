use tracing::{debug, info, warn};
use validator::Validate;

use crate::error::{AppError, AppResult, AuthError};
use crate::models::{normalize_email, OnboardingInput, Profile, ProfileId};
use crate::storage::{Credential, PersistenceAdapter, Session, SessionStore};
use crate::store::{Action, Store};
use crate::validation;

#[derive(Validate)]
struct PasswordInput {
    #[validate(length(min = 8, max = 72, message = "Passwords must be 8 to 72 characters"))]
    password: String,
}

impl<A: PersistenceAdapter> Store<A> {
    /// Completes onboarding: stores the profile and its credential, then
    /// signs the new account in.
    pub async fn register(&self, input: OnboardingInput, password: &str) -> AppResult<Profile> {
        input.check()?;
        PasswordInput {
            password: password.to_string(),
        }
        .validate()?;

        let email = normalize_email(input.email());
        let _ticket = self.begin_submission(format!("register:{email}"))?;

        let repo = self.repo();
        if repo.load::<Credential>(&email).await?.is_some() {
            return Err(AppError::conflict("An account already exists for that email"));
        }

        let mut profile = input.into_profile(self.now());
        let mut credential = Credential {
            email: email.clone(),
            profile_id: profile.id(),
            password_hash: bcrypt::hash(password, self.config().bcrypt_cost)?,
            version: 0,
        };
        // Credential first: a racing registration fails here before any profile is written.
        repo.save(&mut credential).await?;
        repo.save(&mut profile).await?;
        info!("Registered {:?} {} <{}>", profile.user_type(), profile.id(), email);

        self.dispatch(Action::ProfileSaved(profile.clone()));
        self.start_session(&profile).await?;
        Ok(profile)
    }

    pub async fn login(&self, email: &str, password: &str) -> AppResult<Profile> {
        let email = normalize_email(email);
        let repo = self.repo();

        let credential: Credential = repo.load(&email).await?.ok_or(AuthError::NotFound)?;
        if !bcrypt::verify(password, &credential.password_hash)? {
            warn!("Failed login for {}", email);
            return Err(AuthError::InvalidCredentials.into());
        }

        let profile: Profile = repo
            .load(credential.profile_id)
            .await?
            .ok_or(AuthError::NotFound)?;
        if !profile.is_active() {
            return Err(AuthError::Deactivated.into());
        }

        info!("Logged in {} as {:?}", profile.id(), profile.user_type());
        self.hydrate().await?;
        self.start_session(&profile).await?;
        Ok(profile)
    }

    pub async fn logout(&self) -> AppResult<()> {
        SessionStore::new(self.repo()).clear().await?;
        info!("Logged out");
        self.dispatch(Action::SessionEnded);
        Ok(())
    }

    /// Picks up a persisted session. `None` means logged out; a session for
    /// a missing or deactivated account is discarded.
    pub async fn restore_session(&self) -> AppResult<Option<Profile>> {
        let sessions = SessionStore::new(self.repo());
        let Some(session) = sessions.load().await? else {
            debug!("No stored session");
            return Ok(None);
        };

        match self.repo().load::<Profile>(session.profile_id).await? {
            Some(profile) if profile.is_active() => {
                info!("Restored session for {}", profile.id());
                self.hydrate().await?;
                self.dispatch(Action::SessionStarted(session));
                Ok(Some(profile))
            }
            _ => {
                warn!("Discarding session for unavailable profile {}", session.profile_id);
                sessions.clear().await?;
                self.dispatch(Action::SessionEnded);
                Ok(None)
            }
        }
    }

    pub async fn current_user(&self) -> AppResult<Profile> {
        let session = self
            .read(|state| state.session.clone())
            .ok_or(AuthError::NotAuthenticated)?;
        if let Some(profile) = self.read(|state| state.profiles.get(&session.profile_id).cloned()) {
            return Ok(profile);
        }
        Ok(self.repo().require(session.profile_id).await?)
    }

    /// Saves edits to an account. The account kind cannot change.
    pub async fn update_profile(&self, mut profile: Profile) -> AppResult<Profile> {
        let stored: Profile = self.repo().require(profile.id()).await?;
        if stored.user_type() != profile.user_type() {
            return Err(AppError::conflict("An account cannot change its type"));
        }
        if let Err(err) = validation::not_blank(&profile.identity().full_name) {
            let mut errors = validator::ValidationErrors::new();
            errors.add("full_name", err);
            return Err(errors.into());
        }
        if let Profile::Agency(agency) = &profile {
            agency.sla_config.validate()?;
        }

        let now = self.now();
        let identity = profile.identity_mut();
        identity.email = normalize_email(&identity.email);
        identity.updated_at = now;
        if identity.email != stored.identity().email {
            return Err(AppError::conflict("Email changes are not supported"));
        }

        self.repo().save(&mut profile).await?;
        debug!("Updated profile {}", profile.id());
        self.dispatch(Action::ProfileSaved(profile.clone()));
        Ok(profile)
    }

    /// Profiles are never deleted; a deactivated one can no longer log in.
    pub async fn deactivate_profile(&self, id: ProfileId) -> AppResult<()> {
        let mut profile: Profile = self.repo().require(id).await?;
        if !profile.is_active() {
            return Ok(());
        }
        let identity = profile.identity_mut();
        identity.is_active = false;
        identity.updated_at = self.now();
        self.repo().save(&mut profile).await?;
        info!("Deactivated profile {}", id);
        self.dispatch(Action::ProfileSaved(profile));

        let signed_in = self.read(|state| state.session.as_ref().map(|s| s.profile_id));
        if signed_in == Some(id) {
            self.logout().await?;
        }
        Ok(())
    }

    async fn start_session(&self, profile: &Profile) -> AppResult<()> {
        let session = Session {
            profile_id: profile.id(),
            user_type: profile.user_type(),
            started_at: self.now(),
            version: 0,
        };
        let session = SessionStore::new(self.repo()).save(&session).await?;
        self.dispatch(Action::SessionStarted(session));
        Ok(())
    }
}
