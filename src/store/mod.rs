//! The domain state store: every mutation persists through the adapter,
//! folds an [`Action`] into [`AppState`] and notifies subscribers.

mod auth;
#[cfg(test)]
mod fixtures;
mod guard;
mod issues;
mod matches;
mod messages;
mod properties;
mod ratings;
mod state;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{AppResult, AuthError};
use crate::issues::is_overdue;
use crate::models::{
    Conversation, Issue, Match, Profile, ProfileId, Property, Rating, TenancyStatus, UserType,
};
use crate::storage::{PersistenceAdapter, Repository};

pub use guard::{Generations, SubmissionGuard, Ticket};
pub use matches::MatchOverview;
pub use properties::{PendingDeletion, PendingReset};
pub use state::{reduce, Action, AppState};

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&AppState) + Send + Sync>;

/// Derived counts over the current state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub properties: usize,
    pub available_properties: usize,
    pub prospective_matches: usize,
    pub active_tenancies: usize,
    pub ended_tenancies: usize,
    pub open_issues: usize,
    pub overdue_issues: usize,
}

pub struct Store<A> {
    adapter: A,
    config: Config,
    clock: Arc<dyn Clock>,
    state: Mutex<AppState>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
    submissions: SubmissionGuard,
    catalog_generations: Generations,
    // Serializes conversation read-modify-write cycles in this process.
    conversation_lock: tokio::sync::Mutex<()>,
}

impl<A: PersistenceAdapter> Store<A> {
    pub fn new(adapter: A, config: Config) -> Self {
        Self::with_clock(adapter, config, Arc::new(SystemClock))
    }

    pub fn with_clock(adapter: A, config: Config, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Store ready on {} backend ({:?} matching)",
            adapter.backend_name(),
            config.match_policy
        );
        Self {
            adapter,
            config,
            clock,
            state: Mutex::new(AppState::default()),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            submissions: SubmissionGuard::new(),
            catalog_generations: Generations::new(),
            conversation_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub(crate) fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn repo(&self) -> Repository<'_> {
        Repository::new(&self.adapter)
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> AppState {
        self.read(AppState::clone)
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    /// Registers `callback` to run after every dispatched action.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&AppState) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub(crate) fn dispatch(&self, action: Action) {
        self.dispatch_all(vec![action]);
    }

    /// Applies `actions` in order, then notifies once.
    pub(crate) fn dispatch_all(&self, actions: Vec<Action>) {
        if actions.is_empty() {
            return;
        }
        let snapshot = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            for action in actions {
                debug!("Applying {}", action.name());
                let current = std::mem::take(&mut *state);
                *state = reduce(current, action);
            }
            state.clone()
        };

        // Callbacks run outside the lock so they may read the store.
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in subscribers {
            callback(&snapshot);
        }
    }

    pub(crate) fn begin_submission(&self, key: impl Into<String>) -> AppResult<Ticket<'_>> {
        self.submissions.begin(key)
    }

    /// Whether a submission with `key` is outstanding.
    pub fn is_submitting(&self, key: &str) -> bool {
        self.submissions.is_busy(key)
    }

    pub fn stats(&self) -> StoreStats {
        let now = self.now();
        self.read(|state| {
            let mut stats = StoreStats {
                properties: state.properties.len(),
                available_properties: state.properties.iter().filter(|p| p.is_listed()).count(),
                ..StoreStats::default()
            };
            for m in state.matches.values() {
                match m.tenancy_status {
                    TenancyStatus::Prospective => stats.prospective_matches += 1,
                    TenancyStatus::Active => stats.active_tenancies += 1,
                    TenancyStatus::Ended => stats.ended_tenancies += 1,
                }
            }
            for issue in state.issues.values() {
                if !issue.status.is_settled() {
                    stats.open_issues += 1;
                }
                if is_overdue(now, issue) {
                    stats.overdue_issues += 1;
                }
            }
            stats
        })
    }

    /// Loads every collection from the adapter into state. Called when a
    /// session starts, so a fresh process sees what earlier ones persisted.
    pub async fn hydrate(&self) -> AppResult<()> {
        let generation = self.catalog_generations.begin();
        let repo = self.repo();
        let properties: Vec<Property> = repo.list().await?;
        let profiles: Vec<Profile> = repo.list().await?;
        let matches: Vec<Match> = repo.list().await?;
        let issues: Vec<Issue> = repo.list().await?;
        let conversations: Vec<Conversation> = repo.list().await?;
        let ratings: Vec<Rating> = repo.list().await?;
        info!(
            "Hydrated {} properties, {} profiles, {} matches",
            properties.len(),
            profiles.len(),
            matches.len()
        );

        let mut actions = Vec::new();
        if self.catalog_generations.is_current(generation) {
            actions.push(Action::CatalogLoaded(properties));
        } else {
            debug!("Keeping the catalog from a newer refresh");
        }
        actions.extend(profiles.into_iter().map(Action::ProfileSaved));
        actions.extend(matches.into_iter().map(Action::MatchSaved));
        actions.extend(issues.into_iter().map(Action::IssueSaved));
        actions.extend(conversations.into_iter().map(Action::ConversationSaved));
        actions.extend(ratings.into_iter().map(Action::RatingSaved));
        self.dispatch_all(actions);
        Ok(())
    }

    /// Loads `id` and checks it is an active account.
    pub(crate) async fn active_profile(&self, id: ProfileId) -> AppResult<Profile> {
        let profile: Profile = self.repo().require(id).await?;
        if !profile.is_active() {
            return Err(AuthError::Deactivated.into());
        }
        Ok(profile)
    }

    /// Like `active_profile`, but also checks the role.
    pub(crate) async fn profile_as(&self, id: ProfileId, role: UserType) -> AppResult<Profile> {
        let profile = self.active_profile(id).await?;
        if profile.user_type() != role {
            debug!("{} is a {:?}, not a {:?}", id, profile.user_type(), role);
            return Err(AuthError::Forbidden.into());
        }
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryAdapter;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn subscribers_hear_each_dispatch_until_unsubscribed() {
        let store = Store::new(MemoryAdapter::new(), Config::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.dispatch(Action::SessionEnded);
        store.dispatch_all(vec![Action::SessionEnded, Action::Reset]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.dispatch(Action::Reset);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn hydrate_loads_records_written_elsewhere() {
        let store = fixtures::store();
        let mut property = Property::from_input(
            fixtures::property_input("4 Hyde Park Rd"),
            ProfileId::new(),
            store.now(),
        );
        store.repo().save(&mut property).await.unwrap();
        assert!(store.snapshot().properties.is_empty());

        store.hydrate().await.unwrap();
        let state = store.snapshot();
        assert_eq!(state.properties.len(), 1);
        assert_eq!(state.property(property.id).map(|p| p.version), Some(1));
        assert_eq!(store.stats().available_properties, 1);
    }

    #[test]
    fn empty_store_has_zero_stats() {
        let store = Store::new(MemoryAdapter::new(), Config::default());
        assert_eq!(store.stats(), StoreStats::default());
    }
}
