use tracing::{debug, info, warn};

use crate::error::{AppResult, AuthError};
use crate::issues::{IssueView, SlaConfig};
use crate::models::{
    Issue, IssueId, IssueStatus, Match, MatchId, Profile, ProfileId, Property, RaiseIssueInput, UserType,
};
use crate::storage::PersistenceAdapter;
use crate::store::{Action, Store};

impl<A: PersistenceAdapter> Store<A> {
    /// Opens a ticket on a match. The deadline comes from the managing
    /// agency's SLA, or the default one.
    pub async fn raise_issue(&self, actor_id: ProfileId, input: RaiseIssueInput) -> AppResult<IssueView> {
        let _ticket = self.begin_submission(format!("raise_issue:{}:{}", actor_id, input.match_id))?;
        let repo = self.repo();
        let actor = self.active_profile(actor_id).await?;
        let mut m: Match = repo.require(input.match_id).await?;

        let allowed = match actor.user_type() {
            UserType::Renter => m.renter_id == actor_id,
            UserType::Agency => self.manages(&m, actor_id).await?,
            UserType::Landlord => false,
        };
        if !allowed {
            return Err(AuthError::Forbidden.into());
        }

        let sla = self.sla_for(&m).await;
        let now = self.now();
        let mut issue = Issue::raise(input, m.property_id, actor_id, actor.user_type(), &sla, now)?;
        repo.save(&mut issue).await?;
        m.issue_ids.push(issue.id);
        m.updated_at = now;
        repo.save(&mut m).await?;
        info!(
            "Issue {} raised on match {} ({:?}, due {})",
            issue.id, m.id, issue.priority, issue.sla_deadline
        );

        self.dispatch_all(vec![Action::IssueSaved(issue.clone()), Action::MatchSaved(m)]);
        Ok(IssueView::for_viewer(issue, actor.user_type(), now))
    }

    /// Moves the ticket along its state machine. Owner or managing agency only.
    pub async fn update_issue_status(
        &self,
        issue_id: IssueId,
        actor_id: ProfileId,
        status: IssueStatus,
        notes: Option<String>,
    ) -> AppResult<IssueView> {
        let (actor, mut issue) = self.issue_for_management(issue_id, actor_id).await?;
        let now = self.now();
        issue.transition(status, actor_id, notes, now)?;
        self.repo().save(&mut issue).await?;
        info!("Issue {} now {:?}", issue_id, status);
        self.dispatch(Action::IssueSaved(issue.clone()));
        Ok(IssueView::for_viewer(issue, actor.user_type(), now))
    }

    pub async fn add_internal_note(&self, issue_id: IssueId, actor_id: ProfileId, body: &str) -> AppResult<IssueView> {
        let (actor, mut issue) = self.issue_for_management(issue_id, actor_id).await?;
        let now = self.now();
        issue.add_internal_note(actor_id, actor.user_type(), body, now)?;
        self.repo().save(&mut issue).await?;
        debug!("Internal note added to issue {}", issue_id);
        self.dispatch(Action::IssueSaved(issue.clone()));
        Ok(IssueView::for_viewer(issue, actor.user_type(), now))
    }

    /// A message every party to the issue can read.
    pub async fn add_issue_message(&self, issue_id: IssueId, actor_id: ProfileId, body: &str) -> AppResult<IssueView> {
        let (actor, mut issue) = self.issue_for_party(issue_id, actor_id).await?;
        let now = self.now();
        issue.add_message(actor_id, actor.user_type(), body, now)?;
        self.repo().save(&mut issue).await?;
        debug!("Message added to issue {}", issue_id);
        self.dispatch(Action::IssueSaved(issue.clone()));
        Ok(IssueView::for_viewer(issue, actor.user_type(), now))
    }

    pub async fn issue_for(&self, issue_id: IssueId, viewer_id: ProfileId) -> AppResult<IssueView> {
        let (viewer, issue) = self.issue_for_party(issue_id, viewer_id).await?;
        Ok(IssueView::for_viewer(issue, viewer.user_type(), self.now()))
    }

    /// Oldest first.
    pub async fn issues_for_match(&self, match_id: MatchId, viewer_id: ProfileId) -> AppResult<Vec<IssueView>> {
        let viewer = self.active_profile(viewer_id).await?;
        let m: Match = self.repo().require(match_id).await?;
        if !self.is_party(&m, &viewer).await? {
            return Err(AuthError::Forbidden.into());
        }

        let mut issues: Vec<Issue> = self
            .repo()
            .list_where(|i: &Issue| i.match_id == match_id)
            .await?;
        issues.sort_by_key(|i| i.raised_at);
        let now = self.now();
        Ok(issues
            .into_iter()
            .map(|issue| IssueView::for_viewer(issue, viewer.user_type(), now))
            .collect())
    }

    async fn issue_for_management(&self, issue_id: IssueId, actor_id: ProfileId) -> AppResult<(Profile, Issue)> {
        let actor = self.active_profile(actor_id).await?;
        if !actor.user_type().is_management() {
            return Err(AuthError::Forbidden.into());
        }
        let issue: Issue = self.repo().require(issue_id).await?;
        let m: Match = self.repo().require(issue.match_id).await?;
        if !self.manages(&m, actor_id).await? {
            return Err(AuthError::Forbidden.into());
        }
        Ok((actor, issue))
    }

    async fn issue_for_party(&self, issue_id: IssueId, actor_id: ProfileId) -> AppResult<(Profile, Issue)> {
        let actor = self.active_profile(actor_id).await?;
        let issue: Issue = self.repo().require(issue_id).await?;
        let m: Match = self.repo().require(issue.match_id).await?;
        if !self.is_party(&m, &actor).await? {
            return Err(AuthError::Forbidden.into());
        }
        Ok((actor, issue))
    }

    async fn is_party(&self, m: &Match, profile: &Profile) -> AppResult<bool> {
        Ok(match profile.user_type() {
            UserType::Renter => m.renter_id == profile.id(),
            UserType::Landlord | UserType::Agency => self.manages(m, profile.id()).await?,
        })
    }

    /// The owning landlord, or the agency managing the property now or at match time.
    async fn manages(&self, m: &Match, actor_id: ProfileId) -> AppResult<bool> {
        if actor_id == m.landlord_id || m.agency_id == Some(actor_id) {
            return Ok(true);
        }
        let property: Option<Property> = self.repo().load(m.property_id).await?;
        Ok(property.is_some_and(|p| p.managing_agency_id == Some(actor_id)))
    }

    async fn sla_for(&self, m: &Match) -> SlaConfig {
        let property: Option<Property> = match self.repo().load(m.property_id).await {
            Ok(found) => found,
            Err(err) => {
                warn!("Falling back to default SLA for match {}: {}", m.id, err);
                None
            }
        };
        let Some(agency_id) = property.and_then(|p| p.managing_agency_id).or(m.agency_id) else {
            return SlaConfig::default();
        };
        match self.repo().load::<Profile>(agency_id).await {
            Ok(Some(Profile::Agency(agency))) => agency.sla_config,
            Ok(_) => SlaConfig::default(),
            Err(err) => {
                warn!("Falling back to default SLA, agency {} unavailable: {}", agency_id, err);
                SlaConfig::default()
            }
        }
    }
}
