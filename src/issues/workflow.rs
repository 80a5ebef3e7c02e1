use chrono::{DateTime, Utc};
use tracing::debug;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::issues::SlaConfig;
use crate::models::{
    InternalNote, Issue, IssueId, IssueMessage, IssueStatus, MessageBody, MessageId, ProfileId,
    PropertyId, RaiseIssueInput, StatusChange, UserType,
};
use crate::validation;

impl IssueStatus {
    /// Resolved or closed: the SLA clock has stopped.
    pub fn is_settled(self) -> bool {
        matches!(self, IssueStatus::Resolved | IssueStatus::Closed)
    }

    pub fn can_transition_to(self, next: IssueStatus) -> bool {
        use IssueStatus::*;
        match (self, next) {
            (Open, Acknowledged)
            | (Acknowledged, InProgress)
            | (InProgress, AwaitingParts)
            | (InProgress, AwaitingAccess)
            | (Resolved, Closed) => true,
            (from, Resolved) => !from.is_settled(),
            _ => false,
        }
    }
}

impl Issue {
    /// Opens a ticket; the deadline is fixed from `sla` right here.
    pub fn raise(
        input: RaiseIssueInput,
        property_id: PropertyId,
        raised_by: ProfileId,
        raised_by_type: UserType,
        sla: &SlaConfig,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        input.validate()?;
        if raised_by_type == UserType::Landlord {
            return Err(AppError::conflict("Issues are raised by renters or agencies"));
        }

        Ok(Self {
            id: IssueId::new(),
            match_id: input.match_id,
            property_id,
            raised_by,
            raised_by_type,
            category: input.category,
            priority: input.priority,
            subject: input.subject.trim().to_string(),
            description: input.description,
            images: input.images,
            status: IssueStatus::Open,
            raised_at: now,
            sla_deadline: sla.deadline_for(input.priority, now),
            status_history: vec![StatusChange {
                status: IssueStatus::Open,
                timestamp: now,
                updated_by: raised_by,
                notes: None,
            }],
            messages: Vec::new(),
            internal_notes: Vec::new(),
            resolved_at: None,
            closed_at: None,
            version: 0,
        })
    }

    /// Moves along the state machine, appending to the history.
    pub fn transition(
        &mut self,
        next: IssueStatus,
        updated_by: ProfileId,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::conflict(format!(
                "Cannot move an issue from {:?} to {:?}",
                self.status, next
            )));
        }
        debug!("Issue {} {:?} -> {:?}", self.id, self.status, next);

        self.status = next;
        match next {
            IssueStatus::Resolved => self.resolved_at = Some(now),
            IssueStatus::Closed => self.closed_at = Some(now),
            _ => {}
        }
        self.status_history.push(StatusChange {
            status: next,
            timestamp: now,
            updated_by,
            notes: notes.filter(|n| !n.trim().is_empty()),
        });
        Ok(())
    }

    pub fn add_internal_note(
        &mut self,
        author_id: ProfileId,
        author_type: UserType,
        body: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if !author_type.is_management() {
            return Err(AppError::Auth(crate::error::AuthError::Forbidden));
        }
        if let Err(err) = validation::not_blank(body) {
            let mut errors = validator::ValidationErrors::new();
            errors.add("body", err);
            return Err(errors.into());
        }
        self.internal_notes.push(InternalNote {
            author_id,
            author_type,
            body: body.trim().to_string(),
            created_at: now,
        });
        Ok(())
    }

    pub fn add_message(
        &mut self,
        sender_id: ProfileId,
        sender_type: UserType,
        body: &str,
        now: DateTime<Utc>,
    ) -> AppResult<MessageId> {
        MessageBody {
            body: body.to_string(),
        }
        .validate()?;
        let id = MessageId::new();
        self.messages.push(IssueMessage {
            id,
            sender_id,
            sender_type,
            body: body.to_string(),
            sent_at: now,
        });
        Ok(id)
    }
}
