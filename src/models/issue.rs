use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{IssueId, MatchId, MessageId, ProfileId, PropertyId, UserType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Maintenance,
    Repair,
    Safety,
    Pest,
    Noise,
    Neighbour,
    Deposit,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuePriority {
    Emergency,
    Urgent,
    Routine,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Acknowledged,
    InProgress,
    AwaitingParts,
    AwaitingAccess,
    Resolved,
    Closed,
}

/// One entry of the append-only status log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: IssueStatus,
    pub timestamp: DateTime<Utc>,
    pub updated_by: ProfileId,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueMessage {
    pub id: MessageId,
    pub sender_id: ProfileId,
    pub sender_type: UserType,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

/// Landlord/agency-only note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalNote {
    pub author_id: ProfileId,
    pub author_type: UserType,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RaiseIssueInput {
    pub match_id: MatchId,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    #[validate(length(min = 3, max = 120, message = "Subject must be 3 to 120 characters"))]
    pub subject: String,
    #[validate(length(min = 10, max = 2000, message = "Description must be 10 to 2000 characters"))]
    pub description: String,
    #[validate(length(max = 10, message = "Attach at most ten images"))]
    #[serde(default)]
    pub images: Vec<String>,
}

/// Maintenance or complaint ticket on a tenancy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: IssueId,
    pub match_id: MatchId,
    pub property_id: PropertyId,
    pub raised_by: ProfileId,
    pub raised_by_type: UserType,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    pub subject: String,
    pub description: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub status: IssueStatus,
    pub raised_at: DateTime<Utc>,
    /// Fixed when raised; later SLA changes never move it.
    pub sla_deadline: DateTime<Utc>,
    pub status_history: Vec<StatusChange>,
    #[serde(default)]
    pub messages: Vec<IssueMessage>,
    #[serde(default)]
    pub internal_notes: Vec<InternalNote>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub version: u64,
}
