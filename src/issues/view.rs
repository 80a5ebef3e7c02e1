use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::issues::sla;
use crate::models::{
    InternalNote, Issue, IssueCategory, IssueId, IssueMessage, IssuePriority, IssueStatus, MatchId,
    ProfileId, PropertyId, StatusChange, UserType,
};

/// An issue as shown to one role. Renter views never carry internal notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    pub id: IssueId,
    pub match_id: MatchId,
    pub property_id: PropertyId,
    pub raised_by: ProfileId,
    pub category: IssueCategory,
    pub priority: IssuePriority,
    pub subject: String,
    pub description: String,
    pub images: Vec<String>,
    pub status: IssueStatus,
    pub raised_at: DateTime<Utc>,
    pub sla_deadline: DateTime<Utc>,
    pub is_overdue: bool,
    pub status_history: Vec<StatusChange>,
    pub messages: Vec<IssueMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_notes: Option<Vec<InternalNote>>,
}

impl IssueView {
    pub fn for_viewer(issue: Issue, viewer: UserType, now: DateTime<Utc>) -> Self {
        let is_overdue = sla::is_overdue(now, &issue);
        let Issue {
            id,
            match_id,
            property_id,
            raised_by,
            category,
            priority,
            subject,
            description,
            images,
            status,
            raised_at,
            sla_deadline,
            status_history,
            messages,
            internal_notes,
            ..
        } = issue;

        let internal_notes = match viewer {
            UserType::Renter => None,
            UserType::Landlord | UserType::Agency => Some(internal_notes),
        };

        Self {
            id,
            match_id,
            property_id,
            raised_by,
            category,
            priority,
            subject,
            description,
            images,
            status,
            raised_at,
            sla_deadline,
            is_overdue,
            status_history,
            messages,
            internal_notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issues::SlaConfig;
    use crate::models::RaiseIssueInput;
    use chrono::Duration;

    fn issue_with_note(now: DateTime<Utc>) -> Issue {
        let mut issue = Issue::raise(
            RaiseIssueInput {
                match_id: MatchId::new(),
                category: IssueCategory::Safety,
                priority: IssuePriority::Emergency,
                subject: "Gas smell".to_string(),
                description: "Strong smell of gas in the kitchen.".to_string(),
                images: vec![],
            },
            PropertyId::new(),
            ProfileId::new(),
            UserType::Renter,
            &SlaConfig::default(),
            now,
        )
        .unwrap();
        issue
            .add_internal_note(ProfileId::new(), UserType::Landlord, "Check tenant history", now)
            .unwrap();
        issue
    }

    #[test]
    fn renter_view_strips_internal_notes_in_json_too() {
        let now = Utc::now();
        let view = IssueView::for_viewer(issue_with_note(now), UserType::Renter, now);
        assert!(view.internal_notes.is_none());

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("Check tenant history"));
        assert!(!json.contains("internalNotes"));
    }

    #[test]
    fn management_view_keeps_notes() {
        let now = Utc::now();
        let view = IssueView::for_viewer(issue_with_note(now), UserType::Agency, now);
        assert_eq!(view.internal_notes.map(|n| n.len()), Some(1));
    }

    #[test]
    fn overdue_is_derived_from_now() {
        let now = Utc::now();
        let issue = issue_with_note(now);
        assert!(!IssueView::for_viewer(issue.clone(), UserType::Renter, now).is_overdue);
        let later = now + Duration::hours(5);
        assert!(IssueView::for_viewer(issue, UserType::Renter, later).is_overdue);
    }
}
