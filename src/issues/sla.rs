use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::models::{Issue, IssuePriority, IssueStatus};
use crate::validation;

/// Agency-configurable response times per priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlaConfig {
    pub emergency_response_hours: u32,
    pub urgent_response_hours: u32,
    pub routine_response_hours: u32,
    pub maintenance_response_days: u32,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            emergency_response_hours: 4,
            urgent_response_hours: 24,
            routine_response_hours: 72,
            maintenance_response_days: 14,
        }
    }
}

impl Validate for SlaConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !(1..=24).contains(&self.emergency_response_hours) {
            errors.add(
                "emergency_response_hours",
                validation::error("range", "Emergency response must be within 24 hours"),
            );
        }
        if self.urgent_response_hours > 72 || self.urgent_response_hours <= self.emergency_response_hours {
            errors.add(
                "urgent_response_hours",
                validation::error(
                    "range",
                    "Urgent response must be within 72 hours and slower than emergency",
                ),
            );
        }
        if self.routine_response_hours > 168 || self.routine_response_hours <= self.urgent_response_hours {
            errors.add(
                "routine_response_hours",
                validation::error(
                    "range",
                    "Routine response must be within 168 hours and slower than urgent",
                ),
            );
        }
        if !(1..=30).contains(&self.maintenance_response_days) {
            errors.add(
                "maintenance_response_days",
                validation::error("range", "Maintenance response must be within 30 days"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl SlaConfig {
    pub fn response_time_for(&self, priority: IssuePriority) -> Duration {
        match priority {
            IssuePriority::Emergency => Duration::hours(i64::from(self.emergency_response_hours)),
            IssuePriority::Urgent => Duration::hours(i64::from(self.urgent_response_hours)),
            IssuePriority::Routine => Duration::hours(i64::from(self.routine_response_hours)),
            IssuePriority::Low => Duration::days(i64::from(self.maintenance_response_days)),
        }
    }

    pub fn deadline_for(&self, priority: IssuePriority, raised_at: DateTime<Utc>) -> DateTime<Utc> {
        raised_at + self.response_time_for(priority)
    }
}

/// Past its deadline and still unresolved, as of `now`.
pub fn is_overdue(now: DateTime<Utc>, issue: &Issue) -> bool {
    now > issue.sla_deadline && !matches!(issue.status, IssueStatus::Resolved | IssueStatus::Closed)
}

/// Time left before the deadline; negative once overdue.
pub fn time_remaining(now: DateTime<Utc>, issue: &Issue) -> Duration {
    issue.sla_deadline - now
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SlaConfig::default().validate().is_ok());
    }

    #[test]
    fn urgent_must_be_slower_than_emergency() {
        let config = SlaConfig {
            emergency_response_hours: 12,
            urgent_response_hours: 12,
            ..SlaConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("urgent_response_hours"));
    }

    #[test]
    fn bounds_are_enforced() {
        let config = SlaConfig {
            emergency_response_hours: 25,
            urgent_response_hours: 73,
            routine_response_hours: 169,
            maintenance_response_days: 31,
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 4);
    }

    #[test]
    fn low_priority_uses_maintenance_days() {
        let config = SlaConfig::default();
        assert_eq!(config.response_time_for(IssuePriority::Low), Duration::days(14));
        assert_eq!(config.response_time_for(IssuePriority::Emergency), Duration::hours(4));
    }
}
