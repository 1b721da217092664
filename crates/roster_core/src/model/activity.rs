//! Action-level activity log entries.

use crate::context::{Actor, EpochMillis};
use crate::model::student::StudentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle transition recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Restore,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Restore => "RESTORE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            "RESTORE" => Some(Self::Restore),
            _ => None,
        }
    }
}

/// One append-only activity log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub log_id: Uuid,
    pub action: ActivityAction,
    pub student_id: StudentId,
    pub actor: String,
    /// Unix epoch milliseconds.
    pub timestamp: EpochMillis,
}

impl ActivityLog {
    pub fn new(
        action: ActivityAction,
        student_id: StudentId,
        actor: &Actor,
        timestamp: EpochMillis,
    ) -> Self {
        Self {
            log_id: Uuid::new_v4(),
            action,
            student_id,
            actor: actor.as_str().to_string(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ActivityAction;

    #[test]
    fn action_tags_parse_back() {
        for action in [
            ActivityAction::Create,
            ActivityAction::Update,
            ActivityAction::Delete,
            ActivityAction::Restore,
        ] {
            assert_eq!(ActivityAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(ActivityAction::parse("create"), None);
    }
}
