/// Inbound action boundary: one caller-submitted step for a session.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conflict::ConflictChoice;

/// What the caller wants the engine to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    StartRound,
    UserConfirm,
    ConflictChoice,
    UserResponse,
    NextRound,
    EndSession,
}

/// One action against one session. Processed to completion before the next
/// action for the same session is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub session_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// User text for `user_confirm` / `user_response` / `conflict_choice`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Resolution kind for `conflict_choice`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<ConflictChoice>,
}

impl Action {
    pub fn new(session_id: Uuid, kind: ActionKind) -> Self {
        Self { session_id, kind, content: None, choice: None }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_choice(mut self, choice: ConflictChoice) -> Self {
        self.choice = Some(choice);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_serializes_with_type_tag() {
        let action = Action::new(Uuid::nil(), ActionKind::UserConfirm).with_content("ok");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "user_confirm");
        assert_eq!(json["content"], "ok");
        assert!(json.get("choice").is_none());
    }
}
