/// Append-only debate utterances.
///
/// Messages are never mutated after creation; their insertion order within a
/// round is significant because later phases concatenate earlier messages as
/// persona context.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Architect,
    Assassin,
    UserGhost,
    Grounder,
    User,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architect => "architect",
            Self::Assassin => "assassin",
            Self::UserGhost => "user_ghost",
            Self::Grounder => "grounder",
            Self::User => "user",
            Self::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "architect" => Some(Self::Architect),
            "assassin" => Some(Self::Assassin),
            "user_ghost" => Some(Self::UserGhost),
            "grounder" => Some(Self::Grounder),
            "user" => Some(Self::User),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    /// Label used when rendering round history for persona context.
    pub fn history_label(self) -> &'static str {
        match self {
            Self::Architect => "架构师",
            Self::Assassin => "刺客",
            Self::UserGhost => "用户鬼",
            Self::Grounder => "落地者",
            Self::User => "用户",
            Self::System => "系统",
        }
    }
}

/// One persona or user utterance within a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned insertion id (0 before persistence).
    pub id: i64,
    pub session_id: Uuid,
    pub round: u32,
    pub role: Role,
    pub content: String,
    /// Role-specific tags, serialized JSON (e.g. user-input subtype,
    /// `{"forced":true}` on a regenerated assassin message).
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(session_id: Uuid, round: u32, role: Role, content: impl Into<String>) -> Self {
        Self {
            id: 0,
            session_id,
            round,
            role,
            content: content.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_string_round_trip() {
        for role in [
            Role::Architect,
            Role::Assassin,
            Role::UserGhost,
            Role::Grounder,
            Role::User,
            Role::System,
        ] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("narrator"), None);
    }

    #[test]
    fn test_message_metadata_builder() {
        let msg = Message::new(Uuid::new_v4(), 1, Role::Assassin, "attack")
            .with_metadata(r#"{"forced":true}"#);
        assert_eq!(msg.metadata.as_deref(), Some(r#"{"forced":true}"#));
        assert_eq!(msg.role, Role::Assassin);
    }
}
