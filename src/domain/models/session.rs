/// Domain model for one debate session.
///
/// A session tracks a single product idea through up to [`MAX_ROUNDS`] rounds
/// of adversarial debate. The phase field is the per-round state machine
/// position; `current_round` only ever moves forward.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hard ceiling on debate rounds per session.
pub const MAX_ROUNDS: u32 = 5;

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is accepting debate actions.
    Active,
    /// Session finished (round 5 sealed, or ended explicitly).
    Completed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Per-round debate phase. Reset to `Idle`/`Architect` at each round start.
///
/// Within a round the order is total:
/// `Idle → Architect → UserConfirm → Attacking → ConflictCheck →
/// UserResponse → Grounding → RoundComplete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    Idle,
    Architect,
    UserConfirm,
    Attacking,
    ConflictCheck,
    UserResponse,
    Grounding,
    RoundComplete,
}

impl DebatePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Architect => "architect",
            Self::UserConfirm => "user_confirm",
            Self::Attacking => "attacking",
            Self::ConflictCheck => "conflict_check",
            Self::UserResponse => "user_response",
            Self::Grounding => "grounding",
            Self::RoundComplete => "round_complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "architect" => Some(Self::Architect),
            "user_confirm" => Some(Self::UserConfirm),
            "attacking" => Some(Self::Attacking),
            "conflict_check" => Some(Self::ConflictCheck),
            "user_response" => Some(Self::UserResponse),
            "grounding" => Some(Self::Grounding),
            "round_complete" => Some(Self::RoundComplete),
            _ => None,
        }
    }
}

/// One debate session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Short display title, derived from the idea's first line.
    pub title: String,
    /// The product idea under debate, verbatim as submitted.
    pub idea: String,
    pub status: SessionStatus,
    /// 0 before the first round starts, then 1..=MAX_ROUNDS.
    pub current_round: u32,
    pub phase: DebatePhase,
    /// BCP-47-ish locale tag; only affects rendering, not rule matching.
    pub locale: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a fresh session for an idea. The title is the idea's first
    /// non-empty line, truncated to 40 characters.
    pub fn new(idea: impl Into<String>, locale: impl Into<String>) -> Self {
        let idea = idea.into();
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: derive_title(&idea),
            idea,
            status: SessionStatus::Active,
            current_round: 0,
            phase: DebatePhase::Idle,
            locale: locale.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the session can still accept debate actions.
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// True when another round may be started.
    pub fn can_start_round(&self) -> bool {
        self.is_active() && self.current_round < MAX_ROUNDS
    }
}

fn derive_title(idea: &str) -> String {
    let line = idea.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    let title: String = line.chars().take(40).collect();
    if title.is_empty() {
        "未命名会话".to_string()
    } else {
        title
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_defaults() {
        let session = Session::new("做一个AI代码审查工具", "zh");
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.current_round, 0);
        assert_eq!(session.phase, DebatePhase::Idle);
        assert_eq!(session.title, "做一个AI代码审查工具");
        assert!(session.can_start_round());
    }

    #[test]
    fn test_title_truncation_and_first_line() {
        let long = "x".repeat(80);
        let session = Session::new(format!("\n\n{long}\nsecond line"), "en");
        assert_eq!(session.title.chars().count(), 40);
    }

    #[test]
    fn test_empty_idea_gets_placeholder_title() {
        let session = Session::new("   \n ", "zh");
        assert_eq!(session.title, "未命名会话");
    }

    #[test]
    fn test_cannot_start_round_past_max() {
        let mut session = Session::new("idea", "zh");
        session.current_round = MAX_ROUNDS;
        assert!(!session.can_start_round());

        session.current_round = 2;
        session.status = SessionStatus::Completed;
        assert!(!session.can_start_round());
    }

    #[test]
    fn test_phase_round_trips_through_strings() {
        for phase in [
            DebatePhase::Idle,
            DebatePhase::Architect,
            DebatePhase::UserConfirm,
            DebatePhase::Attacking,
            DebatePhase::ConflictCheck,
            DebatePhase::UserResponse,
            DebatePhase::Grounding,
            DebatePhase::RoundComplete,
        ] {
            assert_eq!(DebatePhase::parse(phase.as_str()), Some(phase));
        }
        assert_eq!(DebatePhase::parse("bogus"), None);
    }
}
