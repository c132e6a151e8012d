/// Conflict events: detected rule triggers awaiting user acknowledgment.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The rule that produced a conflict event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictRule {
    /// Rule 1: assassin or user-ghost reframed the problem.
    AlternativeHypothesis,
    /// Rule 2: challenger roles are agreeing instead of attacking.
    ConsensusAlert,
    /// Rule 3: user deflected onto technical capability.
    TechEscape,
    /// Rule 5: grounder output lacked the falsification block.
    FalsificationBlock,
    /// User demanded a regenerated, strictly opposing assassin take.
    ForcedOpposition,
}

impl ConflictRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AlternativeHypothesis => "alternative_hypothesis",
            Self::ConsensusAlert => "consensus_alert",
            Self::TechEscape => "tech_escape",
            Self::FalsificationBlock => "falsification_block",
            Self::ForcedOpposition => "forced_opposition",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "alternative_hypothesis" => Some(Self::AlternativeHypothesis),
            "consensus_alert" => Some(Self::ConsensusAlert),
            "tech_escape" => Some(Self::TechEscape),
            "falsification_block" => Some(Self::FalsificationBlock),
            "forced_opposition" => Some(Self::ForcedOpposition),
            _ => None,
        }
    }
}

/// How the user resolved a conflict alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictChoice {
    /// Demote the original hypothesis, promote the alternative.
    Accept,
    /// User supplied concrete counter-evidence.
    Counter,
    /// Park the alternative as to-be-verified.
    Verify,
    /// Re-invoke the assassin with a forcing instruction.
    ForceOpposition,
}

impl ConflictChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Counter => "counter",
            Self::Verify => "verify",
            Self::ForceOpposition => "force_opposition",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(Self::Accept),
            "counter" => Some(Self::Counter),
            "verify" => Some(Self::Verify),
            "force_opposition" => Some(Self::ForceOpposition),
            _ => None,
        }
    }
}

/// One triggered rule, persisted for the session transcript.
///
/// Created by the conflict detector; mutated exactly once to attach the
/// user's resolution; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictEvent {
    /// Store-assigned insertion id (0 before persistence).
    pub id: i64,
    pub session_id: Uuid,
    pub round: u32,
    pub rule: ConflictRule,
    /// Free text or serialized structured payload describing the trigger.
    pub detail: String,
    /// Filled once the user responds to the alert.
    pub user_choice: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConflictEvent {
    pub fn new(
        session_id: Uuid,
        round: u32,
        rule: ConflictRule,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            session_id,
            round,
            rule,
            detail: detail.into(),
            user_choice: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.user_choice.is_some()
    }
}
