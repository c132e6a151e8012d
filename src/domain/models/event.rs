/// Outbound lifecycle events, delivered as an ordered push sequence per
/// action.
///
/// Within one action the order is strict: for each persona invocation
/// `role_start`, zero or more `token`, `role_complete`; after the phase's
/// work, `phase_change` then a terminal `done` (or `error`).
use serde::{Deserialize, Serialize};

use super::conflict::ConflictRule;
use super::message::Role;
use super::session::DebatePhase;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    PhaseChange {
        phase: DebatePhase,
        #[serde(skip_serializing_if = "Option::is_none")]
        round: Option<u32>,
    },
    RoleStart {
        role: Role,
    },
    Token {
        role: Role,
        content: String,
    },
    RoleComplete {
        role: Role,
        content: String,
    },
    ConflictAlert {
        conflict_type: ConflictRule,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    ConvergenceCheck {
        converged: bool,
        detail: String,
    },
    Error {
        content: String,
    },
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event = DebateEvent::PhaseChange { phase: DebatePhase::Attacking, round: Some(2) };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_change");
        assert_eq!(json["phase"], "attacking");
        assert_eq!(json["round"], 2);

        let event = DebateEvent::ConflictAlert {
            conflict_type: ConflictRule::TechEscape,
            detail: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "conflict_alert");
        assert_eq!(json["conflict_type"], "tech_escape");
        assert!(json.get("detail").is_none());
    }
}
