//! Round history rendering.
//!
//! Serializes prior messages into the single text blob personas receive as
//! background context. Rendering preserves (round, insertion) order because
//! later phases depend on seeing utterances in the order they happened.

use std::collections::BTreeMap;

use crate::domain::models::Message;

/// Renders messages grouped per round as
/// `--- 第r轮 ---` blocks of `<label>：<content>` lines, joined by blank
/// lines. `window_rounds` caps context growth: only the last N rounds that
/// have messages are rendered (0 disables the history entirely).
pub fn build_round_history(messages: &[Message], window_rounds: u32) -> String {
    let mut rounds: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for msg in messages {
        rounds
            .entry(msg.round)
            .or_default()
            .push(format!("{}：{}", msg.role.history_label(), msg.content));
    }

    let skip = rounds.len().saturating_sub(window_rounds as usize);
    rounds
        .into_iter()
        .skip(skip)
        .map(|(round, lines)| format!("--- 第{round}轮 ---\n{}", lines.join("\n")))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Role;
    use uuid::Uuid;

    fn msg(round: u32, role: Role, content: &str) -> Message {
        Message::new(Uuid::nil(), round, role, content)
    }

    #[test]
    fn test_groups_by_round_and_preserves_order() {
        let messages = vec![
            msg(1, Role::Architect, "核心问题是A"),
            msg(1, Role::User, "确认"),
            msg(1, Role::Assassin, "质疑A"),
            msg(2, Role::Architect, "核心问题是B"),
        ];
        let history = build_round_history(&messages, 5);
        assert_eq!(
            history,
            "--- 第1轮 ---\n架构师：核心问题是A\n用户：确认\n刺客：质疑A\n\n--- 第2轮 ---\n架构师：核心问题是B"
        );
    }

    #[test]
    fn test_empty_messages_render_empty_history() {
        assert_eq!(build_round_history(&[], 5), "");
    }

    #[test]
    fn test_window_keeps_only_trailing_rounds() {
        let messages = vec![
            msg(1, Role::Architect, "一"),
            msg(2, Role::Architect, "二"),
            msg(3, Role::Architect, "三"),
        ];
        let history = build_round_history(&messages, 2);
        assert!(!history.contains("第1轮"));
        assert!(history.contains("第2轮"));
        assert!(history.contains("第3轮"));

        assert_eq!(build_round_history(&messages, 0), "");
    }
}
