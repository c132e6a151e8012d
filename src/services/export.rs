//! Transcript export: Markdown for humans, JSON for machines.

use serde::Serialize;

use crate::domain::errors::DebateResult;
use crate::domain::models::{ConflictEvent, Message, Role, Session};

fn role_label(role: Role) -> &'static str {
    match role {
        Role::Architect => "🏗️ 架构师",
        Role::Assassin => "⚔️ 刺客",
        Role::UserGhost => "👤 用户鬼",
        Role::Grounder => "📋 落地者",
        Role::User => "用户",
        Role::System => "系统",
    }
}

/// Renders a full session transcript as Markdown, one section per round,
/// messages in insertion order, followed by that round's conflict events
/// with their resolutions.
pub fn export_to_markdown(
    session: &Session,
    messages: &[Message],
    conflicts: &[ConflictEvent],
) -> String {
    let mut md = String::from("# ProdMind 会话导出\n\n");
    md.push_str(&format!("**会话ID**: {}\n", session.id));
    md.push_str(&format!("**创建时间**: {}\n", session.created_at.to_rfc3339()));
    md.push_str(&format!("**总轮数**: {}\n\n", session.current_round));
    md.push_str("---\n\n");

    let max_round = messages.iter().map(|m| m.round).max().unwrap_or(0);
    for round in 1..=max_round {
        md.push_str(&format!("## 第{round}轮\n\n"));
        for msg in messages.iter().filter(|m| m.round == round) {
            md.push_str(&format!("### {}\n\n{}\n\n", role_label(msg.role), msg.content));
        }

        let round_conflicts: Vec<&ConflictEvent> =
            conflicts.iter().filter(|c| c.round == round).collect();
        if !round_conflicts.is_empty() {
            md.push_str("### 冲突事件\n\n");
            for conflict in round_conflicts {
                md.push_str(&format!("- **{}**: {}", conflict.rule.as_str(), conflict.detail));
                if let Some(choice) = &conflict.user_choice {
                    md.push_str(&format!(" → {choice}"));
                }
                md.push('\n');
            }
            md.push('\n');
        }
        md.push_str("---\n\n");
    }

    md
}

#[derive(Serialize)]
struct TranscriptDocument<'a> {
    session: &'a Session,
    messages: &'a [Message],
    conflicts: &'a [ConflictEvent],
}

/// Full transcript as pretty-printed JSON.
pub fn export_to_json(
    session: &Session,
    messages: &[Message],
    conflicts: &[ConflictEvent],
) -> DebateResult<String> {
    let doc = TranscriptDocument { session, messages, conflicts };
    Ok(serde_json::to_string_pretty(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ConflictRule;

    fn fixture() -> (Session, Vec<Message>, Vec<ConflictEvent>) {
        let session = Session::new("做一个代码审查工具", "zh");
        let messages = vec![
            Message::new(session.id, 1, Role::Architect, "## 核心问题\n- 审查太慢"),
            Message::new(session.id, 1, Role::User, "确认"),
            Message::new(session.id, 2, Role::Assassin, "## 攻击\n- 谁付费？"),
        ];
        let mut conflict = ConflictEvent::new(
            session.id,
            2,
            ConflictRule::TechEscape,
            "检测到2处技术逃避表述",
        );
        conflict.user_choice = Some("counter: 已有3家付费意向".to_string());
        (session, messages, vec![conflict])
    }

    #[test]
    fn test_markdown_groups_by_round() {
        let (session, messages, conflicts) = fixture();
        let md = export_to_markdown(&session, &messages, &conflicts);
        let round1 = md.find("## 第1轮").unwrap();
        let round2 = md.find("## 第2轮").unwrap();
        assert!(round1 < round2);
        assert!(md.contains("### 🏗️ 架构师"));
        assert!(md.contains("### ⚔️ 刺客"));
    }

    #[test]
    fn test_markdown_renders_conflict_resolution() {
        let (session, messages, conflicts) = fixture();
        let md = export_to_markdown(&session, &messages, &conflicts);
        assert!(md.contains("- **tech_escape**: 检测到2处技术逃避表述 → counter: 已有3家付费意向"));
    }

    #[test]
    fn test_markdown_empty_session_has_no_rounds() {
        let session = Session::new("idea", "zh");
        let md = export_to_markdown(&session, &[], &[]);
        assert!(!md.contains("## 第"));
        assert!(md.starts_with("# ProdMind 会话导出"));
    }

    #[test]
    fn test_json_export_shape() {
        let (session, messages, conflicts) = fixture();
        let json = export_to_json(&session, &messages, &conflicts).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["messages"].as_array().unwrap().len(), 3);
        assert_eq!(value["conflicts"][0]["rule"], "tech_escape");
    }
}
