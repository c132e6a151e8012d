//! Terminal rendering of debate lifecycle events.

use std::io::Write;

use console::style;

use crate::domain::models::{ConflictRule, DebateEvent, DebatePhase, Role};

fn role_heading(role: Role) -> String {
    let label = match role {
        Role::Architect => style("🏗️ 架构师").cyan().bold(),
        Role::Assassin => style("⚔️ 刺客").red().bold(),
        Role::UserGhost => style("👤 用户鬼").yellow().bold(),
        Role::Grounder => style("📋 落地者").green().bold(),
        Role::User => style("用户").bold(),
        Role::System => style("系统").dim().bold(),
    };
    label.to_string()
}

fn conflict_label(rule: ConflictRule) -> &'static str {
    match rule {
        ConflictRule::AlternativeHypothesis => "替代假设：挑战者重新定义了问题",
        ConflictRule::ConsensusAlert => "共识警报：挑战者开始附和，辩论失去张力",
        ConflictRule::TechEscape => "技术逃避：回应聚焦技术能力而非需求真实性",
        ConflictRule::FalsificationBlock => "证伪检查缺失",
        ConflictRule::ForcedOpposition => "已强制刺客重新反对",
    }
}

/// Streams events to the terminal. Tracks whether the current role produced
/// incremental tokens so a regenerated or fallback `role_complete` (which
/// was never streamed) still gets printed in full.
#[derive(Default)]
pub struct EventRenderer {
    tokens_since_start: usize,
}

impl EventRenderer {
    pub fn render(&mut self, event: &DebateEvent) {
        match event {
            DebateEvent::PhaseChange { phase, round } => {
                let line = match round {
                    Some(round) => format!("── 第{round}轮 · {} ──", phase.as_str()),
                    None => format!("── {} ──", phase.as_str()),
                };
                println!("{}", style(line).dim());
                if *phase == DebatePhase::UserConfirm {
                    println!(
                        "{}",
                        style("下一步：prodmind debate confirm <会话ID> \"确认或修正\"").dim()
                    );
                } else if *phase == DebatePhase::UserResponse {
                    println!(
                        "{}",
                        style("下一步：prodmind debate respond <会话ID> \"你的回应\"").dim()
                    );
                }
            }
            DebateEvent::RoleStart { role } => {
                self.tokens_since_start = 0;
                println!("\n{}", role_heading(*role));
            }
            DebateEvent::Token { content, .. } => {
                self.tokens_since_start += 1;
                print!("{content}");
                let _ = std::io::stdout().flush();
            }
            DebateEvent::RoleComplete { role, content } => {
                if self.tokens_since_start == 0 {
                    println!("\n{}", role_heading(*role));
                    println!("{content}");
                } else {
                    println!();
                }
                self.tokens_since_start = 0;
            }
            DebateEvent::ConflictAlert { conflict_type, detail } => {
                println!("\n{} {}", style("⚠").yellow().bold(), conflict_label(*conflict_type));
                if let Some(detail) = detail {
                    println!("  {}", style(detail).dim());
                }
            }
            DebateEvent::ConvergenceCheck { converged, detail } => {
                let verdict = if *converged { "假设已收敛" } else { "假设仍在变化" };
                println!("\n{} {verdict}（{detail}）", style("◆").magenta());
            }
            DebateEvent::Error { content } => {
                eprintln!("\n{} {content}", style("错误：").red().bold());
            }
            DebateEvent::Done => {}
        }
    }
}
