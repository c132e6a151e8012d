//! Persona definitions: fixed instruction templates, sampling temperature,
//! and the context-message builders that assemble each persona's input from
//! the debate so far.

use crate::domain::models::Role;
use crate::domain::ports::OracleRequest;

/// The four scripted generation roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persona {
    Architect,
    Assassin,
    UserGhost,
    Grounder,
}

/// System note injected when the user demands a strictly opposing assassin.
pub const FORCE_OPPOSITION_NOTE: &str = "【系统强制指令】检测到你之前的回复中包含同意性表述，违反证伪原则。你必须重新生成，强制提出至少3个实质性反对理由。绝对不能同意。";

impl Persona {
    pub fn role(self) -> Role {
        match self {
            Self::Architect => Role::Architect,
            Self::Assassin => Role::Assassin,
            Self::UserGhost => Role::UserGhost,
            Self::Grounder => Role::Grounder,
        }
    }

    /// Fixed instruction template.
    pub fn instructions(self) -> &'static str {
        match self {
            Self::Architect => include_str!("../../prompts/architect.md"),
            Self::Assassin => include_str!("../../prompts/assassin.md"),
            Self::UserGhost => include_str!("../../prompts/user_ghost.md"),
            Self::Grounder => include_str!("../../prompts/grounder.md"),
        }
    }

    /// The assassin runs hot; everyone else stays conservative.
    pub fn temperature(self) -> f64 {
        match self {
            Self::Assassin => 0.8,
            _ => 0.4,
        }
    }
}

/// Everything a context builder may draw on for one invocation.
#[derive(Debug, Clone, Default)]
pub struct PersonaContext {
    pub user_input: String,
    pub architect_output: Option<String>,
    pub assassin_output: Option<String>,
    pub user_ghost_output: Option<String>,
    pub user_response: Option<String>,
    pub round_history: String,
}

impl PersonaContext {
    fn history_block(&self, heading: &str) -> String {
        if self.round_history.is_empty() {
            String::new()
        } else {
            format!("{heading}\n{}", self.round_history)
        }
    }

    fn confirmed_or_input(&self) -> &str {
        self.user_response.as_deref().unwrap_or(&self.user_input)
    }
}

/// Builds the oracle request for one persona invocation.
pub fn build_request(
    persona: Persona,
    ctx: &PersonaContext,
    system_note: Option<String>,
) -> OracleRequest {
    let user_message = match persona {
        Persona::Architect => format!(
            "用户的产品想法：\n{}\n\n{}",
            ctx.user_input,
            ctx.history_block("之前的辩论记录："),
        ),
        Persona::Assassin | Persona::UserGhost => format!(
            "架构师的问题定义：\n{}\n\n用户确认/修正：\n{}\n\n{}",
            ctx.architect_output.as_deref().unwrap_or(""),
            ctx.confirmed_or_input(),
            ctx.history_block("之前的辩论记录："),
        ),
        Persona::Grounder => format!(
            "## 辩论记录\n\n### 架构师的问题定义\n{}\n\n### 用户确认/修正\n{}\n\n### 刺客的攻击\n{}\n\n### 用户鬼的质疑\n{}\n\n### 用户对质疑的回应\n{}\n\n{}\n\n请基于以上辩论，生成假设清单和MVP边界。",
            ctx.architect_output.as_deref().unwrap_or(""),
            ctx.user_response.as_deref().unwrap_or(""),
            ctx.assassin_output.as_deref().unwrap_or(""),
            ctx.user_ghost_output.as_deref().unwrap_or(""),
            ctx.user_input,
            ctx.history_block("### 之前轮次的记录"),
        ),
    };

    OracleRequest {
        system_prompt: persona.instructions().to_string(),
        user_message,
        system_note,
        temperature: persona.temperature(),
    }
}
