//! Persona invocation controller.
//!
//! Wraps the role oracle: drains a persona's token stream while forwarding
//! lifecycle events, offers the non-streaming path used by validation
//! retries, and owns the deterministic grounder fallback used when the
//! oracle hard-fails during grounding.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::domain::models::DebateEvent;
use crate::domain::ports::{OracleError, RoleOracle};
use crate::services::personas::{build_request, Persona, PersonaContext};
use crate::services::rules::missing_falsification_anchors;
use crate::services::sections::{extract_section, first_bullet};

pub struct PersonaInvoker {
    oracle: Arc<dyn RoleOracle>,
}

impl PersonaInvoker {
    pub fn new(oracle: Arc<dyn RoleOracle>) -> Self {
        Self { oracle }
    }

    /// Invokes a persona and forwards its output incrementally:
    /// `role_start`, each `token`, then `role_complete` carrying the full
    /// concatenated text. A failure mid-stream propagates without emitting
    /// `role_complete`.
    pub async fn stream_role(
        &self,
        persona: Persona,
        ctx: &PersonaContext,
        system_note: Option<String>,
        events: &UnboundedSender<DebateEvent>,
    ) -> Result<String, OracleError> {
        let role = persona.role();
        let request = build_request(persona, ctx, system_note);
        debug!(role = role.as_str(), "invoking persona (streaming)");

        let mut stream = self.oracle.stream(request).await?;
        let _ = events.send(DebateEvent::RoleStart { role });

        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            full.push_str(&fragment);
            let _ = events.send(DebateEvent::Token { role, content: fragment });
        }

        let _ = events.send(DebateEvent::RoleComplete { role, content: full.clone() });
        Ok(full)
    }

    /// Non-streaming invocation, used for the single validation-driven
    /// regeneration of the grounder.
    pub async fn complete_role(
        &self,
        persona: Persona,
        ctx: &PersonaContext,
        system_note: Option<String>,
    ) -> Result<String, OracleError> {
        let request = build_request(persona, ctx, system_note);
        debug!(role = persona.role().as_str(), "invoking persona (whole)");
        self.oracle.complete(request).await
    }
}

/// Regeneration note for a synthesis that failed falsification validation,
/// naming exactly the anchors that were missing.
pub fn regeneration_note(grounder_output: &str) -> String {
    let missing = missing_falsification_anchors(grounder_output).join("、");
    format!(
        "【系统提示】你的上一次输出缺少\u{201c}本轮证伪检查\u{201d}部分（缺失：{missing}）。请务必在末尾包含：当前最重要假设、如果我是错的最可能因为什么、验证这个假设的最小动作。"
    )
}

const EXTRACTION_PLACEHOLDER: &str = "（未能提取）";

/// Deterministic local fallback for the grounding phase.
///
/// Assembled from the architect's first core-problem bullet and the
/// assassin's first implicit-assumption bullet, with a pre-filled
/// falsification block so rule 5 passes, and a visible degradation warning.
pub fn generate_fallback_grounder(architect_output: &str, assassin_output: &str) -> String {
    let core = extract_section(architect_output, "核心问题")
        .and_then(|s| first_bullet(&s))
        .unwrap_or_else(|| EXTRACTION_PLACEHOLDER.to_string());
    let assumption = extract_section(assassin_output, "隐含假设")
        .and_then(|s| first_bullet(&s))
        .unwrap_or_else(|| EXTRACTION_PLACEHOLDER.to_string());

    warn!("grounder fallback engaged, synthesis degraded");

    format!(
        "## 当前最强假设（降级生成）\n\n1. {core}\n2. 待验证：{assumption}\n\n\
         ## MVP边界\n\n### 本版本包含\n- 待人工补充（API生成失败，仅保留结构）\n\n\
         ### 明确排除\n- 待人工补充\n\n### 一周内可完成范围\n- 待人工补充\n\n\
         ## 未决冲突\n\n- 冲突：刺客与用户的核心分歧尚未解决\n- 争议点：{assumption}\n\
         - 下一步证伪：需要用户提供具体数据或案例\n\n\
         ## 本轮证伪检查\n\n当前最重要假设：{core}\n\
         如果我是错的，最可能因为什么？需求本身不成立\n\
         验证这个假设的最小动作是什么？对5个目标用户做快速访谈\n\n\
         ⚠ 注意：本输出为API失败后的降级生成，信息密度较低，建议下一轮重新收敛。"
    )
}
