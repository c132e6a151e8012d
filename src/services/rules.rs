//! Conflict-detection rule engine.
//!
//! Pure functions of text in, structured findings out — no hidden state
//! beyond the prior-round text rule 2 is explicitly handed. Each rule is
//! independently testable; pattern catalogs are fixed and bilingual.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::models::Role;
use crate::services::sections::{extract_section, first_bullet};

fn regexes(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid builtin pattern {p}: {e}")))
        .collect()
}

// ── Rule 1: alternative hypothesis ──

/// Closed-tag marker selecting a root-cause category, with a free-text
/// "other" escape hatch.
static STRUCTURED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?:流程瓶颈|管理问题|需求真实性|现有方案足够|成本不可承受|其他[：:](.+?))\]")
        .expect("invalid structured tag pattern")
});

/// Reframing phrasings, checked in priority order. Chinese first, then
/// English, matching the source rule order.
static ALT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    regexes(&[
        r"可能不是(.+?)[，,]而是(.+?)(?:[。.！!？?\n]|$)",
        r"更底层的问题是[：:]?\s*(.+?)(?:[。.！!？?\n]|$)",
        r"也许根本不需要(.+?)(?:[。.！!？?\n]|$)",
        r"真正的问题可能是[：:]?\s*(.+?)(?:[。.！!？?\n]|$)",
        r"本质上是(.+?)而不是(.+?)(?:[。.！!？?\n]|$)",
        r"与其说是(.+?)[，,]不如说是(.+?)(?:[。.！!？?\n]|$)",
        r"也许问题不是(.+?)[，,]而是(.+?)(?:[。.！!？?\n]|$)",
        r"(?i)not about (.+?), but (?:about )?(.+?)(?:[.\n]|$)",
        r"(?i)the real problem is (.+?)(?:[.\n]|$)",
        r"(?i)maybe (?:you |we )?don'?t (?:even )?need (.+?)(?:[.\n]|$)",
        r"(?i)the underlying issue is (.+?)(?:[.\n]|$)",
    ])
});

/// A reframing of the problem proposed by a challenger persona.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AlternativeHypothesis {
    pub source: Role,
    pub content: String,
}

/// Findings shorter than this (in characters) are discarded as noise.
const MIN_HYPOTHESIS_CHARS: usize = 2;

/// Rule 1. Two tiers: a structured category tag (preferring the explicit
/// `## 替代解释` section body over the tag's captured text), then the
/// phrasal patterns in priority order, using the last non-empty captured
/// group as content.
pub fn detect_alternative_hypothesis(
    response: &str,
    source: Role,
) -> Option<AlternativeHypothesis> {
    if let Some(tag) = STRUCTURED_TAG.captures(response) {
        let content = extract_section(response, "替代解释")
            .and_then(|s| first_bullet(&s))
            .or_else(|| tag.get(1).map(|m| m.as_str().trim().to_string()))
            .unwrap_or_else(|| tag[0].replace(['[', ']'], ""));
        if content.chars().count() > MIN_HYPOTHESIS_CHARS {
            return Some(AlternativeHypothesis { source, content });
        }
    }

    for pattern in ALT_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(response) {
            let content = (1..caps.len())
                .rev()
                .filter_map(|i| caps.get(i))
                .map(|m| m.as_str().trim())
                .find(|s| !s.is_empty())
                .unwrap_or("");
            if content.chars().count() > MIN_HYPOTHESIS_CHARS {
                return Some(AlternativeHypothesis { source, content: content.to_string() });
            }
        }
    }
    None
}

// ── Rule 2: consensus alert ──

const AGREE_KEYWORDS: &[&str] = &[
    "同意", "没问题", "合理", "正确", "确实如此", "说得对", "赞同", "agree", "looks good",
    "no problem", "makes sense", "correct", "valid point",
];

const CHALLENGE_KEYWORDS: &[&str] = &[
    "但是", "然而", "问题在于", "不对", "错", "伪需求", "反对", "质疑", "however", "but",
    "wrong", "false", "disagree", "problem",
];

/// A single utterance is "weak" iff it signals agreement and contains no
/// challenge signal at all.
pub fn is_weak_response(response: &str) -> bool {
    let lower = response.to_lowercase();
    let agrees = AGREE_KEYWORDS.iter().any(|kw| lower.contains(kw));
    let challenges = CHALLENGE_KEYWORDS.iter().any(|kw| lower.contains(kw));
    agrees && !challenges
}

/// Rule 2. Fires when both challengers go weak in the same round, or when
/// the assassin is weak now and was weak in the immediately preceding round
/// (temporal drift). The only rule with cross-round memory.
pub fn detect_consensus_alert(
    assassin: &str,
    user_ghost: &str,
    previous_assassin: Option<&str>,
) -> bool {
    let assassin_weak = is_weak_response(assassin);
    if assassin_weak && is_weak_response(user_ghost) {
        return true;
    }
    assassin_weak && previous_assassin.is_some_and(is_weak_response)
}

// ── Rule 3: technology escape ──

static TECH_ESCAPE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    regexes(&[
        r"AI.{0,10}(?:缩短|加速|提升|降低).{0,10}(?:周期|效率|质量|成本)",
        r"大模型.{0,10}(?:辅助|加速|赋能|提效)",
        r"不能.{0,10}传统.{0,10}(?:方式|方法).{0,10}评估",
        r"开发.{0,10}(?:很快|非常快|极快|成本.{0,5}(?:低|零|趋近))",
        r"(?:成本|开发).{0,10}趋近于零",
        r"技术.{0,10}(?:不是问题|已经成熟|可以解决)",
        r"(?i)AI.{0,10}(?:accelerat|speed|reduc|lower).{0,10}(?:cost|cycle|time)",
        r"(?i)(?:development|dev).{0,10}(?:is fast|very fast|cost.{0,5}zero)",
        r"(?i)(?:LLM|large model|GPT).{0,10}(?:assist|boost|empower)",
    ])
});

/// Rule 3. A single incidental mention is tolerated; two or more distinct
/// deflection patterns fire the alert.
pub fn detect_tech_escape(user_response: &str) -> bool {
    TECH_ESCAPE_PATTERNS.iter().filter(|p| p.is_match(user_response)).count() >= 2
}

// ── Rule 5: falsification block validation ──

/// Anchor phrases the grounder's synthesis must contain, matched bare.
pub const FALSIFICATION_ANCHORS: [&str; 3] = ["当前最重要假设", "如果我是错的", "最小动作"];

/// Rule 5. True iff all three anchors are present.
pub fn validate_falsification_block(grounder_output: &str) -> bool {
    FALSIFICATION_ANCHORS.iter().all(|anchor| grounder_output.contains(anchor))
}

/// Anchors missing from a synthesis output, for the regeneration note.
pub fn missing_falsification_anchors(grounder_output: &str) -> Vec<&'static str> {
    FALSIFICATION_ANCHORS
        .iter()
        .copied()
        .filter(|anchor| !grounder_output.contains(anchor))
        .collect()
}
