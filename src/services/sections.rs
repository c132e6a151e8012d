//! Markdown section extraction over persona free text.
//!
//! Persona outputs are loosely structured markdown; several rules pull the
//! body of a `## heading` section. Kept as one helper so every extraction
//! site tolerates the same sloppiness (trailing text on the heading line,
//! missing next heading).

use regex::Regex;

/// Returns the body of the first `## <heading>…` section, up to the next
/// `##` heading or end of text.
pub fn extract_section(text: &str, heading: &str) -> Option<String> {
    let pattern = format!(r"(?s)##\s*{}[^\n]*\n(.*?)(?:\n##|\z)", regex::escape(heading));
    // Headings are fixed literals supplied by this crate, the regex cannot
    // fail to compile at runtime with escaped input.
    let re = Regex::new(&pattern).ok()?;
    re.captures(text).map(|c| c[1].to_string())
}

/// First non-empty line of a section body with leading list markers
/// (`-`, digits, dots, whitespace) stripped.
pub fn first_bullet(section: &str) -> Option<String> {
    section
        .lines()
        .map(|l| l.trim_start_matches(['-', ' ', '\t', '.', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9']).trim())
        .find(|l| !l.is_empty())
        .map(ToString::to_string)
}
