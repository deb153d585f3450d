//! Response classification
//!
//! Decides how a backend answer should be rendered. The categories overlap, so the checks
//! run in a fixed order and the first match wins:
//!
//! 1. markdown table
//! 2. nutrition prose (never a key/value block, even when it is full of colons)
//! 3. YAML-like block (`# header` plus `key: value` lines)
//! 4. other markdown syntax
//! 5. plain text

use once_cell::sync::Lazy;
use regex::Regex;

/// Words that mark nutrition prose. Matched case-insensitively as substrings.
pub const NUTRITION_KEYWORDS: &[&str] = &[
    "aporte nutricional",
    "información nutricional",
    "valor nutricional",
    "calorías",
    "proteínas",
    "grasas",
    "carbohidratos",
    "fibra",
    "sodio",
    "hierro",
    "calcio",
];

static YAML_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#[ \t]*\S").unwrap());
static YAML_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r":[ \t]*\S").unwrap());

static MD_BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*.*\*\*").unwrap());
static MD_ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^*])\*[^*]+\*(?:[^*]|$)").unwrap());
static MD_LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*-\s").unwrap());
static MD_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s").unwrap());
static MD_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());

/// Rendering category of a response text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Contains a pipe table; rendered as markdown
    Table,
    /// Nutrition prose; markdown or plain, never YAML
    Nutrition,
    /// Key/value block rendered as a table
    Yaml,
    /// Bold, italic, lists, headers or inline code
    RichMarkdown,
    Plain,
}

/// Classify a response. Pure and deterministic; an empty string is plain text.
pub fn classify(text: &str) -> ResponseKind {
    if text.trim().is_empty() {
        return ResponseKind::Plain;
    }
    if has_table(text) {
        return ResponseKind::Table;
    }
    if has_nutrition_keyword(text) {
        return ResponseKind::Nutrition;
    }
    if looks_like_yaml(text) {
        return ResponseKind::Yaml;
    }
    if has_markdown_syntax(text) {
        return ResponseKind::RichMarkdown;
    }
    ResponseKind::Plain
}

/// Whether a response should be rendered as a YAML key/value block.
pub fn is_yaml_block(text: &str) -> bool {
    classify(text) == ResponseKind::Yaml
}

/// Two adjacent lines that both contain a pipe.
pub fn has_table(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().collect();
    lines
        .windows(2)
        .any(|pair| pair[0].contains('|') && pair[1].contains('|'))
}

pub fn has_nutrition_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    NUTRITION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// `# header` line plus at least one `key: value` line, ignoring the table/nutrition guards.
fn looks_like_yaml(text: &str) -> bool {
    YAML_HEADER.is_match(text) && YAML_PAIR.is_match(text)
}

pub fn has_markdown_syntax(text: &str) -> bool {
    has_table(text)
        || MD_BOLD.is_match(text)
        || MD_ITALIC.is_match(text)
        || MD_LIST.is_match(text)
        || MD_HEADER.is_match(text)
        || MD_CODE.is_match(text)
}

/// Legacy technical-block markers used before the backend sent structured console blocks.
pub fn is_console_text(text: &str) -> bool {
    text.contains("Paso 1:")
        || text.contains("Resultado:")
        || text.contains("[ CÁLCULO")
        || text.starts_with("[ PYTHON ]")
}
