//! Parser for YAML-like key/value blocks.
//!
//! The backend emits loosely structured blocks such as
//!
//! ```text
//! # Resultado IMC
//! peso: 70 kg
//! altura: 1.75 m
//! imc: 22.86
//! ```
//!
//! which are shown as a header plus a two-column table. Only the first colon of a line splits
//! key from value, duplicate keys are kept in order, and `id` keys never reach the table.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::units::capitalize_first;

/// A line made only of letters and spaces that ends with a colon, e.g. `Datos del paciente:`.
static LABEL_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\p{L} ]+:$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum YamlParseError {
    #[error("empty block")]
    Empty,
    #[error("no key/value lines found")]
    NoPairs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlPair {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct YamlBlock {
    pub header: Option<String>,
    pub pairs: Vec<YamlPair>,
}

impl YamlBlock {
    /// Rows for the rendered table: `id` dropped, keys capitalised.
    pub fn table_rows(&self) -> Vec<(String, String)> {
        self.pairs
            .iter()
            .filter(|pair| !is_id_key(&pair.key))
            .map(|pair| (capitalize_first(&pair.key), pair.value.clone()))
            .collect()
    }
}

/// Parse a block into header and ordered pairs.
///
/// Never panics; a block that yields nothing tabular comes back as an error so the caller can
/// fall back to the raw text.
pub fn parse_yaml_block(input: &str) -> Result<YamlBlock, YamlParseError> {
    let lines: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some((first, rest)) = lines.split_first() else {
        return Err(YamlParseError::Empty);
    };

    let mut block = YamlBlock::default();
    let mut body: Vec<&str> = Vec::with_capacity(lines.len());

    if let Some(header) = header_from_line(first) {
        block.header = Some(header);
    } else {
        body.push(first);
    }
    body.extend(rest.iter().filter(|line| !line.starts_with('#')));

    for line in body {
        if let Some(pair) = split_pair(line) {
            block.pairs.push(pair);
        }
    }

    if block.pairs.is_empty() {
        return Err(YamlParseError::NoPairs);
    }
    Ok(block)
}

/// The raw block with every `id: ...` line removed.
pub fn raw_view(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            split_pair(line.trim())
                .map(|pair| !is_id_key(&pair.key))
                .unwrap_or(true)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn header_from_line(line: &str) -> Option<String> {
    if line.starts_with('#') {
        let header = line.trim_start_matches('#').trim();
        return Some(header.trim_end_matches(':').trim().to_string());
    }
    if LABEL_LINE.is_match(line) {
        return Some(line.trim_end_matches(':').trim().to_string());
    }
    None
}

fn split_pair(line: &str) -> Option<YamlPair> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some(YamlPair {
        key: key.to_string(),
        value: value.trim().to_string(),
    })
}

fn is_id_key(key: &str) -> bool {
    key.trim().eq_ignore_ascii_case("id")
}
