//! Technical computation blocks shown as an animated terminal transcript.

use serde::{Deserialize, Serialize};

/// Title to glyph for the block header.
const TITLE_ICONS: &[(&str, &str)] = &[
    ("Python", "🐍"),
    ("Cálculo", "🧮"),
    ("Nutrición", "🥗"),
    ("Consola", "💬"),
    ("Error", "⚠️"),
];

const DEFAULT_ICON: &str = "💬";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleBlock {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
}

impl ConsoleBlock {
    pub fn new(title: impl Into<String>, input: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            input: input.into(),
            output: output.into(),
        }
    }

    /// Split a legacy plain-text block: first line is the bracketed title, the last line is the
    /// output and everything in between is the input.
    pub fn from_text(text: &str) -> Self {
        let lines: Vec<&str> = text.split('\n').collect();
        let first = lines.first().copied().unwrap_or_default();
        let title = first.replacen('[', "", 1).replacen(']', "", 1).trim().to_string();

        let (input, output) = match lines.len() {
            0 | 1 => (String::new(), first.to_string()),
            n => (lines[1..n - 1].join("\n"), lines[n - 1].to_string()),
        };

        Self { title, input, output }
    }

    /// The text the typewriter reveals: trimmed input, a newline, then trimmed output.
    /// Empty parts contribute nothing.
    pub fn content(&self) -> String {
        let input = self.input.trim();
        let output = self.output.trim();

        let mut content = String::with_capacity(input.len() + output.len() + 1);
        if !input.is_empty() {
            content.push_str(input);
            content.push('\n');
        }
        if !output.is_empty() {
            content.push_str(output);
        }
        content
    }

    pub fn icon(&self) -> &'static str {
        TITLE_ICONS
            .iter()
            .find(|(title, _)| *title == self.title.trim())
            .map(|(_, icon)| *icon)
            .unwrap_or(DEFAULT_ICON)
    }

    /// Header label; the backend leaves the title empty for plain calculations.
    pub fn label(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "Cálculo"
        } else {
            title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_concatenation() {
        assert_eq!(ConsoleBlock::new("", "A", "B").content(), "A\nB");
        assert_eq!(ConsoleBlock::new("", "", "B").content(), "B");
        assert_eq!(ConsoleBlock::new("", "A", "").content(), "A\n");
        assert_eq!(ConsoleBlock::new("", "  A \n", "\n B  ").content(), "A\nB");
        assert_eq!(ConsoleBlock::new("", "  ", "").content(), "");
    }

    #[test]
    fn test_from_text_split() {
        let block = ConsoleBlock::from_text("[ CÁLCULO IMC ]\npeso = 70\naltura = 1.75\nIMC = 22.86");
        assert_eq!(block.title, "CÁLCULO IMC");
        assert_eq!(block.input, "peso = 70\naltura = 1.75");
        assert_eq!(block.output, "IMC = 22.86");
    }

    #[test]
    fn test_from_text_short_inputs() {
        let block = ConsoleBlock::from_text("Resultado: 3");
        assert_eq!(block.title, "Resultado: 3");
        assert_eq!(block.input, "");
        assert_eq!(block.output, "Resultado: 3");

        let block = ConsoleBlock::from_text("[ PYTHON ]\n42");
        assert_eq!(block.title, "PYTHON");
        assert_eq!(block.input, "");
        assert_eq!(block.output, "42");
    }

    #[test]
    fn test_icon_and_label() {
        assert_eq!(ConsoleBlock::new("Python", "", "").icon(), "🐍");
        assert_eq!(ConsoleBlock::new("Otro", "", "").icon(), DEFAULT_ICON);
        assert_eq!(ConsoleBlock::new("", "", "").label(), "Cálculo");
        assert_eq!(ConsoleBlock::new("Nutrición", "", "").label(), "Nutrición");
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let block: ConsoleBlock = serde_json::from_str(r#"{"output": "3"}"#).unwrap();
        assert_eq!(block, ConsoleBlock::new("", "", "3"));
    }
}
