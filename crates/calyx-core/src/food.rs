//! Food lookups.
//!
//! Questions like "datos de pan" skip the model and go to the backend's food table. The
//! structured answer is turned into either a YAML block (complete information) or a bulleted
//! summary, with the backend's alternative matches as a trailing note.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::api::FoodLookup;
use crate::locale::Locale;
use crate::state::{ChatMessage, MessageBody};
use crate::units::{capitalize_first, format_nutrient};

/// Checked in order, first match wins.
static FOOD_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)informaci[óo]n completa de ([a-zA-Záéíóúñ ]+)",
        r"(?i)informaci[óo]n de ([a-zA-Záéíóúñ ]+)",
        r"(?i)datos de ([a-zA-Záéíóúñ ]+)",
        r"(?i)aporta ([a-zA-Záéíóúñ ]+)",
        r"(?i)cu[aá]nt[ao]s? (?:calor[ií]as|prote[ií]nas|grasas|fibra|sodio) .* ([a-zA-Záéíóúñ ]+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static COMPLETE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)completa").unwrap());
static LINEA_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^linea").unwrap());

const SUGGESTIONS_LABEL: &str = "Otras variantes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodIntent {
    pub subject: String,
    /// The user asked for the complete nutrient breakdown
    pub complete: bool,
}

impl FoodIntent {
    /// Value of the `nombre` query parameter.
    pub fn query(&self) -> String {
        if self.complete {
            format!("informacion completa de {}", self.subject)
        } else {
            self.subject.clone()
        }
    }

    fn heading(&self) -> String {
        format!("Información de {}", self.subject)
    }
}

/// Detect a "tell me about food X" question.
pub fn detect_food_intent(text: &str) -> Option<FoodIntent> {
    let captures = FOOD_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(text))?;
    let subject = captures.get(1)?.as_str().trim();
    if subject.is_empty() {
        return None;
    }
    Some(FoodIntent {
        subject: subject.to_string(),
        complete: COMPLETE.is_match(text),
    })
}

/// Turn a lookup answer into assistant messages.
pub fn format_food_lookup(
    intent: &FoodIntent,
    lookup: &FoodLookup,
    locale: Locale,
) -> Vec<ChatMessage> {
    if let Some(error) = &lookup.error {
        return vec![ChatMessage::assistant(error.clone())];
    }

    let principal = lookup
        .filas
        .as_ref()
        .filter(|filas| filas.is_object() || filas.is_array())
        .cloned()
        .or_else(|| lookup.info_completa.clone().map(Value::Array));

    let Some(principal) = principal else {
        let text = match lookup.mensaje.as_deref() {
            Some(mensaje) if !mensaje.trim().is_empty() => format!("🛈 {}", mensaje),
            _ => locale.no_response().to_string(),
        };
        return vec![ChatMessage::assistant(text)];
    };

    let suggestions = lookup.suggestions();

    if let (true, Value::Array(items)) = (intent.complete, &principal) {
        let mut messages = vec![ChatMessage::assistant_body(MessageBody::Yaml(
            complete_info_yaml(intent, items),
        ))];
        if !suggestions.is_empty() {
            messages.push(ChatMessage::assistant(format!(
                "{}: {}",
                SUGGESTIONS_LABEL,
                suggestions.join(", ")
            )));
        }
        return messages;
    }

    let mut text = String::new();
    if let Some(mensaje) = lookup.mensaje.as_deref().filter(|m| !m.trim().is_empty()) {
        text.push_str(&format!("🛈 {}\n\n", mensaje));
    }
    text.push_str(&format!("{}:\n", intent.heading()));
    text.push_str(&basic_info_lines(&principal));
    if !suggestions.is_empty() {
        text.push_str(&format!("\n{}: {}", SUGGESTIONS_LABEL, suggestions.join(", ")));
    }
    vec![ChatMessage::assistant_body(MessageBody::from_response(&text))]
}

/// `# Información de X` followed by one `key: value` line per field, `id` dropped. A repeated
/// key keeps its first position and takes the last value.
fn complete_info_yaml(intent: &FoodIntent, items: &[Value]) -> String {
    let mut fields: Vec<(String, String)> = Vec::new();

    for item in items {
        let Value::Object(map) = item else { continue };

        let pairs: Vec<(String, String)> = if let Some(clave) = map.get("clave").and_then(Value::as_str) {
            vec![(clave.trim().to_string(), map.get("valor").map(value_text).unwrap_or_default())]
        } else {
            map.values()
                .filter_map(Value::as_str)
                .filter_map(split_line)
                .collect()
        };

        for (key, value) in pairs {
            if key.is_empty() || key.eq_ignore_ascii_case("id") {
                continue;
            }
            match fields.iter_mut().find(|(existing, _)| *existing == key) {
                Some(field) => field.1 = value,
                None => fields.push((key, value)),
            }
        }
    }

    let mut yaml = format!("# {}\n", intent.heading());
    for (key, value) in fields {
        yaml.push_str(&format!("{}: {}\n", key, value));
    }
    yaml
}

fn basic_info_lines(principal: &Value) -> String {
    let mut out = String::new();
    match principal {
        Value::Object(map) => {
            if let (Some(clave), Some(valor)) = (map.get("clave"), map.get("valor")) {
                out.push_str(&format!("- {}\n", format_nutrient(&value_text(clave), &value_text(valor))));
            } else {
                for (key, value) in map {
                    if matches!(key.as_str(), "clave" | "valor" | "linea") {
                        continue;
                    }
                    out.push_str(&format!("- {}\n", format_nutrient(key, &value_text(value))));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Object(map) => {
                        if let Some(clave) = map.get("clave") {
                            let valor = map.get("valor").map(value_text).unwrap_or_default();
                            out.push_str(&format!("- {}\n", format_nutrient(&value_text(clave), &valor)));
                            continue;
                        }
                        for value in map.values() {
                            let line = value_text(value);
                            match split_line(&line) {
                                Some((key, val)) => {
                                    out.push_str(&format!("- {}: {}\n", capitalize_first(&key), val))
                                }
                                None => out.push_str(&format!("- {}\n", line)),
                            }
                        }
                        out.push('\n');
                    }
                    other => out.push_str(&format!("{}\n", value_text(other))),
                }
            }
        }
        _ => {}
    }
    out
}

/// Split a backend `linea` string. `"energia: 52"` gives `("energia", "52")`; with a label in
/// front (`"linea: energia: 52"`) the label is skipped and the rest of the line is the value.
fn split_line(line: &str) -> Option<(String, String)> {
    if !line.contains(':') {
        return None;
    }
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() >= 3 {
        Some((parts[1].trim().to_string(), parts[2..].join(":").trim().to_string()))
    } else {
        let key = LINEA_PREFIX.replace(parts[0], "").trim().to_string();
        Some((key, parts[1].trim().to_string()))
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup(value: Value) -> FoodLookup {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_detects_complete_request() {
        let intent = detect_food_intent("información completa de manzana").unwrap();
        assert_eq!(intent.subject, "manzana");
        assert!(intent.complete);
        assert_eq!(intent.query(), "informacion completa de manzana");
    }

    #[test]
    fn test_detects_simple_request() {
        let intent = detect_food_intent("datos de pan").unwrap();
        assert_eq!(intent.subject, "pan");
        assert!(!intent.complete);
        assert_eq!(intent.query(), "pan");
    }

    #[test]
    fn test_other_patterns() {
        assert_eq!(detect_food_intent("Informacion de arroz integral").unwrap().subject, "arroz integral");
        assert_eq!(detect_food_intent("¿qué aporta la avena?").unwrap().subject, "la avena");
        assert_eq!(
            detect_food_intent("cuántas calorías tiene una manzana").unwrap().subject,
            "manzana"
        );
        assert!(detect_food_intent("calcula mi IMC").is_none());
        assert!(detect_food_intent("datos de 123").is_none());
    }

    #[test]
    fn test_error_payload() {
        let intent = detect_food_intent("datos de xyz").unwrap();
        let messages = format_food_lookup(
            &intent,
            &lookup(json!({"error": "Alimento no encontrado"})),
            Locale::Es,
        );
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].raw_text(), "Alimento no encontrado");
    }

    #[test]
    fn test_complete_info_becomes_yaml() {
        let intent = detect_food_intent("información completa de manzana").unwrap();
        let data = lookup(json!({
            "info_completa": [
                {"linea": "id: 7"},
                {"linea": "energia: 52"},
                {"linea": "linea: hora: 08:30"},
                {"linea": "energia: 53"}
            ],
            "sugerencias": ["manzana roja", "manzana verde"]
        }));
        let messages = format_food_lookup(&intent, &data, Locale::Es);
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].body,
            MessageBody::Yaml("# Información de manzana\nenergia: 53\nhora: 08:30\n".to_string())
        );
        assert_eq!(messages[1].raw_text(), "Otras variantes: manzana roja, manzana verde");
    }

    #[test]
    fn test_basic_info_is_bulleted() {
        let intent = detect_food_intent("datos de pan").unwrap();
        let data = lookup(json!({
            "mensaje": "Coincidencia aproximada",
            "filas": [{"clave": "energia", "valor": 265}, {"clave": "sodio", "valor": "491"}],
            "sugerencias": ["pan integral"]
        }));
        let messages = format_food_lookup(&intent, &data, Locale::Es);
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].raw_text(),
            "🛈 Coincidencia aproximada\n\nInformación de pan:\n- Energia: 265 kcal\n- Sodio: 491 mg\n\nOtras variantes: pan integral"
        );
    }

    #[test]
    fn test_basic_info_from_flat_object() {
        let intent = detect_food_intent("datos de leche").unwrap();
        let data = lookup(json!({"filas": {"proteina": 3.4}}));
        let messages = format_food_lookup(&intent, &data, Locale::Es);
        assert_eq!(messages[0].raw_text(), "Información de leche:\n- Proteina: 3.4 g\n");
    }

    #[test]
    fn test_no_rows_falls_back_to_message_or_placeholder() {
        let intent = detect_food_intent("datos de pan").unwrap();
        let messages = format_food_lookup(&intent, &lookup(json!({"mensaje": "Sin datos"})), Locale::Es);
        assert_eq!(messages[0].raw_text(), "🛈 Sin datos");

        let messages = format_food_lookup(&intent, &lookup(json!({})), Locale::Es);
        assert_eq!(messages[0].raw_text(), "(Sin respuesta)");
    }

    #[test]
    fn test_split_line() {
        assert_eq!(split_line("energia: 52"), Some(("energia".into(), "52".into())));
        assert_eq!(split_line("Lineaenergia: 52"), Some(("energia".into(), "52".into())));
        assert_eq!(split_line("a: b: c: d"), Some(("b".into(), "c: d".into())));
        assert_eq!(split_line("sin separador"), None);
    }
}
