//! Display units for nutrient fields returned by the food lookup endpoint.

/// Nutrient field name (lowercase) to display unit. Empty unit means "show the bare value".
const NUTRIENT_UNITS: &[(&str, &str)] = &[
    ("cantidad", ""),
    ("unidad", ""),
    ("energia", "kcal"),
    ("proteina", "g"),
    ("lipidos", "g"),
    ("hidratos de carbono", "g"),
    ("ag saturados", "g"),
    ("ag monoinsaturados", "g"),
    ("ag poliinsaturados", "g"),
    ("colesterol", "mg"),
    ("azucar", "g"),
    ("fibra", "g"),
    ("vitamina a", "mg re"),
    ("acido ascorbico", "mg"),
    ("acido folico", "mg"),
    ("calcio", "mg"),
    ("hierro", "mg"),
    ("potasio", "mg"),
    ("sodio", "mg"),
    ("fosforo", "mg"),
    ("etanol", "g"),
    ("ig", ""),
    ("carga glicemica", ""),
];

/// Look up the display unit for a nutrient field, case-insensitively.
pub fn unit_for(field: &str) -> Option<&'static str> {
    let field = field.trim().to_lowercase();
    NUTRIENT_UNITS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, unit)| *unit)
        .filter(|unit| !unit.is_empty())
}

/// Uppercase the first character, leave the rest untouched.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format a nutrient as `Key: value unit`, e.g. `Energia: 52 kcal`.
pub fn format_nutrient(key: &str, value: &str) -> String {
    let label = capitalize_first(key);
    match unit_for(key) {
        Some(unit) => format!("{}: {} {}", label, value, unit),
        None => format!("{}: {}", label, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_lookup_is_case_insensitive() {
        assert_eq!(unit_for("Energia"), Some("kcal"));
        assert_eq!(unit_for("HIERRO"), Some("mg"));
        assert_eq!(unit_for("vitamina a"), Some("mg re"));
    }

    #[test]
    fn test_unitless_and_unknown_fields() {
        assert_eq!(unit_for("cantidad"), None);
        assert_eq!(unit_for("ig"), None);
        assert_eq!(unit_for("grupo"), None);
    }

    #[test]
    fn test_capitalize_first() {
        assert_eq!(capitalize_first("proteina"), "Proteina");
        assert_eq!(capitalize_first("índice"), "Índice");
        assert_eq!(capitalize_first("aLREADY"), "ALREADY");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn test_format_nutrient() {
        assert_eq!(format_nutrient("energia", "52"), "Energia: 52 kcal");
        assert_eq!(format_nutrient("cantidad", "100"), "Cantidad: 100");
    }
}
