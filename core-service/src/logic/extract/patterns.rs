//! Field patterns.
//!
//! All patterns are case-insensitive. A label may be followed by a unit in
//! parentheses and a `:` or `=` before the value, e.g. `Glucose (mg/dL): 130`.
//! Pregnancies captures whole digits only, so `Pregnancies 2.0` reads as 2.

use once_cell::sync::Lazy;
use regex::Regex;

use super::fields::ClinicalField;

/// Unit parenthetical and separator before the value
const LABEL_SUFFIX: &str = r"\s*(?:\([^)\n]*\))?\s*[:=]?\s*";

const DECIMAL: &str = r"(\d+(?:\.\d+)?)";
const WHOLE: &str = r"(\d+)";

fn label_pattern(label: &str) -> String {
    value_pattern(label, DECIMAL)
}

fn value_pattern(label: &str, value: &str) -> String {
    format!(r"(?i)\b{label}\b{LABEL_SUFFIX}{value}")
}

/// Compiled pattern per field, in `ClinicalField::ALL` order
pub static FIELD_PATTERNS: Lazy<Vec<(ClinicalField, Regex)>> = Lazy::new(|| {
    ClinicalField::ALL
        .iter()
        .map(|&field| {
            let pattern = match field {
                ClinicalField::Pregnancies => value_pattern("pregnancies", WHOLE),
                ClinicalField::Glucose => label_pattern("glucose"),
                ClinicalField::BloodPressure => label_pattern(r"blood\s*pressure"),
                ClinicalField::SkinThickness => label_pattern(r"skin\s*thickness"),
                ClinicalField::Insulin => label_pattern("insulin"),
                ClinicalField::Bmi => label_pattern("bmi"),
                ClinicalField::DiabetesPedigreeFunction => {
                    label_pattern(r"diabetes\s*pedigree\s*function")
                }
                ClinicalField::Age => label_pattern("age"),
                ClinicalField::Date => r"\b(\d{2}-\d{2}-\d{4})\b".to_string(),
            };
            let regex = Regex::new(&pattern).expect("field patterns are static and valid");
            (field, regex)
        })
        .collect()
});

/// First captured value for `field` in `text`
pub fn capture<'t>(field: ClinicalField, text: &'t str) -> Option<&'t str> {
    FIELD_PATTERNS
        .iter()
        .find(|(f, _)| *f == field)
        .and_then(|(_, re)| re.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
