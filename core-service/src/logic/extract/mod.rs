//! Extract Module - Report text → clinical fields
//!
//! A field with no match stays `None`. The only fatal outcome is a document
//! with no readable text at all.

pub mod document;
pub mod fields;
pub mod patterns;

pub use document::{detect_format, read_document_text, DocumentFormat, TextSource};
pub use fields::{ClinicalField, FieldKind, FieldMap, FieldValue};

use crate::error::ExtractionError;

/// Match every field pattern against `text`
pub fn extract_fields(text: &str) -> FieldMap {
    let mut map = FieldMap::new();

    for field in ClinicalField::ALL {
        let Some(raw) = patterns::capture(field, text) else {
            continue;
        };

        match FieldValue::parse(field.kind(), raw) {
            Some(value) => {
                map.set(field, value);
            }
            None => log::warn!("Ignoring {} value {:?}: not a valid {:?}", field, raw, field.kind()),
        }
    }

    map
}

/// Read a document and extract its fields
pub fn extract_document(bytes: &[u8]) -> Result<FieldMap, ExtractionError> {
    let text = read_document_text(bytes)?;
    let map = extract_fields(&text);

    log::info!(
        "Extracted {}/{} fields from {} document",
        map.present_count(),
        ClinicalField::ALL.len(),
        detect_format(bytes).as_str()
    );

    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPORT: &str = "\
Patient Report            01-02-2023
Pregnancies 2
Glucose (mg/dL) 130
Blood Pressure (mm Hg) 70
Skin Thickness (mm) 20
Insulin (mu U/ml) 85
BMI (kg/m2) 28.5
Diabetes Pedigree Function 0.5
Age (years) 33
";

    #[test]
    fn extracts_all_fields() {
        let map = extract_fields(FULL_REPORT);
        assert_eq!(map.pregnancies, Some(2));
        assert_eq!(map.glucose, Some(130.0));
        assert_eq!(map.blood_pressure, Some(70.0));
        assert_eq!(map.skin_thickness, Some(20.0));
        assert_eq!(map.insulin, Some(85.0));
        assert_eq!(map.bmi, Some(28.5));
        assert_eq!(map.diabetes_pedigree_function, Some(0.5));
        assert_eq!(map.age, Some(33));
        assert_eq!(map.date.as_deref(), Some("01-02-2023"));
    }

    #[test]
    fn case_does_not_matter() {
        assert_eq!(extract_fields("GLUCOSE 130"), extract_fields("glucose 130"));
        assert_eq!(extract_fields("GLUCOSE 130").glucose, Some(130.0));
    }

    #[test]
    fn partial_match_leaves_other_fields_absent() {
        let text = "Glucose 130\nBMI 28.5\nAge 33\nInsulin 85\n01-02-2023";
        let map = extract_document(text.as_bytes()).unwrap();

        assert_eq!(map.present_count(), 5);
        assert_eq!(map.pregnancies, None);
        assert_eq!(map.blood_pressure, None);
        assert_eq!(map.skin_thickness, None);
        assert_eq!(map.diabetes_pedigree_function, None);
    }

    #[test]
    fn unparseable_integer_is_absent() {
        let map = extract_fields("Age (years) 33.5\nPregnancies 2");
        assert_eq!(map.age, None);
        assert_eq!(map.pregnancies, Some(2));
    }

    #[test]
    fn pregnancies_with_decimal_point_reads_whole_part() {
        let map = extract_fields("Pregnancies 2.0\nGlucose (mg/dL) 130");
        assert_eq!(map.pregnancies, Some(2));
        assert_eq!(map.glucose, Some(130.0));
    }

    #[test]
    fn empty_document_is_fatal() {
        assert!(matches!(extract_document(b""), Err(ExtractionError::NoText)));
    }

    #[test]
    fn text_without_any_field_is_not_fatal() {
        let map = extract_document(b"Nothing relevant here").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn extracts_from_pdf() {
        let pdf = document::tests::make_test_pdf("Glucose 130");
        let map = extract_document(&pdf).unwrap();
        assert_eq!(map.glucose, Some(130.0));
    }
}
