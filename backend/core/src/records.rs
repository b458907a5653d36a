//! Structured scan results.
//!
//! Field names follow the snake_case keys the text model is instructed to
//! emit, so a record decodes straight from the model's JSON object. Unknown
//! keys are kept in `extra` and written back out untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::ScanType;

/// Read `null` as the type's empty value instead of failing the decode.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept a JSON string or number (ages come back as either).
fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Option::<TextOrNumber>::deserialize(deserializer)? {
        Some(TextOrNumber::Text(s)) => Some(s),
        Some(TextOrNumber::Number(n)) => Some(n.to_string()),
        None => None,
    })
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Medicine
// ---------------------------------------------------------------------------

/// Dosage strength of a single package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DosageStrength {
    #[default]
    Normal,
    High,
}

impl From<String> for DosageStrength {
    fn from(value: String) -> Self {
        if value.to_ascii_lowercase().contains("high") {
            Self::High
        } else {
            Self::Normal
        }
    }
}

/// Result of reading a medicine package or strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicineRecord {
    /// Required key; its presence is what makes an object a medicine record.
    #[serde(deserialize_with = "null_default")]
    pub medicine_name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub brand: String,
    #[serde(default, deserialize_with = "null_default")]
    pub manufacturer: String,
    #[serde(default, deserialize_with = "null_default")]
    pub active_salts: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub dosage_strength: DosageStrength,
    #[serde(default, deserialize_with = "null_default")]
    pub is_high_dosage: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub dosage_info: String,
    #[serde(default, deserialize_with = "null_default")]
    pub conditions: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub what_it_does: String,
    #[serde(default, deserialize_with = "null_default")]
    pub suitable_age_group: String,
    /// Localized advice; this is the narration text.
    #[serde(default, deserialize_with = "null_default")]
    pub advice: String,
    #[serde(default, deserialize_with = "null_default")]
    pub advice_en: String,
    #[serde(default = "default_true")]
    pub is_medicine: bool,
    #[serde(default, deserialize_with = "null_default", skip_serializing_if = "String::is_empty")]
    pub extracted_expiry_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_expired: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MedicineRecord {
    /// English advice for the side-by-side panel, only when it differs from
    /// the localized text.
    pub fn english_advice_for_display(&self) -> Option<&str> {
        english_panel(&self.advice, &self.advice_en)
    }
}

// ---------------------------------------------------------------------------
// Prescription
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DoctorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text_or_number", skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// One prescribed medicine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MedicineEntry {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub dosage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub frequency: String,
    #[serde(default, deserialize_with = "null_default")]
    pub timing: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub meal_relation: String,
    #[serde(default, deserialize_with = "null_default")]
    pub active_salts: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub alternatives: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side_effects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_interaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_antibiotic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MedicineEntry {
    /// Daily slots implied by the timing shorthand.
    pub fn dose_slots(&self) -> Vec<&'static str> {
        let t = self.timing.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| t.contains(n));
        let thrice = ["tds", "thrice", "three"];

        let mut slots = Vec::new();
        if has(&["morning", "breakfast", "bd", "twice"]) || has(&thrice) {
            slots.push("Morning");
        }
        if has(&["afternoon", "lunch"]) || has(&thrice) {
            slots.push("Afternoon");
        }
        if has(&["night", "dinner", "bedtime", "bd", "twice"]) || has(&thrice) {
            slots.push("Night");
        }
        if has(&["needed", "sos", "required"]) {
            slots.push("As Needed");
        }
        if slots.is_empty() {
            slots.push("As directed");
        }
        slots
    }
}

/// Result of reading a handwritten or printed prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_info: Option<DoctorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_info: Option<PatientInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    /// Required key; its presence is what makes an object a prescription.
    #[serde(deserialize_with = "null_default")]
    pub medicines: Vec<MedicineEntry>,
    #[serde(default, deserialize_with = "null_default")]
    pub interactions: Vec<String>,
    /// Localized summary; this is the narration text.
    #[serde(default, deserialize_with = "null_default")]
    pub overall_advice: String,
    #[serde(default, deserialize_with = "null_default")]
    pub overall_advice_en: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_advice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PrescriptionRecord {
    pub fn english_advice_for_display(&self) -> Option<&str> {
        english_panel(&self.overall_advice, &self.overall_advice_en)
    }
}

fn english_panel<'a>(localized: &str, english: &'a str) -> Option<&'a str> {
    if english.is_empty() || english == localized {
        None
    } else {
        Some(english)
    }
}

// ---------------------------------------------------------------------------
// Fallback + union
// ---------------------------------------------------------------------------

/// Carrier for completion text that could not be structured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFallbackRecord {
    pub raw: String,
}

/// Terminal result of a scan. Serialized without a tag: the `data` field of
/// an API response is the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanResult {
    Medicine(MedicineRecord),
    Prescription(PrescriptionRecord),
    Fallback(RawFallbackRecord),
}

impl ScanResult {
    pub fn fallback(raw: impl Into<String>) -> Self {
        Self::Fallback(RawFallbackRecord { raw: raw.into() })
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// Decode a stored result as the record type its scan produced.
    ///
    /// The untagged form cannot tell a prescription that also carries a
    /// `medicine_name` key from a medicine record, so the scan type decides.
    pub fn decode_for(scan_type: ScanType, value: Value) -> Result<Self, serde_json::Error> {
        let typed = match scan_type {
            ScanType::Medicine => MedicineRecord::deserialize(&value).map(Self::Medicine),
            ScanType::Prescription => PrescriptionRecord::deserialize(&value).map(Self::Prescription),
        };
        typed.or_else(|e| RawFallbackRecord::deserialize(&value).map(Self::Fallback).map_err(|_| e))
    }

    /// Localized advice text, if the result carries any.
    pub fn localized_advice(&self) -> Option<&str> {
        let text = match self {
            Self::Medicine(m) => m.advice.as_str(),
            Self::Prescription(p) => p.overall_advice.as_str(),
            Self::Fallback(_) => return None,
        };
        (!text.trim().is_empty()).then_some(text)
    }

    /// English advice text for the reference panel (already de-duplicated).
    pub fn english_advice_for_display(&self) -> Option<&str> {
        match self {
            Self::Medicine(m) => m.english_advice_for_display(),
            Self::Prescription(p) => p.english_advice_for_display(),
            Self::Fallback(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn medicine_decodes_with_minimal_object() {
        let rec: MedicineRecord = serde_json::from_value(json!({"medicine_name": "X"})).unwrap();
        assert_eq!(rec.medicine_name, "X");
        assert!(rec.is_medicine);
        assert!(rec.active_salts.is_empty());
        assert_eq!(rec.dosage_strength, DosageStrength::Normal);
    }

    #[test]
    fn medicine_requires_name_key() {
        let res: Result<MedicineRecord, _> = serde_json::from_value(json!({"advice": "rest"}));
        assert!(res.is_err());
    }

    #[test]
    fn nulls_read_as_empty() {
        let rec: MedicineRecord = serde_json::from_value(json!({
            "medicine_name": null,
            "brand": null,
            "active_salts": null,
            "dosage_strength": null
        }))
        .unwrap();
        assert_eq!(rec.medicine_name, "");
        assert_eq!(rec.brand, "");
        assert!(rec.active_salts.is_empty());
    }

    #[test]
    fn dosage_strength_is_lenient() {
        let rec: MedicineRecord =
            serde_json::from_value(json!({"medicine_name": "Y", "dosage_strength": "HIGH dose"})).unwrap();
        assert_eq!(rec.dosage_strength, DosageStrength::High);
    }

    #[test]
    fn wrong_types_fail() {
        let res: Result<MedicineRecord, _> =
            serde_json::from_value(json!({"medicine_name": "Z", "active_salts": 42}));
        assert!(res.is_err());
    }

    #[test]
    fn unknown_keys_survive_round_trip() {
        let input = json!({"medicine_name": "X", "storage": "below 25C"});
        let rec: MedicineRecord = serde_json::from_value(input).unwrap();
        let out = serde_json::to_value(&rec).unwrap();
        assert_eq!(out["storage"], "below 25C");
    }

    #[test]
    fn patient_age_accepts_number() {
        let rec: PrescriptionRecord = serde_json::from_value(json!({
            "medicines": [],
            "patient_info": {"name": "R. Kumar", "age": 45}
        }))
        .unwrap();
        assert_eq!(rec.patient_info.unwrap().age.as_deref(), Some("45"));
    }

    #[test]
    fn english_panel_suppressed_when_identical() {
        let rec: MedicineRecord = serde_json::from_value(json!({
            "medicine_name": "Paracetamol",
            "advice": "Take after food.",
            "advice_en": "Take after food."
        }))
        .unwrap();
        assert_eq!(rec.english_advice_for_display(), None);

        let rec: PrescriptionRecord = serde_json::from_value(json!({
            "medicines": [],
            "overall_advice": "खाने के बाद लें।",
            "overall_advice_en": "Take after food."
        }))
        .unwrap();
        assert_eq!(rec.english_advice_for_display(), Some("Take after food."));
    }

    #[test]
    fn untagged_result_picks_variant_by_required_key() {
        let med: ScanResult = serde_json::from_value(json!({"medicine_name": "X"})).unwrap();
        assert!(matches!(med, ScanResult::Medicine(_)));

        let rx: ScanResult = serde_json::from_value(json!({"medicines": []})).unwrap();
        assert!(matches!(rx, ScanResult::Prescription(_)));

        let raw: ScanResult = serde_json::from_value(json!({"raw": "garbled"})).unwrap();
        assert_eq!(raw, ScanResult::fallback("garbled"));
    }

    #[test]
    fn stored_result_decodes_by_scan_type() {
        let mixed = json!({
            "medicines": [{"name": "Amoxicillin"}],
            "medicine_name": "Amoxicillin",
            "overall_advice": "TDS"
        });
        let ScanResult::Prescription(p) = ScanResult::decode_for(ScanType::Prescription, mixed).unwrap() else {
            panic!("expected prescription");
        };
        assert_eq!(p.medicines[0].name, "Amoxicillin");
        assert_eq!(p.overall_advice, "TDS");
        assert_eq!(p.extra["medicine_name"], "Amoxicillin");

        let raw = ScanResult::decode_for(ScanType::Prescription, json!({"raw": "smudged"})).unwrap();
        assert_eq!(raw, ScanResult::fallback("smudged"));

        assert!(ScanResult::decode_for(ScanType::Medicine, json!({"brand": "X"})).is_err());
    }

    #[test]
    fn dose_slots_from_shorthand() {
        let entry = |timing: &str| MedicineEntry {
            timing: timing.into(),
            ..Default::default()
        };
        assert_eq!(entry("BD after meals").dose_slots(), vec!["Morning", "Night"]);
        assert_eq!(entry("TDS").dose_slots(), vec!["Morning", "Afternoon", "Night"]);
        assert_eq!(entry("SOS").dose_slots(), vec!["As Needed"]);
        assert_eq!(entry("").dose_slots(), vec!["As directed"]);
    }

    #[test]
    fn localized_advice_skips_blank_and_fallback() {
        assert_eq!(ScanResult::fallback("x").localized_advice(), None);
        let rec: ScanResult = serde_json::from_value(json!({"medicine_name": "X", "advice": "  "})).unwrap();
        assert_eq!(rec.localized_advice(), None);
    }
}
