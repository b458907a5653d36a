//! Deterministic corrections applied to a parsed record before narration.
//!
//! Everything here runs before the narration text is composed; once the
//! narration exists, the advice fields are never touched again.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use sanjeevani_core::{MedicineRecord, PrescriptionRecord, ScanResult};
use tracing::info;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").expect("valid year pattern"));
static NUMERIC_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\s*[/\-.]\s*20\d{2}\b").expect("valid month pattern"));

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Placeholder stored in `expiry_date` when the pack shows no expiry.
pub const EXPIRY_NOT_FOUND: &str = "Not Found";

/// Run the scan type's post-processing. Fallback records pass through.
pub fn postprocess(result: &mut ScanResult, today: NaiveDate) {
    match result {
        ScanResult::Medicine(record) => apply_medicine_expiry(record, today),
        ScanResult::Prescription(record) => apply_prescription_order(record),
        ScanResult::Fallback(_) => {}
    }
}

/// Parse `(year, month)` out of free-form expiry text. Month is 1-based.
fn parse_expiry(text: &str) -> Option<(i32, Option<u32>)> {
    let year: i32 = YEAR_RE.captures(text)?[1].parse().ok()?;

    let month = NUMERIC_MONTH_RE
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
        .filter(|m| (1..=12).contains(m))
        .or_else(|| {
            MONTHS
                .iter()
                .position(|m| text.contains(m))
                .map(|i| i as u32 + 1)
        });

    Some((year, month))
}

/// Mark expired packs and replace their advice with a do-not-use warning.
pub fn apply_medicine_expiry(record: &mut MedicineRecord, today: NaiveDate) {
    let expiry_text = record.extracted_expiry_text.trim().to_uppercase();

    let is_expired = match parse_expiry(&expiry_text) {
        Some((year, Some(month))) => (year, month) < (today.year(), today.month()),
        Some((year, None)) => year < today.year(),
        None => false,
    };

    if is_expired {
        let warning = format!("WARNING: This medicine expired in {expiry_text}. DO NOT USE.");
        info!(expiry = %expiry_text, "Medicine is past its expiry date");
        record.advice = warning.clone();
        record.advice_en = warning;
    }

    record.is_expired = Some(is_expired);
    record.expiry_date = Some(if expiry_text.is_empty() {
        EXPIRY_NOT_FOUND.to_string()
    } else {
        expiry_text
    });
}

/// Default each entry's `order` and `meal_relation`, then sort by `order`.
pub fn apply_prescription_order(record: &mut PrescriptionRecord) {
    for (idx, entry) in record.medicines.iter_mut().enumerate() {
        if entry.order.is_none() {
            entry.order = Some(idx as u32 + 1);
        }
        if entry.meal_relation.trim().is_empty() {
            entry.meal_relation = if entry.timing.trim().is_empty() {
                "anytime".to_string()
            } else {
                entry.timing.clone()
            };
        }
    }
    record.medicines.sort_by_key(|entry| entry.order.unwrap_or(u32::MAX));
}
