//! Tolerant decoding of Stage 2 completions.
//!
//! Completions are untrusted text: the object may be wrapped in prose or a
//! markdown fence. The span from the first `{` to the last `}` is decoded as
//! the scan type's record; anything else becomes a fallback record carrying
//! the completion unmodified. Decoding is all-or-nothing: no partial field
//! recovery.

use sanjeevani_core::{MedicineRecord, PrescriptionRecord, ScanResult, ScanType};
use sanjeevani_logging::truncate_for_log;
use tracing::debug;

/// The largest `{ ... }` span in `text`, if any.
pub fn extract_json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode a completion into a structured record, or fall back. Never fails.
pub fn parse(completion: &str, scan_type: ScanType) -> ScanResult {
    let Some(span) = extract_json_span(completion) else {
        debug!(scan_type = %scan_type, "No JSON object in completion; using fallback");
        return ScanResult::fallback(completion);
    };

    let decoded = match scan_type {
        ScanType::Medicine => serde_json::from_str::<MedicineRecord>(span).map(ScanResult::Medicine),
        ScanType::Prescription => {
            serde_json::from_str::<PrescriptionRecord>(span).map(ScanResult::Prescription)
        }
    };

    match decoded {
        Ok(result) => result,
        Err(e) => {
            debug!(
                scan_type = %scan_type,
                error = %e,
                preview = %truncate_for_log(span, 120),
                "Completion did not match the record shape; using fallback"
            );
            ScanResult::fallback(completion)
        }
    }
}
