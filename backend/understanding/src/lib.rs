//! Image understanding for scans.
//!
//! Stage 1 ([`TextExtractor`]) reads the photo into raw text with a vision
//! model; Stage 2 ([`StructuredAnalyzer`]) turns that text into a JSON record
//! in the requested language; [`parse`] decodes the completion or degrades to
//! a fallback record.

pub mod analyze;
pub mod extract;
pub mod parse;
pub mod postprocess;
pub mod prompts;
pub mod providers;
pub mod retry;

pub use analyze::StructuredAnalyzer;
pub use extract::{ExtractionTimeouts, TextExtractor};
pub use parse::{extract_json_span, parse};
pub use postprocess::{apply_medicine_expiry, apply_prescription_order, postprocess};
pub use providers::{build_provider, ModelSettings};
pub use retry::{retry_async, RetryPolicy};
