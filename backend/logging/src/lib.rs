//! Structured logging for the Sanjeevani service.
//!
//! Console output, optional daily-rotated NDJSON files, and redaction of
//! credentials and phone numbers before they reach a log line.

pub mod logger;
pub mod redact;

pub use logger::{init_logger, LogGuard};
pub use redact::{redact_sensitive_data, truncate_for_log};
