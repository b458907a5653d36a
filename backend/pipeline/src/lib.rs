//! The scan pipeline.
//!
//! One [`ScanPipeline::run`] call takes a photographed package or
//! prescription through every stage in order:
//!
//! 1. normalize the upload
//! 2. Stage 1: vision model reads the image into text
//! 3. Stage 2: text model structures it in the requested language
//! 4. parse (or fall back) and post-process
//! 5. compose and speak the narration
//! 6. persist, when the request names an owner
//!
//! Stages run strictly in sequence and share nothing with other scans.
//! Dropping the returned future cancels any in-flight upstream call;
//! nothing is written to history before the last step.

pub mod scan;

pub use scan::{ProviderHealth, ScanOutcome, ScanPipeline};
