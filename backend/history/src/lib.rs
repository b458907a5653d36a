//! Scan history: where completed scans go, and the states a scan moves through.

pub mod lifecycle;
pub mod sqlite_store;
pub mod store;

pub use lifecycle::{ScanLifecycle, ScanState, TransitionError};
pub use sqlite_store::SqliteHistoryStore;
pub use store::{DeleteOutcome, HistoryStore, InMemoryHistoryStore, HISTORY_PAGE_LIMIT};
