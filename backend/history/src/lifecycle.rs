//! States a scan record moves through.
//!
//! ```text
//! Pending ──complete──▶ Completed ──persist──▶ Persisted ──delete──▶ Deleted
//! ```
//!
//! There is no failed state: a scan that cannot be structured still
//! completes with a fallback record, and transport errors end the request
//! before anything is completed. Deleting an already deleted record is a
//! no-op, not an error.

use std::fmt;

use sanjeevani_core::ScanId;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Pending,
    Completed,
    Persisted,
    Deleted,
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Persisted => "persisted",
            Self::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("scan {id}: cannot go from {from} to {to}")]
pub struct TransitionError {
    pub id: ScanId,
    pub from: ScanState,
    pub to: ScanState,
}

/// Tracks one scan's state.
#[derive(Debug, Clone)]
pub struct ScanLifecycle {
    id: ScanId,
    state: ScanState,
}

impl ScanLifecycle {
    pub fn new(id: ScanId) -> Self {
        Self {
            id,
            state: ScanState::Pending,
        }
    }

    /// A record read back from storage.
    pub fn persisted(id: ScanId) -> Self {
        Self {
            id,
            state: ScanState::Persisted,
        }
    }

    pub fn id(&self) -> ScanId {
        self.id
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn advance(&mut self, from: ScanState, to: ScanState) -> Result<(), TransitionError> {
        if self.state != from {
            return Err(TransitionError {
                id: self.id,
                from: self.state,
                to,
            });
        }
        debug!(scan_id = %self.id, %from, %to, "Scan state change");
        self.state = to;
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.advance(ScanState::Pending, ScanState::Completed)
    }

    pub fn persist(&mut self) -> Result<(), TransitionError> {
        self.advance(ScanState::Completed, ScanState::Persisted)
    }

    /// Idempotent: deleting twice leaves the scan `Deleted` both times.
    pub fn delete(&mut self) -> Result<(), TransitionError> {
        if self.state == ScanState::Deleted {
            return Ok(());
        }
        self.advance(ScanState::Persisted, ScanState::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn happy_path() {
        let mut lc = ScanLifecycle::new(Uuid::new_v4());
        assert_eq!(lc.state(), ScanState::Pending);
        lc.complete().unwrap();
        lc.persist().unwrap();
        lc.delete().unwrap();
        assert_eq!(lc.state(), ScanState::Deleted);
    }

    #[test]
    fn delete_is_idempotent() {
        let mut lc = ScanLifecycle::new(Uuid::new_v4());
        lc.complete().unwrap();
        lc.persist().unwrap();
        assert_eq!(lc.delete(), Ok(()));
        assert_eq!(lc.delete(), Ok(()));
        assert_eq!(lc.state(), ScanState::Deleted);
    }

    #[test]
    fn stored_record_can_be_deleted() {
        let mut lc = ScanLifecycle::persisted(Uuid::new_v4());
        lc.delete().unwrap();
        assert_eq!(lc.state(), ScanState::Deleted);
    }

    #[test]
    fn cannot_skip_states() {
        let mut lc = ScanLifecycle::new(Uuid::new_v4());
        let err = lc.persist().unwrap_err();
        assert_eq!(err.from, ScanState::Pending);
        assert_eq!(err.to, ScanState::Persisted);

        lc.complete().unwrap();
        assert!(lc.complete().is_err());
        assert!(lc.delete().is_err());
        assert_eq!(lc.state(), ScanState::Completed);
    }
}
