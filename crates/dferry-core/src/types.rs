use serde::{Deserialize, Serialize};

/// Files above this size (5 GiB) are rejected locally, before any network
/// call is made.
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Lifecycle of a single transfer (upload or download)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
    /// Created, session not yet established with the remote
    Pending,
    /// Chunks moving
    Active,
    /// All chunks acknowledged, waiting for the stored-file receipt
    Finalizing,
    Completed,
    Errored,
    Canceled,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Errored | Self::Canceled)
    }
}

/// Immutable progress snapshot, emitted after each chunk fully lands
/// (sent-and-acknowledged for uploads; decrypted-and-written for downloads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub bytes_moved: u64,
    pub total_size: u64,
}

impl ProgressEvent {
    pub fn percent(&self) -> u8 {
        if self.total_size == 0 {
            return 100;
        }
        ((self.bytes_moved as f64 / self.total_size as f64) * 100.0).round() as u8
    }
}

/// One upload or download instance. Owned exclusively by the engine call
/// driving it and dropped once a terminal state is reached.
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Server-assigned session id for uploads, source locator for downloads
    pub id: String,
    pub total_size: u64,
    /// Fixed for the lifetime of the transfer
    pub chunk_size: u64,
    pub bytes_moved: u64,
    pub state: TransferState,
}

impl Transfer {
    pub fn new(id: impl Into<String>, total_size: u64, chunk_size: u64) -> Self {
        Self {
            id: id.into(),
            total_size,
            chunk_size,
            bytes_moved: 0,
            state: TransferState::Pending,
        }
    }

    /// Advance the moved-bytes counter and return the matching snapshot.
    pub fn advance(&mut self, bytes: u64) -> ProgressEvent {
        self.bytes_moved += bytes;
        self.snapshot()
    }

    pub fn snapshot(&self) -> ProgressEvent {
        ProgressEvent {
            bytes_moved: self.bytes_moved,
            total_size: self.total_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic() {
        let mut t = Transfer::new("abc", 100, 10);
        assert_eq!(t.advance(10).bytes_moved, 10);
        assert_eq!(t.advance(10).bytes_moved, 20);
        assert_eq!(t.snapshot().total_size, 100);
    }

    #[test]
    fn test_percent_rounding() {
        let ev = ProgressEvent { bytes_moved: 1, total_size: 3 };
        assert_eq!(ev.percent(), 33);
        let ev = ProgressEvent { bytes_moved: 2, total_size: 3 };
        assert_eq!(ev.percent(), 67);
        let ev = ProgressEvent { bytes_moved: 0, total_size: 0 };
        assert_eq!(ev.percent(), 100);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Completed.is_terminal());
        assert!(TransferState::Errored.is_terminal());
        assert!(TransferState::Canceled.is_terminal());
        assert!(!TransferState::Active.is_terminal());
        assert!(!TransferState::Finalizing.is_terminal());
    }

    #[test]
    fn test_max_file_size_is_five_gib() {
        assert_eq!(MAX_FILE_SIZE, 5_368_709_120);
    }
}
