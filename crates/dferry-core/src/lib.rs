pub mod config;
pub mod error;
pub mod types;

pub use error::{FerryError, FerryResult};
pub use types::{ProgressEvent, Transfer, TransferState, MAX_FILE_SIZE};
