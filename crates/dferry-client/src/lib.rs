//! dferry-client: the chunked transfer engine
//!
//! Pipeline (upload): slice file into planned chunks → optional AES-GCM seal
//! → one multipart request per chunk, strictly in order → finalize for the
//! stored name + access token.
//!
//! Pipeline (download): stream the stored bytes → re-slice at chunk
//! boundaries (+16 bytes per slice when decrypting) → optional open → sink.
//!
//! One chunk is in flight at a time per transfer; the definitive response
//! for chunk N is awaited before chunk N+1 is read. That keeps the moved
//! byte counter monotonic and avoids flooding the service. Independent
//! transfers share no state.

pub mod api;
pub mod download;
pub mod planner;
pub mod remote;
pub mod upload;

pub use api::ApiClient;
pub use download::{download_file, DownloadOutcome, DownloadRequest};
pub use planner::plan_chunk_size;
pub use remote::{DeleteReceipt, FinalizeReceipt, RemoteFile, RemoteStore, UploadSession};
pub use upload::{upload_file, UploadOutcome, UploadReceipt, UploadRequest};

use dferry_core::ProgressEvent;

/// Progress callback, invoked with a fresh snapshot after each chunk lands.
pub type ProgressFn = Box<dyn Fn(ProgressEvent) + Send + Sync>;
