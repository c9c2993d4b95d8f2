//! The drop service seen from the engine's side
//!
//! The engines only need the six operations below; everything else about
//! the service (storage layout, cleanup of abandoned sessions, timeouts)
//! is its own business. Tests substitute an in-memory implementation.

use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use dferry_core::{FerryError, FerryResult};
use dferry_crypto::TransferHeader;

/// Answer to a session start: the server-assigned upload id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSession {
    pub id: String,
}

/// Answer to a finalize: the permanently stored name and the capability
/// token that allows deleting the file later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeReceipt {
    pub file: String,
    pub token: String,
}

/// Metadata for a stored file, as reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteFile {
    pub file: String,
    /// Stored size in bytes (ciphertext size for encrypted files)
    pub size: u64,
    /// Base nonce as comma-joined decimal bytes, present iff encrypted
    pub iv: Option<String>,
    /// KDF salt in the same form
    pub salt: Option<String>,
}

impl RemoteFile {
    pub fn is_encrypted(&self) -> bool {
        self.iv.is_some()
    }

    /// Reconstruct the transfer header from the echoed `iv`/`salt` fields.
    /// `None` for unencrypted files; an error if the service sent only half
    /// of the pair or unparseable values.
    pub fn header(&self) -> FerryResult<Option<TransferHeader>> {
        match (&self.iv, &self.salt) {
            (Some(iv), Some(salt)) => Ok(Some(TransferHeader::from_parts(iv, salt)?)),
            (None, None) => Ok(None),
            _ => Err(FerryError::Validation(
                "incomplete encryption metadata: iv and salt must both be present".into(),
            )),
        }
    }
}

/// Answer to a delete: the id of the file that was removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub id: String,
}

/// The remote drop API, one method per wire operation.
///
/// Engine futures are driven on the caller's own task, so implementations
/// are not required to produce `Send` futures.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Byte stream handed out by [`RemoteStore::fetch`].
    type ByteStream: Stream<Item = FerryResult<Bytes>> + Send + Unpin;

    /// `POST /api/upload/start?filename=..[&header=..]`
    async fn start_upload(&self, filename: &str, header: Option<&str>)
        -> FerryResult<UploadSession>;

    /// `POST /api/upload/{id}`: one chunk as a multipart file part. The
    /// returned future resolves only once the service has definitively
    /// accepted or rejected the chunk.
    async fn send_chunk(&self, id: &str, chunk: Vec<u8>) -> FerryResult<()>;

    /// `POST /api/upload/{id}/finalize`
    async fn finalize(&self, id: &str) -> FerryResult<FinalizeReceipt>;

    /// `GET /api/find/{file_id}`
    async fn find(&self, file_id: &str) -> FerryResult<RemoteFile>;

    /// `DELETE /api/delete/{token}`
    async fn delete(&self, token: &str) -> FerryResult<DeleteReceipt>;

    /// `GET /d/{file_id}/{filename}`: the raw stored bytes.
    async fn fetch(&self, file_id: &str, filename: &str) -> FerryResult<Self::ByteStream>;
}
