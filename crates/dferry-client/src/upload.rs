//! Upload engine: session start → sequential chunk sends → finalize
//!
//! One chunk in flight: the next byte range is not read until the service
//! has definitively answered for the previous one. The first rejected chunk
//! ends the transfer; there is no retry and no resume, so a new transfer
//! starts over from index 0. A transport failure also leaves the partial
//! session on the service untouched; reaping abandoned sessions is its job.

use secrecy::SecretString;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dferry_core::{FerryError, FerryResult, Transfer, TransferState, MAX_FILE_SIZE};
use dferry_crypto::EncryptionContext;

use crate::planner::plan_chunk_size;
use crate::remote::RemoteStore;
use crate::ProgressFn;

pub struct UploadRequest {
    pub filename: String,
    /// Size of the source in bytes; also drives chunk planning
    pub total_size: u64,
    /// Encrypt when present; the salt/nonce pair is minted here and sent
    /// along in the session start
    pub password: Option<SecretString>,
    pub kdf_iterations: u32,
}

#[derive(Debug, Clone)]
pub struct UploadReceipt {
    /// Permanently stored file name (addressable as `/d/{file}`)
    pub file: String,
    /// Capability token for deleting the upload later
    pub token: String,
    pub chunks: u64,
    pub bytes_sent: u64,
}

#[derive(Debug)]
pub enum UploadOutcome {
    Completed(UploadReceipt),
    /// Cancellation observed at a suspension point; no remote cleanup is
    /// attempted for chunks already accepted
    Canceled,
}

/// Drive one upload to a terminal state.
///
/// `source` must yield exactly `request.total_size` bytes. Progress is
/// reported once per acknowledged chunk; the final event carries
/// `bytes_moved == total_size`.
pub async fn upload_file<R, S>(
    store: &R,
    source: &mut S,
    request: UploadRequest,
    progress: Option<&ProgressFn>,
    cancel: &CancellationToken,
) -> FerryResult<UploadOutcome>
where
    R: RemoteStore,
    S: AsyncRead + Unpin,
{
    // Checked before any network interaction
    if request.total_size > MAX_FILE_SIZE {
        return Err(FerryError::Validation(format!(
            "file too large: {} bytes (limit {MAX_FILE_SIZE})",
            request.total_size
        )));
    }

    // A cancellation that lands before the session opens never touches the API
    if cancel.is_cancelled() {
        return Ok(UploadOutcome::Canceled);
    }

    let ctx = match &request.password {
        Some(password) => Some(EncryptionContext::for_upload(
            password,
            request.kdf_iterations,
        )?),
        None => None,
    };
    let header = ctx.as_ref().map(|c| c.header().encode());

    let chunk_size = plan_chunk_size(request.total_size);
    let session = store
        .start_upload(&request.filename, header.as_deref())
        .await?;

    let mut transfer = Transfer::new(session.id, request.total_size, chunk_size);
    transfer.state = TransferState::Active;
    debug!(
        id = %transfer.id,
        filename = %request.filename,
        total = transfer.total_size,
        chunk_size,
        encrypted = ctx.is_some(),
        "upload session started"
    );

    let mut offset = 0u64;
    let mut index = 0u64;
    while offset < request.total_size {
        if cancel.is_cancelled() {
            transfer.state = TransferState::Canceled;
            debug!(id = %transfer.id, chunk = index, "upload canceled");
            return Ok(UploadOutcome::Canceled);
        }

        let len = chunk_size.min(request.total_size - offset) as usize;
        let mut buf = vec![0u8; len];
        source.read_exact(&mut buf).await?;

        let payload = match &ctx {
            Some(ctx) => ctx.seal(index, &buf)?,
            None => buf,
        };

        if let Err(err) = store.send_chunk(&transfer.id, payload).await {
            transfer.state = TransferState::Errored;
            warn!(id = %transfer.id, chunk = index, error = %err, "chunk rejected, stopping upload");
            return Err(err);
        }

        offset += len as u64;
        index += 1;
        let event = transfer.advance(len as u64);
        if let Some(cb) = progress {
            cb(event);
        }
    }

    transfer.state = TransferState::Finalizing;
    let receipt = match store.finalize(&transfer.id).await {
        Ok(receipt) => receipt,
        Err(err) => {
            transfer.state = TransferState::Errored;
            return Err(err);
        }
    };
    transfer.state = TransferState::Completed;

    info!(
        id = %transfer.id,
        file = %receipt.file,
        chunks = index,
        bytes = transfer.bytes_moved,
        "uploaded"
    );

    Ok(UploadOutcome::Completed(UploadReceipt {
        file: receipt.file,
        token: receipt.token,
        chunks: index,
        bytes_sent: transfer.bytes_moved,
    }))
}
