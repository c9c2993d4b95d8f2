//! Download engine: streaming fetch → re-chunk → optional decrypt → sink
//!
//! Network fragments arrive at whatever granularity the transport picks, so
//! the engine keeps one growing buffer and slices it back into the chunk
//! boundaries the uploader used. For encrypted files each stored slice is
//! chunk_size + 16 bytes (the GCM tag), and the slice must authenticate as
//! a whole before any of it reaches the sink.

use bytes::BytesMut;
use futures::StreamExt;
use secrecy::SecretString;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use dferry_core::{FerryError, FerryResult, Transfer, TransferState};
use dferry_crypto::{EncryptionContext, TransferHeader, TAG_SIZE};

use crate::planner::plan_chunk_size;
use crate::remote::RemoteStore;
use crate::ProgressFn;

pub struct DownloadRequest {
    pub file_id: String,
    /// Stored file name (part of the fetch URL and the default sink name)
    pub filename: String,
    /// Stored size as reported by the service; drives chunk planning
    pub total_size: u64,
    /// Echoed nonce/salt pair, present iff the file is encrypted
    pub header: Option<TransferHeader>,
    pub password: Option<SecretString>,
    pub kdf_iterations: u32,
}

#[derive(Debug)]
pub enum DownloadOutcome {
    Completed { bytes_written: u64 },
    /// Cancellation observed at a suspension point; the sink is left
    /// unfinished
    Canceled,
}

/// Drive one download to a terminal state, writing plaintext to `sink`.
///
/// The sink is flushed and shut down only on success. An authentication
/// failure aborts immediately: buffered-but-unwritten data is discarded and
/// the sink never reaches a cleanly-closed state.
pub async fn download_file<R, W>(
    store: &R,
    sink: &mut W,
    request: DownloadRequest,
    progress: Option<&ProgressFn>,
    cancel: &CancellationToken,
) -> FerryResult<DownloadOutcome>
where
    R: RemoteStore,
    W: AsyncWrite + Unpin,
{
    let chunk_size = plan_chunk_size(request.total_size);

    let ctx = match (&request.header, &request.password) {
        (Some(header), Some(password)) => Some(EncryptionContext::for_download(
            password,
            header.clone(),
            request.kdf_iterations,
        )?),
        (Some(_), None) => {
            return Err(FerryError::Validation(
                "file is encrypted: a password is required".into(),
            ))
        }
        (None, _) => None,
    };

    // Stored slices carry one 16-byte tag each when encrypted; widening the
    // slice keeps the decrypted output on plaintext chunk boundaries.
    let slice_size = match ctx {
        Some(_) => chunk_size + TAG_SIZE as u64,
        None => chunk_size,
    };
    let plain_total = match ctx {
        Some(_) => {
            let slices = request.total_size.div_ceil(slice_size);
            request.total_size.saturating_sub(TAG_SIZE as u64 * slices)
        }
        None => request.total_size,
    };

    let mut stream = store.fetch(&request.file_id, &request.filename).await?;

    let mut transfer = Transfer::new(request.file_id, plain_total, chunk_size);
    transfer.state = TransferState::Active;
    debug!(
        id = %transfer.id,
        stored = request.total_size,
        expected = plain_total,
        chunk_size,
        encrypted = ctx.is_some(),
        "download started"
    );

    let mut buffer = BytesMut::new();
    let mut index = 0u64;

    while let Some(fragment) = stream.next().await {
        if cancel.is_cancelled() {
            transfer.state = TransferState::Canceled;
            debug!(id = %transfer.id, chunk = index, "download canceled");
            return Ok(DownloadOutcome::Canceled);
        }

        let fragment = match fragment {
            Ok(bytes) => bytes,
            Err(err) => {
                transfer.state = TransferState::Errored;
                return Err(err);
            }
        };
        buffer.extend_from_slice(&fragment);

        while buffer.len() as u64 > slice_size {
            let slice = buffer.split_to(slice_size as usize);
            write_slice(sink, &ctx, index, &slice, &mut transfer, progress).await?;
            index += 1;
        }
    }

    // Final, possibly undersized slice
    if !buffer.is_empty() {
        let slice = buffer.split();
        write_slice(sink, &ctx, index, &slice, &mut transfer, progress).await?;
        index += 1;
    }

    sink.flush().await?;
    sink.shutdown().await?;
    transfer.state = TransferState::Completed;

    if transfer.bytes_moved != transfer.total_size {
        warn!(
            id = %transfer.id,
            written = transfer.bytes_moved,
            expected = transfer.total_size,
            "completed download does not match the declared size"
        );
    }
    info!(
        id = %transfer.id,
        chunks = index,
        bytes = transfer.bytes_moved,
        "downloaded"
    );

    Ok(DownloadOutcome::Completed {
        bytes_written: transfer.bytes_moved,
    })
}

/// Decrypt (when a context is present) and write one slice, advancing the
/// moved counter by the plaintext length that reached the sink.
async fn write_slice<W>(
    sink: &mut W,
    ctx: &Option<EncryptionContext>,
    index: u64,
    slice: &[u8],
    transfer: &mut Transfer,
    progress: Option<&ProgressFn>,
) -> FerryResult<()>
where
    W: AsyncWrite + Unpin,
{
    let written = match ctx {
        Some(ctx) => {
            let plain = match ctx.open(index, slice) {
                Ok(plain) => plain,
                Err(err) => {
                    transfer.state = TransferState::Errored;
                    return Err(err);
                }
            };
            sink.write_all(&plain).await?;
            plain.len() as u64
        }
        None => {
            sink.write_all(slice).await?;
            slice.len() as u64
        }
    };

    let event = transfer.advance(written);
    if let Some(cb) = progress {
        cb(event);
    }
    Ok(())
}
