//! Per-chunk AES-256-GCM encryption/decryption
//!
//! Encrypted chunk format (binary):
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! nonce = base_nonce XOR be64(chunk_index), folded into the trailing 8 bytes
//! ```
//!
//! The nonce is not carried alongside each chunk; both sides reconstruct it
//! from the transfer's base nonce and the chunk's zero-based index. Folding
//! the index in keeps every AEAD call within a transfer on a distinct nonce.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};

use dferry_core::{FerryError, FerryResult};

use crate::kdf::TransferKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// Nonce for one chunk: the transfer's base nonce with the big-endian chunk
/// index XOR-ed into its trailing 8 bytes.
pub fn chunk_nonce(base: &[u8; NONCE_SIZE], chunk_index: u64) -> [u8; NONCE_SIZE] {
    let mut nonce = *base;
    for (n, c) in nonce[NONCE_SIZE - 8..].iter_mut().zip(chunk_index.to_be_bytes()) {
        *n ^= c;
    }
    nonce
}

/// Encrypt a single chunk.
///
/// Returns `[ciphertext][16-byte tag]`.
pub fn seal_chunk(
    key: &TransferKey,
    base_nonce: &[u8; NONCE_SIZE],
    chunk_index: u64,
    plaintext: &[u8],
) -> FerryResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce_bytes = chunk_nonce(base_nonce, chunk_index);
    let nonce = Nonce::from_slice(&nonce_bytes);

    cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| FerryError::Other(anyhow::anyhow!("chunk {chunk_index}: encryption failed")))
}

/// Decrypt a single chunk (`[ciphertext][16-byte tag]`).
///
/// A tag mismatch means a wrong password or corrupted data; the two are not
/// distinguishable and surface as one authentication error.
pub fn open_chunk(
    key: &TransferKey,
    base_nonce: &[u8; NONCE_SIZE],
    chunk_index: u64,
    ciphertext: &[u8],
) -> FerryResult<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(FerryError::Authentication(format!(
            "chunk {chunk_index}: ciphertext too short ({} bytes, minimum {TAG_SIZE})",
            ciphertext.len()
        )));
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce_bytes = chunk_nonce(base_nonce, chunk_index);
    let nonce = Nonce::from_slice(&nonce_bytes);

    cipher.decrypt(nonce, ciphertext).map_err(|_| {
        FerryError::Authentication(format!(
            "chunk {chunk_index}: tag mismatch (wrong password or corrupted data)"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KEY_SIZE;
    use proptest::prelude::*;

    fn test_key() -> TransferKey {
        TransferKey::from_bytes([7u8; KEY_SIZE])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = test_key();
        let base = [0xA1u8; NONCE_SIZE];
        let plaintext = b"hello, encrypted world!";

        let sealed = seal_chunk(&key, &base, 0, plaintext).unwrap();
        let opened = open_chunk(&key, &base, 0, &sealed).unwrap();

        assert_eq!(&opened, plaintext);
    }

    #[test]
    fn test_seal_open_empty() {
        let key = test_key();
        let base = [0u8; NONCE_SIZE];

        let sealed = seal_chunk(&key, &base, 0, b"").unwrap();
        let opened = open_chunk(&key, &base, 0, &sealed).unwrap();

        assert_eq!(opened, b"");
    }

    #[test]
    fn test_sealed_size() {
        let key = test_key();
        let base = [0u8; NONCE_SIZE];
        let plaintext = vec![0u8; 1000];

        let sealed = seal_chunk(&key, &base, 0, &plaintext).unwrap();

        // plaintext (1000) + tag (16)
        assert_eq!(sealed.len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn test_open_wrong_key_fails() {
        let base = [3u8; NONCE_SIZE];
        let sealed = seal_chunk(&test_key(), &base, 0, b"secret data").unwrap();

        let other = TransferKey::from_bytes([8u8; KEY_SIZE]);
        let result = open_chunk(&other, &base, 0, &sealed);

        assert!(matches!(result, Err(FerryError::Authentication(_))));
    }

    #[test]
    fn test_open_wrong_index_fails() {
        let key = test_key();
        let base = [3u8; NONCE_SIZE];
        let sealed = seal_chunk(&key, &base, 0, b"secret data").unwrap();

        let result = open_chunk(&key, &base, 1, &sealed);

        assert!(
            matches!(result, Err(FerryError::Authentication(_))),
            "wrong chunk index must fail (nonce mismatch)"
        );
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = test_key();
        let base = [3u8; NONCE_SIZE];

        let mut sealed = seal_chunk(&key, &base, 0, b"secret data").unwrap();
        sealed[4] ^= 0xFF;

        let result = open_chunk(&key, &base, 0, &sealed);
        assert!(matches!(result, Err(FerryError::Authentication(_))));
    }

    #[test]
    fn test_truncated_ciphertext_fails() {
        let key = test_key();
        let base = [3u8; NONCE_SIZE];

        let result = open_chunk(&key, &base, 0, &[0u8; TAG_SIZE - 1]);
        assert!(matches!(result, Err(FerryError::Authentication(_))));
    }

    #[test]
    fn test_chunk_nonce_distinct_per_index() {
        let base = [0x55u8; NONCE_SIZE];
        let n0 = chunk_nonce(&base, 0);
        let n1 = chunk_nonce(&base, 1);
        let n2 = chunk_nonce(&base, 2);

        assert_eq!(n0, base, "index 0 keeps the base nonce");
        assert_ne!(n0, n1);
        assert_ne!(n1, n2);
        assert_ne!(n0, n2);
        // The leading 4 bytes never change
        assert_eq!(&n1[..4], &base[..4]);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_any_payload(data in proptest::collection::vec(any::<u8>(), 0..2048), index in any::<u64>()) {
            let key = test_key();
            let base = [0x42u8; NONCE_SIZE];

            let sealed = seal_chunk(&key, &base, index, &data).unwrap();
            let opened = open_chunk(&key, &base, index, &sealed).unwrap();

            prop_assert_eq!(opened, data);
        }

        #[test]
        fn prop_nonce_derivation_is_involutive(index in any::<u64>()) {
            let base = [0x10u8; NONCE_SIZE];
            let derived = chunk_nonce(&base, index);
            // XOR-ing the same index back recovers the base nonce
            prop_assert_eq!(chunk_nonce(&derived, index), base);
        }
    }
}
