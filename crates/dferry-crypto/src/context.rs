//! Per-transfer encryption state
//!
//! Created when a transfer starts with encryption requested, dropped with
//! the transfer; never persisted. The key handle zeroizes itself on drop.

use secrecy::SecretString;

use dferry_core::FerryResult;

use crate::cipher::{open_chunk, seal_chunk};
use crate::header::TransferHeader;
use crate::kdf::{derive_key, TransferKey};

pub struct EncryptionContext {
    key: TransferKey,
    header: TransferHeader,
}

impl EncryptionContext {
    /// Context for a new upload: fresh random nonce/salt, key derived from
    /// the password.
    pub fn for_upload(password: &SecretString, kdf_iterations: u32) -> FerryResult<Self> {
        let header = TransferHeader::generate();
        let key = derive_key(password, &header.salt, kdf_iterations)?;
        Ok(Self { key, header })
    }

    /// Context for a download: nonce/salt echoed back by the service, key
    /// re-derived from the password the user supplies.
    pub fn for_download(
        password: &SecretString,
        header: TransferHeader,
        kdf_iterations: u32,
    ) -> FerryResult<Self> {
        let key = derive_key(password, &header.salt, kdf_iterations)?;
        Ok(Self { key, header })
    }

    pub fn header(&self) -> &TransferHeader {
        &self.header
    }

    pub fn seal(&self, chunk_index: u64, plaintext: &[u8]) -> FerryResult<Vec<u8>> {
        seal_chunk(&self.key, &self.header.nonce, chunk_index, plaintext)
    }

    pub fn open(&self, chunk_index: u64, ciphertext: &[u8]) -> FerryResult<Vec<u8>> {
        open_chunk(&self.key, &self.header.nonce, chunk_index, ciphertext)
    }
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("key", &self.key)
            .field("nonce", &self.header.nonce)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dferry_core::FerryError;

    const TEST_ITERATIONS: u32 = 1000;

    #[test]
    fn test_upload_download_pairing() {
        let password = SecretString::from("hunter2");
        let up = EncryptionContext::for_upload(&password, TEST_ITERATIONS).unwrap();

        let sealed0 = up.seal(0, b"first chunk").unwrap();
        let sealed1 = up.seal(1, b"second chunk").unwrap();

        // Download side reconstructs the context from the echoed header
        let echoed = TransferHeader::decode(&up.header().encode()).unwrap();
        let down = EncryptionContext::for_download(&password, echoed, TEST_ITERATIONS).unwrap();

        assert_eq!(down.open(0, &sealed0).unwrap(), b"first chunk");
        assert_eq!(down.open(1, &sealed1).unwrap(), b"second chunk");
    }

    #[test]
    fn test_wrong_password_fails_on_open_not_derive() {
        let up = EncryptionContext::for_upload(&SecretString::from("right"), TEST_ITERATIONS).unwrap();
        let sealed = up.seal(0, b"payload").unwrap();

        // Deriving with the wrong password succeeds...
        let down = EncryptionContext::for_download(
            &SecretString::from("wrong"),
            up.header().clone(),
            TEST_ITERATIONS,
        )
        .unwrap();

        // ...and only decryption reports the mismatch.
        assert!(matches!(
            down.open(0, &sealed),
            Err(FerryError::Authentication(_))
        ));
    }

    #[test]
    fn test_distinct_uploads_get_distinct_headers() {
        let password = SecretString::from("pw");
        let a = EncryptionContext::for_upload(&password, TEST_ITERATIONS).unwrap();
        let b = EncryptionContext::for_upload(&password, TEST_ITERATIONS).unwrap();
        assert_ne!(a.header(), b.header());
    }
}
