//! Key derivation: PBKDF2-HMAC-SHA256 password → transfer key

use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroize;

use dferry_core::{FerryError, FerryResult};

use crate::{KEY_SIZE, SALT_SIZE};

/// A 256-bit key derived from a password via PBKDF2-HMAC-SHA256.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct TransferKey {
    bytes: [u8; KEY_SIZE],
}

impl TransferKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for TransferKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for TransferKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive a 256-bit transfer key from a password and 16-byte salt.
///
/// Deterministic given identical inputs, which is what lets the download
/// side reproduce the upload key from the echoed salt. Fails only on
/// malformed inputs; a wrong password derives cleanly and fails later with
/// an authentication error during decryption.
pub fn derive_key(
    password: &SecretString,
    salt: &[u8],
    iterations: u32,
) -> FerryResult<TransferKey> {
    if password.expose_secret().is_empty() {
        return Err(FerryError::KeyDerivation("empty password".into()));
    }
    if salt.len() != SALT_SIZE {
        return Err(FerryError::KeyDerivation(format!(
            "salt must be {SALT_SIZE} bytes, got {}",
            salt.len()
        )));
    }
    if iterations == 0 {
        return Err(FerryError::KeyDerivation(
            "iteration count must be non-zero".into(),
        ));
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.expose_secret().as_bytes(), salt, iterations, &mut key);

    Ok(TransferKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Full-strength PBKDF2 is slow in debug builds; the derivation is
    // iteration-count-agnostic, so tests use a small count.
    const TEST_ITERATIONS: u32 = 1000;

    #[test]
    fn test_kdf_deterministic() {
        let password = SecretString::from("test-password-123");
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_key(&password, &salt, TEST_ITERATIONS).unwrap();
        let key2 = derive_key(&password, &salt, TEST_ITERATIONS).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passwords() {
        let salt = [1u8; SALT_SIZE];

        let key1 = derive_key(&SecretString::from("password-a"), &salt, TEST_ITERATIONS).unwrap();
        let key2 = derive_key(&SecretString::from("password-b"), &salt, TEST_ITERATIONS).unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different passwords must produce different keys"
        );
    }

    #[test]
    fn test_kdf_different_salts() {
        let password = SecretString::from("same-password");

        let key1 = derive_key(&password, &[1u8; SALT_SIZE], TEST_ITERATIONS).unwrap();
        let key2 = derive_key(&password, &[2u8; SALT_SIZE], TEST_ITERATIONS).unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different salts must produce different keys"
        );
    }

    #[test]
    fn test_kdf_rejects_empty_password() {
        let result = derive_key(&SecretString::from(""), &[1u8; SALT_SIZE], TEST_ITERATIONS);
        assert!(matches!(result, Err(FerryError::KeyDerivation(_))));
    }

    #[test]
    fn test_kdf_rejects_bad_salt_length() {
        let password = SecretString::from("pw");
        assert!(matches!(
            derive_key(&password, &[], TEST_ITERATIONS),
            Err(FerryError::KeyDerivation(_))
        ));
        assert!(matches!(
            derive_key(&password, &[0u8; 8], TEST_ITERATIONS),
            Err(FerryError::KeyDerivation(_))
        ));
    }

    #[test]
    fn test_kdf_rejects_zero_iterations() {
        let result = derive_key(&SecretString::from("pw"), &[1u8; SALT_SIZE], 0);
        assert!(matches!(result, Err(FerryError::KeyDerivation(_))));
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let key = TransferKey::from_bytes([0x41; KEY_SIZE]);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("65"));
    }
}
