//! Wire codec for the per-transfer nonce/salt pair
//!
//! The service carries both values as comma-joined decimal bytes: the
//! upload start request packs them into one `header` query parameter as
//! `<nonce-csv>.<salt-csv>`, and the download metadata echoes them back as
//! separate `iv` and `salt` fields in the same CSV form.

use rand::{rngs::OsRng, RngCore};

use dferry_core::{FerryError, FerryResult};

use crate::{NONCE_SIZE, SALT_SIZE};

/// The non-secret encryption parameters of one transfer: a 96-bit base
/// nonce and a 128-bit KDF salt, both generated once per upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHeader {
    pub nonce: [u8; NONCE_SIZE],
    pub salt: [u8; SALT_SIZE],
}

impl TransferHeader {
    /// Fresh random nonce and salt for a new upload.
    pub fn generate() -> Self {
        let mut nonce = [0u8; NONCE_SIZE];
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut nonce);
        OsRng.fill_bytes(&mut salt);
        Self { nonce, salt }
    }

    /// Render as the `header` query parameter: `<nonce-csv>.<salt-csv>`.
    pub fn encode(&self) -> String {
        format!("{}.{}", join_csv(&self.nonce), join_csv(&self.salt))
    }

    /// Parse the `header` query parameter form.
    pub fn decode(s: &str) -> FerryResult<Self> {
        let (nonce_csv, salt_csv) = s.split_once('.').ok_or_else(|| {
            FerryError::Validation("malformed encryption header: missing '.' separator".into())
        })?;
        Self::from_parts(nonce_csv, salt_csv)
    }

    /// Reconstruct from the download metadata's separate `iv`/`salt` fields.
    pub fn from_parts(nonce_csv: &str, salt_csv: &str) -> FerryResult<Self> {
        let nonce_bytes = parse_csv(nonce_csv, NONCE_SIZE)?;
        let salt_bytes = parse_csv(salt_csv, SALT_SIZE)?;

        let mut nonce = [0u8; NONCE_SIZE];
        let mut salt = [0u8; SALT_SIZE];
        nonce.copy_from_slice(&nonce_bytes);
        salt.copy_from_slice(&salt_bytes);
        Ok(Self { nonce, salt })
    }
}

fn join_csv(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn parse_csv(s: &str, expected_len: usize) -> FerryResult<Vec<u8>> {
    let bytes: Vec<u8> = s
        .split(',')
        .map(|part| {
            part.trim().parse::<u8>().map_err(|_| {
                FerryError::Validation(format!(
                    "malformed encryption header: '{part}' is not a byte value"
                ))
            })
        })
        .collect::<FerryResult<_>>()?;

    if bytes.len() != expected_len {
        return Err(FerryError::Validation(format!(
            "malformed encryption header: expected {expected_len} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}
