//! dferry-crypto: client-side encryption for dropferry transfers
//!
//! Pipeline: plaintext chunk → AES-256-GCM seal → upload; the paired
//! download re-slices the ciphertext stream and opens each slice.
//!
//! Key material per transfer:
//! ```text
//! Transfer Key (256-bit, PBKDF2-HMAC-SHA256 from password + 16-byte salt)
//!   └── Chunk AEAD: AES-256-GCM
//!         nonce = base_nonce XOR be64(chunk_index)   (base: 96-bit random, once per transfer)
//!         tag   = 128-bit, appended to the ciphertext
//! ```
//!
//! The base nonce and salt travel to the service in the upload `header`
//! query parameter (comma-joined decimal bytes, dot-separated pair) and are
//! echoed back in the download metadata, so the same password reproduces
//! the same key on the receiving side. Neither is secret; the password is.

pub mod cipher;
pub mod context;
pub mod header;
pub mod kdf;

pub use cipher::{chunk_nonce, open_chunk, seal_chunk};
pub use context::EncryptionContext;
pub use header::TransferHeader;
pub use kdf::{derive_key, TransferKey};

/// Size of a derived transfer key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of the salt fed to the KDF
pub const SALT_SIZE: usize = 16;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
