use serde::{Deserialize, Serialize};

/// Client configuration (loaded from dferry.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    pub remote: RemoteConfig,
    pub crypto: CryptoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the drop service
    pub base_url: String,
}

/// Client-side encryption settings. `enabled` is the persisted toggle the
/// `encryption` command flips; it gates whether uploads offer encryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Offer password-derived encryption for new uploads (default: false)
    pub enabled: bool,
    /// PBKDF2-HMAC-SHA256 iteration count (default: 100000)
    pub kdf_iterations: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kdf_iterations: 100_000,
        }
    }
}
