//! VAPID identity key pair for Web Push (RFC 8292).
//!
//! The gateway signs every outbound push with one long-lived P-256 ECDSA
//! key pair. It is generated once, persisted by [`crate::persistence`],
//! and shared read-only by all request handlers afterwards.

// Rust guideline compliant 2026-02

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Errors from loading, generating or persisting the identity key pair.
///
/// Every variant is fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// No key file exists at the configured path.
    #[error("VAPID key file not found at {0}")]
    NotFound(PathBuf),
    /// The key file exists but does not hold a usable key pair.
    #[error("VAPID key file {path} is corrupt: {reason}")]
    Corrupt {
        /// Location of the offending file.
        path: PathBuf,
        /// What failed to parse or validate.
        reason: String,
    },
    /// Key generation failed (entropy or curve arithmetic).
    #[error("VAPID key generation failed: {0}")]
    CryptoFailure(String),
    /// Reading or writing the key file failed.
    #[error("VAPID key file I/O failed for {path}: {source}")]
    IoFailure {
        /// Location of the file being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// VAPID keypair for web push authentication.
///
/// The private key is the raw 32-byte P-256 scalar and the public key the
/// uncompressed SEC1 point (65 bytes), both base64url without padding. This
/// is the format `web-push`'s `VapidSignatureBuilder::from_base64()` expects
/// and what browsers take as `applicationServerKey`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeys {
    /// Uncompressed public key bytes (base64url, 65 bytes decoded).
    public_key: String,
    /// Raw 32-byte P-256 private key scalar (base64url).
    private_key: String,
}

impl std::fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl VapidKeys {
    /// Generate a fresh VAPID keypair from the OS random source.
    pub fn generate() -> Result<Self, KeyError> {
        Self::generate_from(&mut OsRng)
    }

    /// Generate a keypair from `rng`.
    ///
    /// An entropy failure or an unusable scalar is a
    /// [`KeyError::CryptoFailure`], never a panic.
    fn generate_from(rng: &mut impl RngCore) -> Result<Self, KeyError> {
        let mut scalar = Zeroizing::new([0u8; 32]);
        rng.try_fill_bytes(&mut scalar[..])
            .map_err(|e| KeyError::CryptoFailure(format!("entropy source failed: {e}")))?;
        let signing_key = SigningKey::from_slice(&scalar[..])
            .map_err(|e| KeyError::CryptoFailure(format!("invalid P-256 scalar: {e}")))?;

        // SEC1 uncompressed public key (65 bytes: 0x04 || x || y)
        let public_bytes = signing_key.verifying_key().to_encoded_point(false);

        Ok(Self {
            public_key: BASE64URL.encode(public_bytes.as_bytes()),
            private_key: BASE64URL.encode(&signing_key.to_bytes()[..]),
        })
    }

    /// Reconstruct from base64url-encoded strings, validating both halves.
    ///
    /// The error string describes which half is unusable; callers wrap it
    /// into [`KeyError::Corrupt`] with the file location.
    pub fn from_base64url(public_key: &str, private_key: &str) -> Result<Self, String> {
        let pub_bytes = BASE64URL
            .decode(public_key)
            .map_err(|e| format!("invalid base64url for public key: {e}"))?;
        if pub_bytes.len() != 65 || pub_bytes[0] != 0x04 {
            return Err("public key must be a 65-byte uncompressed P-256 point".to_string());
        }

        let mut priv_bytes = BASE64URL
            .decode(private_key)
            .map_err(|e| format!("invalid base64url for private key: {e}"))?;
        if priv_bytes.len() != 32 {
            let len = priv_bytes.len();
            priv_bytes.zeroize();
            return Err(format!(
                "private key must be a 32-byte P-256 scalar, got {len} bytes"
            ));
        }
        let valid = SigningKey::from_slice(&priv_bytes);
        priv_bytes.zeroize();
        let signing_key =
            valid.map_err(|e| format!("private key is not a valid P-256 scalar: {e}"))?;

        // The halves must belong together, otherwise browsers subscribe
        // against a key the gateway cannot sign for.
        let derived = signing_key.verifying_key().to_encoded_point(false);
        if derived.as_bytes() != pub_bytes.as_slice() {
            return Err("public key does not match private key".to_string());
        }

        Ok(Self {
            public_key: public_key.to_string(),
            private_key: private_key.to_string(),
        })
    }

    /// Base64url-encoded uncompressed public key.
    ///
    /// Sent to browsers as the VAPID `applicationServerKey`.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key
    }

    /// Base64url-encoded raw 32-byte private key scalar.
    pub fn private_key_base64url(&self) -> &str {
        &self.private_key
    }

    /// Re-run validation on a freshly deserialized value.
    pub(crate) fn validated(self) -> Result<Self, String> {
        Self::from_base64url(&self.public_key, &self.private_key)
    }
}
