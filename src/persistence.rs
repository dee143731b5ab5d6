//! VAPID key persistence.
//!
//! The key file is the single source of truth for the gateway's push
//! identity. It is plain JSON so operators can copy it between hosts:
//!
//! ```json
//! { "publicKey": "<base64url>", "privateKey": "<base64url>" }
//! ```
//!
//! Writes go through a temporary file in the same directory followed by a
//! rename, so a crash mid-write leaves either the old file or the new one.
//!
//! Rust guideline compliant 2026-02

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::notifications::vapid::{KeyError, VapidKeys};

/// Load VAPID keys from `path`.
///
/// Returns [`KeyError::NotFound`] if the file does not exist so the caller
/// can decide to generate. Anything unreadable or unparsable is
/// [`KeyError::Corrupt`].
pub fn load_vapid_keys(path: &Path) -> Result<VapidKeys, KeyError> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(KeyError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(KeyError::IoFailure {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let corrupt = |reason: String| KeyError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let keys: VapidKeys = serde_json::from_slice(&content).map_err(|e| corrupt(e.to_string()))?;
    let keys = keys.validated().map_err(corrupt)?;

    log::info!("Loaded VAPID keys from {}", path.display());
    Ok(keys)
}

/// Save VAPID keys to `path` atomically.
///
/// Parent directories are created if missing. On Unix the file is `0600`.
pub fn save_vapid_keys(keys: &VapidKeys, path: &Path) -> Result<(), KeyError> {
    let io_failure = |source: std::io::Error| KeyError::IoFailure {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(io_failure)?;

    let content = serde_json::to_vec_pretty(keys).map_err(|e| io_failure(e.into()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_failure)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(tmp.path(), perms).map_err(io_failure)?;
    }

    tmp.write_all(&content).map_err(io_failure)?;
    tmp.as_file().sync_all().map_err(io_failure)?;
    tmp.persist(path).map_err(|e| io_failure(e.error))?;

    log::debug!("Saved VAPID keys to {:?}", path);
    Ok(())
}

/// Startup contract: load the key pair, generating and persisting one only
/// when no file exists yet.
///
/// A corrupt or unreadable file is returned as an error rather than
/// overwritten. Replacing the key would make push services reject every
/// subscription created against the old one.
pub fn load_or_generate_vapid_keys(path: &Path) -> Result<VapidKeys, KeyError> {
    match load_vapid_keys(path) {
        Ok(keys) => Ok(keys),
        Err(KeyError::NotFound(_)) => {
            let keys = VapidKeys::generate()?;
            save_vapid_keys(&keys, path)?;
            log::warn!(
                "Generated new VAPID keys at {} (subscriptions made under any previous key will be rejected by push services)",
                path.display()
            );
            Ok(keys)
        }
        Err(e) => Err(e),
    }
}
