//! Pairing token persistence
//!
//! # TokenStore
//!
//! One token per TV, keyed by the TV address. A missing or unreadable
//! entry is not an error: it just means the next connection starts with a
//! provisional token and the TV prompts for approval again.
//!
//! ## Storage Location
//!
//! `FileTokenStore` keeps one plaintext file per TV:
//!
//! - **macOS**: `~/Library/Application Support/sstc/.tv_token_<ip>`
//! - **Linux**: `~/.local/share/sstc/.tv_token_<ip>`
//! - **Windows**: `%LOCALAPPDATA%\sstc\.tv_token_<ip>`
//!
//! Single process, single writer per device: no file locking.

use crate::auth::PairingToken;
use crate::error::{CoreError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Persistent storage for pairing tokens
pub trait TokenStore: Send + Sync {
    /// Load the last confirmed token for `device_id`, if any
    fn load(&self, device_id: &str) -> Option<PairingToken>;

    /// Persist `token` for `device_id`, replacing any previous value
    fn save(&self, device_id: &str, token: &PairingToken) -> Result<()>;
}

/// Token store backed by one plaintext file per TV
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    /// Store rooted at the platform data directory (`<data_local_dir>/sstc`)
    ///
    /// The directory is created lazily on first save.
    pub fn new() -> Result<Self> {
        let dir = dirs::data_local_dir()
            .ok_or(CoreError::NoDataDir)?
            .join("sstc");
        Ok(Self { dir })
    }

    /// Store rooted at an explicit directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the token files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the token file for `device_id`
    pub fn token_path(&self, device_id: &str) -> PathBuf {
        self.dir.join(Self::file_name(device_id))
    }

    fn file_name(device_id: &str) -> String {
        let sanitized: String = device_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!(".tv_token_{}", sanitized)
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self, device_id: &str) -> Option<PairingToken> {
        let path = self.token_path(device_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("No stored token at {}: {}", path.display(), e);
                return None;
            }
        };

        match PairingToken::new(raw) {
            Ok(token) => Some(token),
            Err(_) => {
                tracing::warn!("Ignoring malformed token file {}", path.display());
                None
            }
        }
    }

    fn save(&self, device_id: &str, token: &PairingToken) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.token_path(device_id);
        fs::write(&path, token.as_str())?;

        // Token grants control of the TV: owner-only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perm = fs::metadata(&path)?.permissions();
            perm.set_mode(0o600);
            fs::set_permissions(&path, perm)?;
        }

        tracing::debug!("Saved pairing token to {}", path.display());
        Ok(())
    }
}

/// In-memory token store
///
/// Used when persistence is disabled and in tests; counts saves so callers
/// can assert that redundant writes are skipped.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, PairingToken>>,
    saves: AtomicUsize,
}

impl MemoryTokenStore {
    /// Create new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self, device_id: &str) -> Option<PairingToken> {
        self.tokens
            .lock()
            .ok()
            .and_then(|tokens| tokens.get(device_id).cloned())
    }

    fn save(&self, device_id: &str, token: &PairingToken) -> Result<()> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| CoreError::Io(std::io::Error::other("token map poisoned")))?;
        tokens.insert(device_id.to_string(), token.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Load the stored token for `device_id`, or generate a provisional one
pub fn load_or_provisional(store: &dyn TokenStore, device_id: &str) -> PairingToken {
    store.load(device_id).unwrap_or_else(|| {
        tracing::info!("No pairing token for {}, TV will ask for approval", device_id);
        PairingToken::provisional()
    })
}
