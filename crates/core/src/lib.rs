//! sstc core - Samsung Smart TV remote-control protocol layer
//!
//! This crate provides:
//! - Pairing tokens and their per-TV persistence
//! - Key and app catalogs
//! - Wire types and the JSON codec for the control channel
//! - The control-channel session (handshake, key dispatch)
//! - The app launcher for the TV's HTTP API

/// Port of the secure WebSocket control endpoint
pub const CONTROL_PORT: u16 = 8002;
/// Port of the plain-HTTP app API
pub const APP_PORT: u16 = 8001;
/// Path of the remote-control channel
pub const CONTROL_PATH: &str = "/api/v2/channels/samsung.remote.control";

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod launcher;
pub mod protocol;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

// Re-export common types
pub use auth::PairingToken;
pub use catalog::{AppCatalog, AppTarget, KeyCatalog};
pub use config::{LauncherConfig, SessionConfig};
pub use error::{CoreError, Result};
pub use launcher::AppLauncher;
pub use protocol::MessageCodec;
pub use session::{CloseReason, Session, SessionState};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::{DeviceIdentity, RemoteCommand, SystemInfo, DEFAULT_DISPLAY_NAME};
