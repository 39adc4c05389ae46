//! Connection settings for the control channel and the app HTTP port

use crate::auth::PairingToken;
use crate::types::DeviceIdentity;
use crate::{APP_PORT, CONTROL_PATH, CONTROL_PORT};
use std::time::Duration;

/// Control-channel settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Port of the secure control endpoint
    pub control_port: u16,
    /// How long `connect()` waits for the handshake
    pub connect_timeout: Duration,
    /// `wss://` with certificate checks disabled when true, plain `ws://` otherwise
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            control_port: CONTROL_PORT,
            connect_timeout: Duration::from_secs(10),
            secure: true,
        }
    }
}

impl SessionConfig {
    /// Handshake URL for `device`, carrying the display name and current token
    pub fn control_url(&self, device: &DeviceIdentity, token: &PairingToken) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!(
            "{}://{}:{}{}?name={}&token={}",
            scheme,
            device.url_host(),
            self.control_port,
            CONTROL_PATH,
            urlencoding::encode(&device.encoded_name()),
            urlencoding::encode(token.as_str())
        )
    }
}

/// App-management HTTP settings
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Port of the plain-HTTP app API
    pub app_port: u16,
    /// Timeout for launch requests
    pub launch_timeout: Duration,
    /// Timeout for informational GETs
    pub info_timeout: Duration,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            app_port: APP_PORT,
            launch_timeout: Duration::from_secs(10),
            info_timeout: Duration::from_secs(3),
        }
    }
}

impl LauncherConfig {
    /// Base URL of the REST API (`http://<ip>:<port>/api/v2/`)
    pub fn api_base(&self, device: &DeviceIdentity) -> String {
        format!("http://{}:{}/api/v2/", device.url_host(), self.app_port)
    }
}
