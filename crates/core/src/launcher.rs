//! One-shot HTTP calls to the TV's app API
//!
//! Separate from the control channel: the TV serves app management over
//! plain, unauthenticated HTTP. Every call is best-effort and collapses
//! failures into `false` / `None`; the reason only reaches the debug log.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::{AppCatalog, AppTarget};
use crate::config::LauncherConfig;
use crate::types::{AppStatus, DeviceIdentity, SystemInfo};
use crate::{CoreError, Result};

/// Stateless client for `/api/v2/` on the app port
#[derive(Debug, Clone)]
pub struct AppLauncher {
    client: Client,
    base: String,
    config: LauncherConfig,
}

impl AppLauncher {
    pub fn new(device: &DeviceIdentity, config: LauncherConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| CoreError::Connection(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            client,
            base: config.api_base(device),
            config,
        })
    }

    fn app_url(&self, app_id: &str) -> String {
        format!("{}applications/{}", self.base, app_id)
    }

    /// Start an application; true iff the TV answered 200
    pub async fn launch(&self, app_id: &str) -> bool {
        let result = self
            .client
            .post(self.app_url(app_id))
            .timeout(self.config.launch_timeout)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status() == StatusCode::OK => {
                info!("Launched app {}", app_id);
                true
            }
            Ok(resp) => {
                debug!("Launch of {} answered {}", app_id, resp.status());
                false
            }
            Err(e) => {
                debug!("Launch of {} failed: {}", app_id, e);
                false
            }
        }
    }

    /// Resolve operator input through `apps` and launch the result
    ///
    /// Unrecognized short names fail before any request is made.
    pub async fn launch_named(&self, apps: &AppCatalog, input: &str) -> Result<(AppTarget, bool)> {
        let target = apps.resolve(input)?;
        let launched = self.launch(target.id()).await;
        Ok((target, launched))
    }

    /// Running/visible state of an application
    pub async fn app_status(&self, app_id: &str) -> Option<AppStatus> {
        self.get_json(&self.app_url(app_id)).await
    }

    /// Device information document; display only
    pub async fn system_info(&self) -> Option<SystemInfo> {
        self.get_json(&self.base).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
        let resp = self
            .client
            .get(url)
            .timeout(self.info_timeout())
            .send()
            .await
            .map_err(|e| debug!("GET {} failed: {}", url, e))
            .ok()?;

        if !resp.status().is_success() {
            debug!("GET {} answered {}", url, resp.status());
            return None;
        }

        resp.json::<T>()
            .await
            .map_err(|e| debug!("GET {} returned unexpected body: {}", url, e))
            .ok()
    }

    fn info_timeout(&self) -> Duration {
        self.config.info_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let device = DeviceIdentity::new("192.168.1.20", "Terminal");
        let launcher = AppLauncher::new(&device, LauncherConfig::default()).unwrap();
        assert_eq!(launcher.base, "http://192.168.1.20:8001/api/v2/");
        assert_eq!(
            launcher.app_url("111299001912"),
            "http://192.168.1.20:8001/api/v2/applications/111299001912"
        );
    }

    #[tokio::test]
    async fn test_unreachable_tv_collapses_to_false() {
        // Port 9 on loopback: nothing listens, connection is refused
        let device = DeviceIdentity::new("127.0.0.1", "Terminal");
        let config = LauncherConfig {
            app_port: 9,
            launch_timeout: Duration::from_millis(500),
            info_timeout: Duration::from_millis(500),
        };
        let launcher = AppLauncher::new(&device, config).unwrap();

        assert!(!launcher.launch("3201907018807").await);
        assert!(launcher.system_info().await.is_none());
        assert!(launcher.app_status("3201907018807").await.is_none());
    }
}
