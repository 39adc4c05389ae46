//! Device identity and TV metadata documents

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Default controller name shown in the TV's device list
pub const DEFAULT_DISPLAY_NAME: &str = "Terminal";

/// Which TV we talk to and how this controller introduces itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// TV address (IPv4, IPv6 or host name)
    pub ip: String,
    /// Name shown on the TV's pairing prompt
    pub display_name: String,
}

impl DeviceIdentity {
    pub fn new(ip: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            ip: ip.into().trim().to_string(),
            display_name: display_name.into(),
        }
    }

    /// Display name as sent in the `name` query parameter
    pub fn encoded_name(&self) -> String {
        STANDARD.encode(self.display_name.as_bytes())
    }

    /// Host part of a URL (`[v6]` for IPv6 literals)
    pub fn url_host(&self) -> String {
        if self.ip.contains(':') && !self.ip.starts_with('[') {
            format!("[{}]", self.ip)
        } else {
            self.ip.clone()
        }
    }
}

/// Device section of the `/api/v2/` document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceDetails {
    #[serde(rename = "modelName", default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "OS", default)]
    pub os: Option<String>,
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(rename = "firmwareVersion", default)]
    pub firmware_version: Option<String>,
    #[serde(rename = "PowerState", default)]
    pub power_state: Option<String>,
}

/// TV information document served at `/api/v2/`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemInfo {
    #[serde(default)]
    pub device: DeviceDetails,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// State of one application as reported by `/api/v2/applications/<id>`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub running: Option<bool>,
    #[serde(default)]
    pub visible: Option<bool>,
    #[serde(default)]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_name() {
        let id = DeviceIdentity::new("192.168.0.5", DEFAULT_DISPLAY_NAME);
        assert_eq!(id.encoded_name(), "VGVybWluYWw=");
    }

    #[test]
    fn test_ip_trimmed() {
        let id = DeviceIdentity::new(" 10.0.0.2 \n", "x");
        assert_eq!(id.ip, "10.0.0.2");
    }

    #[test]
    fn test_ipv6_url_host() {
        assert_eq!(DeviceIdentity::new("fe80::1", "x").url_host(), "[fe80::1]");
        assert_eq!(DeviceIdentity::new("10.0.0.2", "x").url_host(), "10.0.0.2");
    }

    #[test]
    fn test_system_info_parses_partial_document() {
        let info: SystemInfo = serde_json::from_str(
            r#"{"device":{"modelName":"QN55Q60","name":"Living Room","OS":"Tizen","resolution":"3840x2160","wifiMac":"aa"},"version":"2.0.25"}"#,
        )
        .unwrap();
        assert_eq!(info.device.model_name.as_deref(), Some("QN55Q60"));
        assert_eq!(info.device.os.as_deref(), Some("Tizen"));
        assert_eq!(info.device.resolution.as_deref(), Some("3840x2160"));
        assert_eq!(info.version.as_deref(), Some("2.0.25"));
    }

    #[test]
    fn test_app_status_parses() {
        let status: AppStatus =
            serde_json::from_str(r#"{"id":"111299001912","name":"YouTube","running":true,"visible":false}"#)
                .unwrap();
        assert_eq!(status.running, Some(true));
        assert_eq!(status.visible, Some(false));
        assert_eq!(status.version, None);
    }
}
