//! Outbound command types sent over the control channel

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name for remote key presses
pub const REMOTE_CONTROL_METHOD: &str = "ms.remote.control";

/// `TypeOfRemote` value for key presses
const SEND_REMOTE_KEY: &str = "SendRemoteKey";

/// Generic `{method, params}` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteCommand {
    pub method: String,
    pub params: Value,
}

impl RemoteCommand {
    /// Create a command; `None` params are sent as an empty object
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            method: method.into(),
            params: params.unwrap_or_else(|| Value::Object(Default::default())),
        }
    }

    /// Remote key command for `code` (already resolved to a device key code)
    pub fn key(action: KeyAction, code: &str) -> Self {
        let params = KeyParams::new(action, code);
        Self {
            method: REMOTE_CONTROL_METHOD.to_string(),
            // KeyParams only holds strings, serialization cannot fail
            params: serde_json::to_value(params).unwrap_or_default(),
        }
    }
}

/// Phase of a key press
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum KeyAction {
    /// Press and release in one event
    Click,
    /// Key down
    Press,
    /// Key up
    Release,
}

/// Params of an `ms.remote.control` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct KeyParams {
    pub cmd: KeyAction,
    pub data_of_cmd: String,
    pub option: String,
    pub type_of_remote: String,
}

impl KeyParams {
    pub fn new(action: KeyAction, code: &str) -> Self {
        Self {
            cmd: action,
            data_of_cmd: code.to_string(),
            option: "false".to_string(),
            type_of_remote: SEND_REMOTE_KEY.to_string(),
        }
    }
}
