//! JSON codec for control-channel messages
//!
//! Every WebSocket text frame carries exactly one JSON object, so there is
//! no length prefix: a frame is a message.

use crate::error::{CoreError, Result};
use crate::types::{ChannelEvent, RemoteCommand};

/// Maximum inbound frame we bother to parse (1MB)
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Message codec for serialization/deserialization
pub struct MessageCodec;

impl MessageCodec {
    /// Encode an outbound command as a text frame
    pub fn encode(cmd: &RemoteCommand) -> Result<String> {
        serde_json::to_string(cmd).map_err(CoreError::from)
    }

    /// Decode an inbound text frame into an event
    ///
    /// # Errors
    /// - `InvalidMessageFormat` if the frame is oversized, not JSON, or has
    ///   no string `event` field
    pub fn decode_event(text: &str) -> Result<ChannelEvent> {
        if text.len() > MAX_MESSAGE_SIZE {
            return Err(CoreError::InvalidMessageFormat(format!(
                "frame too large: {} bytes",
                text.len()
            )));
        }
        serde_json::from_str(text).map_err(|e| CoreError::InvalidMessageFormat(e.to_string()))
    }

    /// Parse operator-supplied params for a custom command
    ///
    /// Empty input means "no params". Anything else must be a JSON object.
    pub fn parse_params(raw: &str) -> Result<Option<serde_json::Value>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| CoreError::InvalidParams(e.to_string()))?;
        if !value.is_object() {
            return Err(CoreError::InvalidParams("params must be a JSON object".into()));
        }
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventKind, KeyAction};

    #[test]
    fn test_encode_key_command() {
        let cmd = RemoteCommand::key(KeyAction::Click, "KEY_MUTE");
        let text = MessageCodec::encode(&cmd).unwrap();
        assert!(text.starts_with(r#"{"method":"ms.remote.control","params":{"#));
        assert!(text.contains(r#""DataOfCmd":"KEY_MUTE""#));
    }

    #[test]
    fn test_decode_handshake() {
        let ev = MessageCodec::decode_event(
            r#"{"event":"ms.channel.connect","data":{"token":"99"}}"#,
        )
        .unwrap();
        assert_eq!(ev.kind(), EventKind::Connect);
        assert_eq!(ev.token(), Some("99"));
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let result = MessageCodec::decode_event(r#"{"event":"ms.chan"#);
        assert!(matches!(result, Err(CoreError::InvalidMessageFormat(_))));
    }

    #[test]
    fn test_frame_without_event_rejected() {
        assert!(MessageCodec::decode_event(r#"{"data":{}}"#).is_err());
        assert!(MessageCodec::decode_event("[]").is_err());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let big = format!(r#"{{"event":"{}"}}"#, "x".repeat(MAX_MESSAGE_SIZE));
        assert!(MessageCodec::decode_event(&big).is_err());
    }

    #[test]
    fn test_parse_params() {
        assert_eq!(MessageCodec::parse_params("  ").unwrap(), None);
        let params = MessageCodec::parse_params(r#"{"event":"ed.apps.launch"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(params["event"], "ed.apps.launch");
    }

    #[test]
    fn test_parse_params_invalid() {
        assert!(matches!(
            MessageCodec::parse_params("{not json"),
            Err(CoreError::InvalidParams(_))
        ));
        assert!(matches!(
            MessageCodec::parse_params("[1,2]"),
            Err(CoreError::InvalidParams(_))
        ));
    }
}
