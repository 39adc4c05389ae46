//! Inbound events published by the TV on the control channel

use serde::Deserialize;

/// Event names the session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `ms.channel.connect`: handshake accepted
    Connect,
    /// `ms.channel.ready`: channel ready for commands
    Ready,
    /// `ms.channel.unauthorized`: user denied this controller
    Unauthorized,
    /// `ms.channel.timeOut`: approval prompt expired
    PairingTimeout,
    /// Anything else (app events, client joins, ...)
    Other,
}

impl EventKind {
    fn from_name(name: &str) -> Self {
        match name {
            "ms.channel.connect" => EventKind::Connect,
            "ms.channel.ready" => EventKind::Ready,
            "ms.channel.unauthorized" => EventKind::Unauthorized,
            "ms.channel.timeOut" => EventKind::PairingTimeout,
            _ => EventKind::Other,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EventData {
    #[serde(default)]
    token: Option<String>,
}

/// Parsed inbound event
///
/// Only the fields the session needs are decoded; everything else in the
/// frame is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelEvent {
    pub event: String,
    #[serde(default, deserialize_with = "lenient_data")]
    data: Option<EventData>,
}

/// `data` is an object on handshake events but a string or array on others
fn lenient_data<'de, D>(deserializer: D) -> Result<Option<EventData>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl ChannelEvent {
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.event)
    }

    /// True for events that complete the handshake
    pub fn is_handshake(&self) -> bool {
        matches!(self.kind(), EventKind::Connect | EventKind::Ready)
    }

    /// Token carried in `data.token`, if any
    pub fn token(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.token.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ChannelEvent {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_connect_with_token() {
        let ev = parse(r#"{"event":"ms.channel.connect","data":{"id":"x","token":"12345"}}"#);
        assert_eq!(ev.kind(), EventKind::Connect);
        assert!(ev.is_handshake());
        assert_eq!(ev.token(), Some("12345"));
    }

    #[test]
    fn test_ready_without_data() {
        let ev = parse(r#"{"event":"ms.channel.ready"}"#);
        assert!(ev.is_handshake());
        assert_eq!(ev.token(), None);
    }

    #[test]
    fn test_string_data_tolerated() {
        let ev = parse(r#"{"event":"ed.installedApp.get","data":"whatever"}"#);
        assert_eq!(ev.kind(), EventKind::Other);
        assert_eq!(ev.token(), None);
    }

    #[test]
    fn test_blank_token_ignored() {
        let ev = parse(r#"{"event":"ms.channel.connect","data":{"token":""}}"#);
        assert_eq!(ev.token(), None);
    }

    #[test]
    fn test_rejection_events() {
        assert_eq!(parse(r#"{"event":"ms.channel.unauthorized"}"#).kind(), EventKind::Unauthorized);
        assert_eq!(parse(r#"{"event":"ms.channel.timeOut"}"#).kind(), EventKind::PairingTimeout);
    }
}
