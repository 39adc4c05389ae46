//! Control-channel session
//!
//! One `Session` owns one WebSocket connection to one TV. A background task
//! owns the inbound half of the socket and publishes what it learns
//! (handshake done, new token, connection lost) into shared state:
//!
//! - `state`: a `watch` channel, written only by the session internals and
//!   read by anyone (`state()`, `subscribe()`, `connect()` waiting for Ready)
//! - `token`: lock-guarded, replaced when the TV issues a new one
//!
//! The foreground only writes outbound frames. Nothing here reconnects on
//! its own: after `Closed`, calling `connect()` again is the caller's call.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};

use crate::auth::PairingToken;
use crate::catalog::KeyCatalog;
use crate::config::SessionConfig;
use crate::protocol::MessageCodec;
use crate::store::{load_or_provisional, TokenStore};
use crate::transport;
use crate::types::{DeviceIdentity, EventKind, KeyAction, RemoteCommand};
use crate::{CoreError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Lifecycle of the control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection attempt yet
    Disconnected,
    /// Opening the socket
    Connecting,
    /// Socket open, waiting for the TV to accept us (pairing prompt may be showing)
    AwaitingApproval,
    /// Handshake done, commands are accepted
    Ready,
    /// Connection ended; see `Session::close_reason()`
    Closed,
}

impl SessionState {
    /// True while a connection attempt is in flight
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::AwaitingApproval)
    }
}

/// Why a session ended up `Closed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Handshake did not finish in time
    Timeout,
    /// TV denied access or the approval prompt expired
    Rejected(String),
    /// TV closed the socket
    Remote { code: u16, reason: String },
    /// Socket or TLS error
    Error(String),
    /// `close()` was called
    Local,
}

impl CloseReason {
    fn into_error(self, timeout: Duration) -> CoreError {
        match self {
            CloseReason::Timeout => CoreError::Timeout(timeout.as_millis() as u64),
            CloseReason::Rejected(reason) => CoreError::PairingRejected(reason),
            CloseReason::Remote { code, reason } => {
                CoreError::Connection(format!("closed by TV ({}): {}", code, reason))
            }
            CloseReason::Error(e) => CoreError::Connection(e),
            CloseReason::Local => CoreError::Connection("closed locally".to_string()),
        }
    }
}

/// State shared between the session handle and its reader task
struct Shared {
    device: DeviceIdentity,
    state: watch::Sender<SessionState>,
    token: RwLock<PairingToken>,
    store: Arc<dyn TokenStore>,
    close_reason: std::sync::Mutex<Option<CloseReason>>,
}

impl Shared {
    fn new(device: DeviceIdentity, token: PairingToken, store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            device,
            state,
            token: RwLock::new(token),
            store,
            close_reason: std::sync::Mutex::new(None),
        }
    }

    fn current(&self) -> SessionState {
        *self.state.borrow()
    }

    fn begin_connect(&self) {
        self.set_close_reason(None);
        self.state.send_replace(SessionState::Connecting);
    }

    fn mark_open(&self) {
        self.state.send_if_modified(|s| {
            if *s == SessionState::Connecting {
                *s = SessionState::AwaitingApproval;
                true
            } else {
                false
            }
        });
    }

    fn mark_ready(&self) {
        let changed = self.state.send_if_modified(|s| {
            if s.is_pending() {
                *s = SessionState::Ready;
                true
            } else {
                false
            }
        });
        if changed {
            info!("Session with {} ready", self.device.ip);
        }
    }

    /// Move to `Closed`, keeping the first reason recorded for this attempt
    fn close_with(&self, reason: CloseReason) {
        let changed = self.state.send_if_modified(|s| {
            if *s == SessionState::Closed {
                false
            } else {
                *s = SessionState::Closed;
                true
            }
        });
        if changed {
            self.set_close_reason(Some(reason));
        }
    }

    fn set_close_reason(&self, reason: Option<CloseReason>) {
        let mut slot = self
            .close_reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = reason;
    }

    fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// React to one inbound text frame
    ///
    /// Undecodable frames and unrelated events are dropped: the channel
    /// also carries app and client events we have no use for.
    async fn handle_text(&self, text: &str) {
        let event = match MessageCodec::decode_event(text) {
            Ok(event) => event,
            Err(e) => {
                debug!("Ignoring undecodable frame: {}", e);
                return;
            }
        };

        if event.is_handshake() {
            if let Some(token) = event.token() {
                self.refresh_token(token).await;
            }
            self.mark_ready();
            return;
        }

        match event.kind() {
            EventKind::Unauthorized => {
                warn!("TV {} denied access to this remote", self.device.ip);
                self.close_with(CloseReason::Rejected("access denied on the TV".into()));
            }
            EventKind::PairingTimeout => {
                warn!("Approval prompt on {} timed out", self.device.ip);
                self.close_with(CloseReason::Rejected("approval prompt timed out".into()));
            }
            _ => trace!("Ignoring event {}", event.event),
        }
    }

    /// Adopt a TV-issued token and persist it, skipping unchanged values
    async fn refresh_token(&self, value: &str) {
        let token = {
            let mut current = self.token.write().await;
            if current.same_value(value) {
                return;
            }
            let token = match PairingToken::new(value) {
                Ok(token) => token,
                Err(e) => {
                    warn!("TV issued an unusable token ({}), keeping the current one", e);
                    return;
                }
            };
            *current = token.clone();
            token
        };

        // A lost write only means the TV prompts again next time
        match self.store.save(&self.device.ip, &token) {
            Ok(()) => info!("Stored new pairing token for {}", self.device.ip),
            Err(e) => warn!("Failed to persist pairing token for {}: {}", self.device.ip, e),
        }
    }
}

/// Persistent control-channel session with one TV
pub struct Session {
    shared: Arc<Shared>,
    config: SessionConfig,
    keys: Arc<KeyCatalog>,
    sink: Arc<Mutex<Option<WsSink>>>,
    recv_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a session for `device`
    ///
    /// The stored token for the device is loaded here; a provisional one is
    /// generated when none exists.
    pub fn new(
        device: DeviceIdentity,
        config: SessionConfig,
        keys: Arc<KeyCatalog>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let token = load_or_provisional(store.as_ref(), &device.ip);
        Self {
            shared: Arc::new(Shared::new(device, token, store)),
            config,
            keys,
            sink: Arc::new(Mutex::new(None)),
            recv_task: std::sync::Mutex::new(None),
        }
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.shared.device
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.shared.current()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Token the next connection attempt will use
    pub async fn token(&self) -> PairingToken {
        self.shared.token.read().await.clone()
    }

    /// Why the session last closed, if it did
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.shared.close_reason()
    }

    /// Open the control channel and wait for the handshake
    ///
    /// Waits at most `SessionConfig::connect_timeout`. Returns early if the
    /// connection fails or the TV rejects us. On any failure the session
    /// ends up `Closed`; nothing is retried.
    pub async fn connect(&self) -> Result<()> {
        self.teardown().await;
        self.shared.begin_connect();

        let token = self.token().await;
        let url = self.config.control_url(&self.shared.device, &token);
        let timeout = self.config.connect_timeout;
        info!(
            "Connecting to {}:{} (token {})",
            self.shared.device.ip,
            self.config.control_port,
            if token.is_provisional() { "provisional" } else { "stored" }
        );

        match tokio::time::timeout(timeout, self.open_and_wait(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Connection to {} failed: {}", self.shared.device.ip, e);
                self.teardown().await;
                self.shared.close_with(CloseReason::Error(e.to_string()));
                Err(e)
            }
            Err(_) => {
                warn!(
                    "No handshake from {} within {:?}",
                    self.shared.device.ip, timeout
                );
                self.teardown().await;
                self.shared.close_with(CloseReason::Timeout);
                Err(CoreError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    async fn open_and_wait(&self, url: String) -> Result<()> {
        let connector = transport::connector(self.config.secure)?;
        let (ws, _response) = connect_async_tls_with_config(url, None, false, connector)
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))?;
        info!("Control channel to {} open", self.shared.device.ip);

        let (sink, stream) = ws.split();
        *self.sink.lock().await = Some(sink);

        // Subscribe before the reader can publish anything
        let mut state_rx = self.shared.state.subscribe();
        self.shared.mark_open();

        let task = tokio::spawn(read_loop(self.shared.clone(), stream));
        if let Some(old) = self.replace_task(Some(task)) {
            old.abort();
        }

        let state = *state_rx
            .wait_for(|s| matches!(s, SessionState::Ready | SessionState::Closed))
            .await
            .map_err(|_| CoreError::Connection("session state dropped".to_string()))?;

        match state {
            SessionState::Ready => Ok(()),
            _ => Err(self
                .shared
                .close_reason()
                .unwrap_or(CloseReason::Error("connection closed".to_string()))
                .into_error(self.config.connect_timeout)),
        }
    }

    /// Send `{method, params}` as one text frame
    ///
    /// Never retried: a dropped key press is cheaper than a doubled one.
    pub async fn send_command(&self, method: &str, params: Option<Value>) -> Result<()> {
        let cmd = RemoteCommand::new(method, params);
        self.ensure_ready()?;
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(CoreError::NotConnected)?;
        write(sink, &cmd).await
    }

    /// Send a key by symbolic name or device code
    ///
    /// A zero `hold` sends one `Click`. A non-zero `hold` sends `Press`,
    /// waits, then `Release`; the socket stays locked for the whole
    /// sequence so no other command from this session lands in between.
    pub async fn send_key(&self, key: &str, hold: Duration) -> Result<()> {
        let code = self.resolve_key(key)?;
        self.ensure_ready()?;

        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(CoreError::NotConnected)?;

        if hold.is_zero() {
            debug!("Click {}", code);
            return write(sink, &RemoteCommand::key(KeyAction::Click, &code)).await;
        }

        debug!("Hold {} for {:?}", code, hold);
        write(sink, &RemoteCommand::key(KeyAction::Press, &code)).await?;
        tokio::time::sleep(hold).await;
        write(sink, &RemoteCommand::key(KeyAction::Release, &code)).await
    }

    /// Key-down only; pair with [`release_key`](Self::release_key)
    pub async fn press_key(&self, key: &str) -> Result<()> {
        self.send_key_action(key, KeyAction::Press).await
    }

    /// Key-up only
    pub async fn release_key(&self, key: &str) -> Result<()> {
        self.send_key_action(key, KeyAction::Release).await
    }

    async fn send_key_action(&self, key: &str, action: KeyAction) -> Result<()> {
        let code = self.resolve_key(key)?;
        self.ensure_ready()?;
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(CoreError::NotConnected)?;
        write(sink, &RemoteCommand::key(action, &code)).await
    }

    fn resolve_key(&self, key: &str) -> Result<String> {
        self.keys.require(key).map(str::to_string).map_err(|e| {
            warn!("Rejected key {:?}", key);
            e
        })
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            error!("No active connection to {}", self.shared.device.ip);
            Err(CoreError::NotConnected)
        }
    }

    /// Close the channel; the only way to cancel an open session
    pub async fn close(&self) {
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        if let Some(task) = self.replace_task(None) {
            task.abort();
        }
        self.shared.close_with(CloseReason::Local);
        info!("Session with {} closed", self.shared.device.ip);
    }

    /// Drop socket halves left over from a previous attempt
    async fn teardown(&self) {
        self.sink.lock().await.take();
        if let Some(task) = self.replace_task(None) {
            task.abort();
        }
    }

    fn replace_task(&self, task: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut slot = self
            .recv_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *slot, task)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(task) = self.replace_task(None) {
            task.abort();
        }
    }
}

async fn write(sink: &mut WsSink, cmd: &RemoteCommand) -> Result<()> {
    let text = MessageCodec::encode(cmd)?;
    sink.send(Message::Text(text)).await.map_err(|e| {
        error!("Send failed: {}", e);
        CoreError::Transport(e.to_string())
    })
}

/// Owns the inbound half of the socket for the whole connection
async fn read_loop(shared: Arc<Shared>, mut stream: SplitStream<WsStream>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => shared.handle_text(&text).await,
            Ok(Message::Close(frame)) => {
                let (code, reason) = frame
                    .map(|f| (u16::from(f.code), f.reason.to_string()))
                    .unwrap_or((1005, String::new()));
                warn!("Connection closed ({}): {}", code, reason);
                shared.close_with(CloseReason::Remote { code, reason });
                return;
            }
            Ok(Message::Binary(data)) => trace!("Ignoring {} byte binary frame", data.len()),
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket error: {}", e);
                shared.close_with(CloseReason::Error(e.to_string()));
                return;
            }
        }
    }
    warn!("Control channel to {} ended", shared.device.ip);
    shared.close_with(CloseReason::Remote {
        code: 1006,
        reason: "stream ended".to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;

    fn shared_with(store: Arc<MemoryTokenStore>, token: &str) -> Shared {
        let shared = Shared::new(
            DeviceIdentity::new("10.0.0.7", "Terminal"),
            PairingToken::new(token).unwrap(),
            store,
        );
        shared.begin_connect();
        shared.mark_open();
        shared
    }

    #[tokio::test]
    async fn test_new_token_saved_once() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store.clone(), "1111");

        shared
            .handle_text(r#"{"event":"ms.channel.connect","data":{"token":"2222"}}"#)
            .await;

        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load("10.0.0.7").unwrap().as_str(), "2222");
        assert_eq!(shared.token.read().await.as_str(), "2222");
        assert_eq!(shared.current(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_token_with_base64_characters_adopted() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store.clone(), "1111");

        shared
            .handle_text(r#"{"event":"ms.channel.connect","data":{"token":"ab+c/d="}}"#)
            .await;

        assert_eq!(shared.current(), SessionState::Ready);
        assert_eq!(shared.token.read().await.as_str(), "ab+c/d=");
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.load("10.0.0.7").unwrap().as_str(), "ab+c/d=");
    }

    #[tokio::test]
    async fn test_same_token_not_saved_again() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store.clone(), "1111");

        shared
            .handle_text(r#"{"event":"ms.channel.connect","data":{"token":"1111"}}"#)
            .await;
        shared
            .handle_text(r#"{"event":"ms.channel.ready","data":{"token":"1111"}}"#)
            .await;

        assert_eq!(store.save_count(), 0);
        assert_eq!(shared.current(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_repeated_new_token_saved_once() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store.clone(), "1111");

        let frame = r#"{"event":"ms.channel.connect","data":{"token":"3333"}}"#;
        shared.handle_text(frame).await;
        shared.handle_text(frame).await;

        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_handshake_without_token_marks_ready() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store.clone(), "1111");

        shared.handle_text(r#"{"event":"ms.channel.ready"}"#).await;

        assert_eq!(shared.current(), SessionState::Ready);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_state() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store.clone(), "1111");

        shared.handle_text(r#"{"event":"ms.channel.conn"#).await;
        shared.handle_text("not json at all").await;
        shared.handle_text(r#"{"data":{"token":"9"}}"#).await;

        assert_eq!(shared.current(), SessionState::AwaitingApproval);
        assert_eq!(shared.token.read().await.as_str(), "1111");
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_unrelated_event_ignored() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store, "1111");

        shared
            .handle_text(r#"{"event":"ms.channel.clientConnect","data":{"id":"abc"}}"#)
            .await;

        assert_eq!(shared.current(), SessionState::AwaitingApproval);
    }

    #[tokio::test]
    async fn test_unauthorized_closes() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store, "1111");

        shared.handle_text(r#"{"event":"ms.channel.unauthorized"}"#).await;

        assert_eq!(shared.current(), SessionState::Closed);
        assert!(matches!(shared.close_reason(), Some(CloseReason::Rejected(_))));
    }

    #[tokio::test]
    async fn test_ready_after_close_ignored() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store, "1111");

        shared.close_with(CloseReason::Local);
        shared.handle_text(r#"{"event":"ms.channel.ready"}"#).await;

        assert_eq!(shared.current(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_first_close_reason_kept() {
        let store = Arc::new(MemoryTokenStore::new());
        let shared = shared_with(store, "1111");

        shared.close_with(CloseReason::Timeout);
        shared.close_with(CloseReason::Local);

        assert_eq!(shared.close_reason(), Some(CloseReason::Timeout));
    }

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let session = Session::new(
            DeviceIdentity::new("10.0.0.7", "Terminal"),
            SessionConfig::default(),
            Arc::new(KeyCatalog::default()),
            Arc::new(MemoryTokenStore::new()),
        );

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(session.token().await.is_provisional());
        assert!(matches!(
            session.send_command("ms.remote.control", None).await,
            Err(CoreError::NotConnected)
        ));
        assert!(matches!(
            session.send_key("HOME", Duration::ZERO).await,
            Err(CoreError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_network() {
        let session = Session::new(
            DeviceIdentity::new("10.0.0.7", "Terminal"),
            SessionConfig::default(),
            Arc::new(KeyCatalog::default()),
            Arc::new(MemoryTokenStore::new()),
        );

        assert!(matches!(
            session.send_key("KEY_LAUNCH_ROCKETS", Duration::ZERO).await,
            Err(CoreError::InvalidKey(_))
        ));
        assert!(matches!(
            session.press_key("nope").await,
            Err(CoreError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_stored_token_used() {
        let store = Arc::new(MemoryTokenStore::new());
        store
            .save("10.0.0.7", &PairingToken::new("55555").unwrap())
            .unwrap();
        let session = Session::new(
            DeviceIdentity::new("10.0.0.7", "Terminal"),
            SessionConfig::default(),
            Arc::new(KeyCatalog::default()),
            store,
        );

        let token = session.token().await;
        assert_eq!(token.as_str(), "55555");
        assert!(!token.is_provisional());
    }
}
