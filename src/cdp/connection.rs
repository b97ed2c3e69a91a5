//! CDP WebSocket connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};
use url::Url;

use super::error::CdpError;
use super::protocol::{CdpErrorResponse, CdpRequest, CdpResponse, TargetInfo};
use super::session::CdpSession;
use crate::diag;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Routing key for event subscriptions: (session id, event method).
pub(crate) type EventKey = (Option<String>, String);

/// Event subscription table shared between the connection and its sessions.
pub(crate) type EventRoutes = Arc<RwLock<HashMap<EventKey, mpsc::UnboundedSender<Value>>>>;

/// Pending request waiting for its response.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// Connection options.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Per-command timeout. A lost response fails the send instead of
    /// hanging it forever; whole-action timeouts belong to the caller.
    pub command_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared outbound state. Every send, browser-scoped or session-scoped,
/// goes through one `Wire` so request ids and response correlation stay
/// consistent across the whole connection.
pub(crate) struct Wire {
    /// WebSocket sender.
    ws_tx: tokio::sync::Mutex<WsSink>,
    /// Requests waiting for responses, by request id.
    pending: Mutex<HashMap<u64, PendingRequest>>,
    /// Request ID counter.
    request_id: AtomicU64,
    /// Per-command timeout.
    command_timeout: Duration,
}

impl Wire {
    /// Send a CDP command and wait for its response.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        // Create response channel
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        // Send request
        {
            let mut ws = self.ws_tx.lock().await;
            if let Err(e) = ws.send(Message::Text(json.into())).await {
                self.pending.lock().remove(&id);
                return Err(e.into());
            }
        }

        // Wait for response with timeout
        match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }
}

/// Convert a protocol rejection payload into a `CdpError`.
///
/// Structured `{code, message}` first; anything else (a bare string, a
/// number, an unexpected object) goes through the shared formatter with a
/// synthetic code so it still surfaces as a protocol error.
pub(crate) fn protocol_error(payload: Value) -> CdpError {
    match serde_json::from_value::<CdpErrorResponse>(payload.clone()) {
        Ok(err) => {
            let message = match &err.data {
                Some(data) => diag::sanitize(&format!("{} ({})", err.message, data)),
                None => diag::sanitize(&err.message),
            };
            CdpError::Protocol {
                code: err.code,
                message,
            }
        }
        Err(_) => CdpError::Protocol {
            code: -1,
            message: diag::describe(&payload),
        },
    }
}

/// Connection to a browser's CDP WebSocket endpoint.
///
/// Owns the receive task that correlates responses by request id and routes
/// events to subscribers. Sessions attached through [`CdpConnection::attach`]
/// share this connection's wire in flat session mode.
pub struct CdpConnection {
    /// Browser WebSocket URL.
    ws_url: String,
    /// Shared outbound state.
    wire: Arc<Wire>,
    /// Event subscriptions.
    events: EventRoutes,
    /// Background task handle.
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpConnection {
    /// Connect to a browser WebSocket endpoint with default options.
    ///
    /// # Arguments
    ///
    /// * `ws_url` - Browser WebSocket URL (e.g., "ws://localhost:9222/devtools/browser/...")
    pub async fn connect(ws_url: &str) -> Result<Self, CdpError> {
        Self::connect_with(ws_url, ConnectionConfig::default()).await
    }

    /// Connect with explicit options.
    pub async fn connect_with(ws_url: &str, config: ConnectionConfig) -> Result<Self, CdpError> {
        let parsed = Url::parse(ws_url)?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(CdpError::ConnectionFailed(format!(
                "Expected a ws:// or wss:// URL, got {}",
                parsed.scheme()
            )));
        }

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let wire = Arc::new(Wire {
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            pending: Mutex::new(HashMap::new()),
            request_id: AtomicU64::new(1),
            command_timeout: config.command_timeout,
        });
        let events: EventRoutes = Arc::new(RwLock::new(HashMap::new()));

        // Start receive task
        let recv_task = {
            let wire = wire.clone();
            let events = events.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, wire, events).await;
            })
        };

        debug!("CDP connection established to {}", ws_url);

        Ok(Self {
            ws_url: ws_url.to_string(),
            wire,
            events,
            _recv_task: recv_task,
        })
    }

    /// WebSocket receive loop.
    async fn receive_loop(mut ws_source: WsSource, wire: Arc<Wire>, events: EventRoutes) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => {
                            // Check if it's a response to a request
                            if let Some(id) = resp.id {
                                let pending_req = wire.pending.lock().remove(&id);
                                if let Some(req) = pending_req {
                                    let result = match resp.error {
                                        Some(payload) => Err(protocol_error(payload)),
                                        None => Ok(resp.result.unwrap_or(Value::Null)),
                                    };
                                    let _ = req.tx.send(result);
                                }
                            } else if let Some(method) = resp.method {
                                // It's an event
                                let key = (resp.session_id.clone(), method);
                                let routes = events.read().await;
                                if let Some(tx) = routes.get(&key) {
                                    let _ = tx.send(resp.params.unwrap_or(Value::Null));
                                }
                            }
                        }
                        Err(e) => {
                            warn!("Failed to parse CDP message: {}", diag::describe_error(&e));
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", diag::describe_error(&e));
                    break;
                }
                _ => {}
            }
        }

        // Fail anything still waiting so callers see a closed connection
        // instead of a timeout.
        let drained: Vec<PendingRequest> = wire
            .pending
            .lock()
            .drain()
            .map(|(_, req)| req)
            .collect();
        for req in drained {
            let _ = req.tx.send(Err(CdpError::ConnectionClosed));
        }
    }

    /// Send a browser-scoped CDP command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.wire.call(method, params, None).await
    }

    /// Attach to a target in flat session mode.
    pub async fn attach(&self, target_id: &str) -> Result<CdpSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        debug!("Attached to target {} as session {}", target_id, session_id);

        Ok(CdpSession::new(
            target_id.to_string(),
            session_id,
            self.wire.clone(),
            self.events.clone(),
        ))
    }

    /// List open page targets.
    pub async fn page_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let result = self.call("Target.getTargets", None).await?;
        let targets: Vec<TargetInfo> = serde_json::from_value(result["targetInfos"].clone())?;
        Ok(targets
            .into_iter()
            .filter(|t| t.target_type == "page")
            .collect())
    }

    /// Get browser WebSocket URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }
}

impl Drop for CdpConnection {
    fn drop(&mut self) {
        self._recv_task.abort();
    }
}
