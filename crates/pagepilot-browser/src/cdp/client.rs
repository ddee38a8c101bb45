//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpEvent, CdpRequest, CdpResponse, TargetInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, CdpError>>>>>;
type SessionMap = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<CdpEvent>>>>;

/// Upper bound on waiting for a single command response.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// The shared WebSocket: request ids, pending replies and per-session event
/// routing. Owned jointly by the client and every page session.
pub(crate) struct Connection {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    pending: PendingMap,
    sessions: SessionMap,
}

impl Connection {
    /// Send a command and wait for its response.
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
            session_id: session_id.map(str::to_string),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let sent = {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await
        };
        if let Err(e) = sent {
            self.pending.lock().remove(&id);
            return Err(e.into());
        }

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    fn register_session(&self, session_id: &str) -> mpsc::UnboundedReceiver<CdpEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.write().insert(session_id.to_string(), tx);
        rx
    }

    pub(crate) fn unregister_session(&self, session_id: &str) {
        self.sessions.write().remove(session_id);
    }
}

/// CDP client for browser automation.
///
/// Holds the browser-level WebSocket and attaches page sessions over it
/// using flattened target sessions.
pub struct CdpClient {
    browser_ws_url: String,
    conn: Arc<Connection>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Fetch `/json/version` from a debugging endpoint.
    pub async fn browser_version(endpoint: &str) -> Result<BrowserVersion, CdpError> {
        let version_url = format!("{}/json/version", endpoint.trim_end_matches('/'));
        debug!("Fetching browser version from {}", version_url);

        reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))
    }

    /// Connect to Chrome at an HTTP debugging endpoint such as
    /// `http://127.0.0.1:9222`.
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let version = Self::browser_version(endpoint).await?;
        debug!("Connected to browser: {}", version.browser);
        Self::connect_ws(&version.web_socket_debugger_url).await
    }

    /// Connect straight to a browser WebSocket URL.
    pub async fn connect_ws(browser_ws_url: &str) -> Result<Self, CdpError> {
        url::Url::parse(browser_ws_url)?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(browser_ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let sessions: SessionMap = Arc::new(RwLock::new(HashMap::new()));

        let recv_task = tokio::spawn(Self::receive_loop(
            ws_source,
            pending.clone(),
            sessions.clone(),
        ));

        debug!("CDP client connected to {}", browser_ws_url);

        Ok(Self {
            browser_ws_url: browser_ws_url.to_string(),
            conn: Arc::new(Connection {
                ws_tx: tokio::sync::Mutex::new(ws_sink),
                request_id: AtomicU64::new(1),
                pending,
                sessions,
            }),
            recv_task,
        })
    }

    async fn receive_loop(mut ws_source: WsSource, pending: PendingMap, sessions: SessionMap) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => Self::route(resp, &pending, &sessions),
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }

        // Dropping the senders fails every waiting call with SessionClosed
        // and ends every session's event stream.
        pending.lock().clear();
        sessions.write().clear();
    }

    fn route(resp: CdpResponse, pending: &PendingMap, sessions: &SessionMap) {
        if let Some(id) = resp.id {
            let Some(tx) = pending.lock().remove(&id) else {
                return;
            };
            let result = match resp.error {
                Some(error) => Err(CdpError::Protocol {
                    code: error.code,
                    message: error.message,
                }),
                None => Ok(resp.result.unwrap_or(Value::Null)),
            };
            let _ = tx.send(result);
        } else if let Some(method) = resp.method {
            let session_id = resp.session_id.unwrap_or_default();
            let sessions = sessions.read();
            if let Some(tx) = sessions.get(&session_id) {
                let _ = tx.send(CdpEvent {
                    method,
                    params: resp.params.unwrap_or(Value::Null),
                });
            }
        }
    }

    /// Send a browser-level command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.conn.call(method, params, None).await
    }

    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// Whether the WebSocket reader is still running.
    pub fn is_connected(&self) -> bool {
        !self.recv_task.is_finished()
    }

    // ========================================================================
    // Target Management
    // ========================================================================

    /// All targets known to the browser.
    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let result = self.call("Target.getTargets", None).await?;
        let targets: Vec<TargetInfo> = serde_json::from_value(result["targetInfos"].clone())?;
        Ok(targets)
    }

    /// Page targets only, in the order the browser reports them.
    pub async fn page_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        Ok(self
            .get_targets()
            .await?
            .into_iter()
            .filter(TargetInfo::is_page)
            .collect())
    }

    /// Open a new tab and return its target id.
    pub async fn create_target(&self, url: &str) -> Result<String, CdpError> {
        let result = self
            .call("Target.createTarget", Some(json!({"url": url})))
            .await?;
        result["targetId"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| CdpError::InvalidResponse("Missing targetId".to_string()))
    }

    /// Attach a flattened session to a page target.
    pub async fn attach(&self, target_id: &str) -> Result<PageSession, CdpError> {
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

        let events = self.conn.register_session(&session_id);
        let session = PageSession::new(
            target_id.to_string(),
            session_id,
            self.conn.clone(),
            events,
        );
        session.enable_domains().await?;

        Ok(session)
    }

    /// Bring a tab to the foreground.
    pub async fn activate_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.call(
            "Target.activateTarget",
            Some(json!({"targetId": target_id})),
        )
        .await?;
        Ok(())
    }

    pub async fn close_target(&self, target_id: &str) -> Result<(), CdpError> {
        self.call("Target.closeTarget", Some(json!({"targetId": target_id})))
            .await?;
        Ok(())
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
