//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC method calls to the command handlers. A
//! `subscribe_events` call turns on event notifications for the rest of the
//! connection.
//!
//! The socket is the trust boundary: it is created `0600`, and each
//! connection carries its own [`Session`] whose caller is fixed by the
//! `auth_challenge` / `authenticate` handshake.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use yousplit_splitter::SplitterError;

use crate::auth::Session;
use crate::commands;
use crate::events::{Event, EventFilter};
use crate::state::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            -32601,
            "METHOD_NOT_FOUND",
            Some(serde_json::json!({"method": method})),
        )
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(
            -32602,
            "INVALID_PARAMS",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(
            -32603,
            "INTERNAL_ERROR",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    // Pool errors (-32070..)

    /// Map a pool failure to its stable error code.
    pub fn from_splitter(err: SplitterError) -> Self {
        let (code, name) = match &err {
            SplitterError::NotOwner => (-32070, "NOT_OWNER"),
            SplitterError::NotEligible => (-32071, "NOT_ELIGIBLE"),
            SplitterError::UnknownBeneficiary => (-32072, "UNKNOWN_BENEFICIARY"),
            SplitterError::NothingToWithdraw => (-32073, "NOTHING_TO_WITHDRAW"),
            SplitterError::InvalidShareAllocation(_) => (-32074, "INVALID_SHARE_ALLOCATION"),
            SplitterError::TransferFailed(_) => (-32075, "TRANSFER_FAILED"),
            SplitterError::MismatchedInput { .. } => (-32076, "MISMATCHED_INPUT"),
            SplitterError::DuplicateBeneficiary(_) => (-32077, "DUPLICATE_BENEFICIARY"),
            SplitterError::StableTokenNotConfigured => (-32078, "STABLE_TOKEN_NOT_CONFIGURED"),
            SplitterError::Overflow => (-32079, "OVERFLOW"),
            SplitterError::CorruptSnapshot(_) => (-32080, "CORRUPT_SNAPSHOT"),
        };
        Self::new(code, name, Some(serde_json::json!({"detail": err.to_string()})))
    }

    /// No verified caller on this connection (-32081).
    pub fn unauthenticated(detail: &str) -> Self {
        Self::new(
            -32081,
            "UNAUTHENTICATED",
            Some(serde_json::json!({"detail": detail})),
        )
    }
}

impl From<SplitterError> for RpcError {
    fn from(err: SplitterError) -> Self {
        Self::from_splitter(err)
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = bind_socket(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Bind the listening socket, readable and writable by the owning user only.
pub fn bind_socket(path: &Path) -> std::io::Result<UnixListener> {
    // Remove stale socket file
    let _ = std::fs::remove_file(path);

    let listener = UnixListener::bind(path)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(listener)
}

/// Handle a single client connection.
///
/// Responses and event notifications share one writer task fed through a
/// channel, so a subscription never interleaves partial lines.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(state.config.advanced.event_buffer.max(1));

    let writer_task = tokio::spawn(async move {
        while let Some(mut line) = out_rx.recv().await {
            line.push('\n');
            if writer.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new();
    let mut subscription: Option<tokio::task::JoinHandle<()>> = None;
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }

        let response = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(request) if request.method == "subscribe_events" => {
                let id = request.id.clone();
                let filter = if request.params.is_null() {
                    Ok(EventFilter::default())
                } else {
                    serde_json::from_value::<EventFilter>(request.params.clone())
                };
                match filter {
                    Ok(filter) => {
                        if let Some(previous) = subscription.take() {
                            previous.abort();
                        }
                        let subscription_id = new_subscription_id();
                        subscription = Some(spawn_forwarder(
                            &state,
                            filter,
                            subscription_id.clone(),
                            out_tx.clone(),
                        ));
                        RpcResponse::success(
                            id,
                            serde_json::json!({"subscription_id": subscription_id}),
                        )
                    }
                    Err(e) => RpcResponse::error(id, RpcError::invalid_params(&e.to_string())),
                }
            }
            Ok(request) if request.method == "unsubscribe_events" => {
                let was_subscribed = match subscription.take() {
                    Some(handle) => {
                        handle.abort();
                        true
                    }
                    None => false,
                };
                RpcResponse::success(
                    request.id,
                    serde_json::json!({"unsubscribed": was_subscribed}),
                )
            }
            Ok(request) => dispatch_request(&state, &mut session, request).await,
            Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
        };

        let response_json = serde_json::to_string(&response)?;
        if out_tx.send(response_json).await.is_err() {
            break;
        }
    }

    if let Some(handle) = subscription {
        handle.abort();
    }
    drop(out_tx);
    let _ = writer_task.await;
    Ok(())
}

fn new_subscription_id() -> String {
    let mut sub_id = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut sub_id);
    hex::encode(sub_id)
}

/// Server-initiated JSON-RPC notification carrying one event.
#[derive(Serialize)]
struct Notification<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: NotificationParams<'a>,
}

#[derive(Serialize)]
struct NotificationParams<'a> {
    subscription_id: &'a str,
    event: &'a Event,
}

/// Forward matching bus events to one connection as notifications.
fn spawn_forwarder(
    state: &Arc<DaemonState>,
    filter: EventFilter,
    subscription_id: String,
    out_tx: mpsc::Sender<String>,
) -> tokio::task::JoinHandle<()> {
    let mut rx = state.event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if !filter.matches(&event) {
                        continue;
                    }
                    let notification = Notification {
                        jsonrpc: "2.0",
                        method: "event",
                        params: NotificationParams {
                            subscription_id: &subscription_id,
                            event: &event,
                        },
                    };
                    let line = match serde_json::to_string(&notification) {
                        Ok(line) => line,
                        Err(e) => {
                            error!("event serialization failed: {e}");
                            continue;
                        }
                    };
                    if out_tx.send(line).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagging, events dropped");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
///
/// Mutating methods act as `session`'s caller.
pub async fn dispatch_request(
    state: &Arc<DaemonState>,
    session: &mut Session,
    request: RpcRequest,
) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Authentication
        "auth_challenge" => Ok(serde_json::json!({
            "challenge": hex::encode(session.challenge()),
        })),
        "authenticate" => commands::auth::authenticate(session, params),

        // Queries
        "owner" => commands::query::owner(state).await,
        "total_balance" => commands::query::total_balance(state).await,
        "get_total_funds" => commands::query::get_total_funds(state).await,
        "beneficiaries" => commands::query::beneficiaries(state, params).await,
        "get_beneficiaries" => commands::query::get_beneficiaries(state).await,
        "get_beneficiary_info" => commands::query::get_beneficiary_info(state, params).await,
        "token_balance" => commands::query::token_balance(state, params).await,
        "get_settlement_history" => {
            commands::query::get_settlement_history(state, params).await
        }

        // Registry administration
        "set_beneficiary" => commands::admin::set_beneficiary(state, session, params).await,
        "remove_beneficiary" => commands::admin::remove_beneficiary(state, session, params).await,
        "shutdown" => commands::admin::shutdown(state, session).await,

        // Funds
        "deposit" => commands::funds::deposit(state, session, params).await,
        "withdraw" => commands::funds::withdraw(state, session).await,
        "withdraw_stable" => commands::funds::withdraw_stable(state, session).await,
        "onramp_royalties" => commands::funds::onramp_royalties(state, session, params).await,
        "token_approve" => commands::funds::token_approve(state, session, params).await,

        // Dev-only commands
        "dev_token_mint" if state.config.advanced.dev_mode => {
            commands::funds::dev_token_mint(state, params).await
        }

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_error_codes() {
        let err = RpcError::from_splitter(SplitterError::NotOwner);
        assert_eq!(err.code, -32070);
        assert_eq!(err.message, "NOT_OWNER");

        let err = RpcError::from_splitter(SplitterError::NotEligible);
        assert_eq!(err.code, -32071);
        assert_eq!(
            err.data.expect("data")["detail"],
            "you are not eligible to withdraw"
        );

        let err = RpcError::method_not_found("unknown");
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn test_pool_error_codes_are_distinct() {
        let all = [
            SplitterError::NotOwner,
            SplitterError::NotEligible,
            SplitterError::UnknownBeneficiary,
            SplitterError::NothingToWithdraw,
            SplitterError::InvalidShareAllocation(String::new()),
            SplitterError::TransferFailed(String::new()),
            SplitterError::MismatchedInput {
                beneficiaries: 1,
                shares: 2,
            },
            SplitterError::DuplicateBeneficiary(String::new()),
            SplitterError::StableTokenNotConfigured,
            SplitterError::Overflow,
            SplitterError::CorruptSnapshot(String::new()),
        ];
        let mut codes: Vec<i32> = all.into_iter().map(|e| RpcError::from(e).code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 11);
        assert!(codes.iter().all(|c| (-32080..=-32070).contains(c)));
    }

    #[test]
    fn test_unauthenticated_code_is_outside_pool_range() {
        let err = RpcError::unauthenticated("no session");
        assert_eq!(err.code, -32081);
        assert_eq!(err.message, "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_socket_is_owner_only() {
        let suffix: u64 = rand::random();
        let dir = std::env::temp_dir().join(format!("yousplit-bind-{suffix:016x}"));
        std::fs::create_dir_all(&dir).expect("dir");
        let path = dir.join("yousplit.sock");

        let _listener = bind_socket(&path).expect("bind");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_rpc_response_success() {
        let resp = RpcResponse::success(
            serde_json::json!(1),
            serde_json::json!({"total": "1000"}),
        );
        assert!(resp.result.is_some());
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_rpc_response_error() {
        let resp = RpcResponse::error(
            serde_json::json!(1),
            RpcError::internal_error("test"),
        );
        assert!(resp.result.is_none());
        assert!(resp.error.is_some());
    }
}
