//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC method calls to the command handlers.

use std::path::PathBuf;
use std::sync::Arc;

use gitpaid_lookup::LookupError;
use gitpaid_topic::TopicError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::DaemonState;

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
#[derive(Debug, Serialize, Deserialize, Clone)]
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
    fn with_detail(code: i32, message: &str, detail: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::with_detail(-32602, "INVALID_PARAMS", detail)
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::with_detail(-32603, "INTERNAL_ERROR", detail)
    }

    // Application errors

    /// Unsupported query shape (-32020).
    pub fn unsupported_query(query: &str) -> Self {
        Self {
            code: -32020,
            message: "UNSUPPORTED_QUERY".to_string(),
            data: Some(serde_json::json!({"query": query})),
        }
    }

    /// Query addressed to another service (-32021).
    pub fn unsupported_service(service: &str) -> Self {
        Self {
            code: -32021,
            message: "UNSUPPORTED_SERVICE".to_string(),
            data: Some(serde_json::json!({"service": service})),
        }
    }

    /// No query given (-32022).
    pub fn missing_query() -> Self {
        Self {
            code: -32022,
            message: "MISSING_QUERY".to_string(),
            data: None,
        }
    }

    /// Record store failure (-32030).
    pub fn store_unavailable(detail: &str) -> Self {
        Self::with_detail(-32030, "STORE_UNAVAILABLE", detail)
    }

    /// Transaction or script could not be decoded (-32031).
    pub fn decode_failure(detail: &str) -> Self {
        Self::with_detail(-32031, "DECODE_FAILURE", detail)
    }

    /// Signing token unknown, used or expired (-32040).
    pub fn token_invalid() -> Self {
        Self {
            code: -32040,
            message: "TOKEN_INVALID".to_string(),
            data: None,
        }
    }
}

impl From<LookupError> for RpcError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::MissingQuery => Self::missing_query(),
            LookupError::UnsupportedService { service } => Self::unsupported_service(&service),
            LookupError::UnsupportedQuery { query } => Self::unsupported_query(&query),
            LookupError::StoreUnavailable(e) => Self::store_unavailable(&e.to_string()),
            LookupError::Serialization(e) => Self::internal_error(&e.to_string()),
        }
    }
}

impl From<TopicError> for RpcError {
    fn from(err: TopicError) -> Self {
        Self::decode_failure(&err.to_string())
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
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

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            break; // EOF
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(&state, &line).await;

        let mut response_json = serde_json::to_string(&response)?;
        response_json.push('\n');
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Parse one request line and dispatch it.
pub async fn handle_line(state: &Arc<DaemonState>, line: &str) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) if request.jsonrpc != "2.0" => {
            RpcResponse::error(request.id, RpcError::invalid_request())
        }
        Ok(request) => dispatch_request(state.clone(), request).await,
        Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
    }
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Topic manager
        "identify_admissible_outputs" => {
            commands::topic::identify_admissible_outputs(&state, &request.params).await
        }
        "output_admitted" => commands::topic::output_admitted(&state, &request.params).await,
        "output_spent" => commands::topic::output_spent(&state, &request.params).await,
        "output_deleted" => commands::topic::output_deleted(&state, &request.params).await,

        // Lookup service
        "lookup" => commands::lookup::lookup(&state, &request.params).await,
        "get_documentation" => commands::lookup::get_documentation(&state, &request.params).await,
        "get_metadata" => commands::lookup::get_metadata(&state, &request.params).await,

        // Certifier
        "issue_signing_token" => {
            commands::certifier::issue_signing_token(&state, &request.params).await
        }
        "redeem_signing_token" => {
            commands::certifier::redeem_signing_token(&state, &request.params).await
        }

        // Diagnostics
        "get_stats" => commands::diagnostics::get_stats(&state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
