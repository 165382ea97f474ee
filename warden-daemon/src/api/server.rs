//! JSON-RPC server over a Unix socket.
//!
//! Requests and responses are newline-delimited JSON objects. Parameters may be
//! passed positionally (`[kind, profile]`) or by name (`{"kind": .., "profile": ..}`).

use super::handlers::{ApiState, WardenApiImpl, WardenApiServer};
use anyhow::{Context, Result};
use jsonrpsee::core::RpcResult;
use jsonrpsee::types::{ErrorCode, ErrorObject};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to a running RPC server
pub struct ServerHandle {
    shutdown: Arc<Mutex<Option<tokio::sync::mpsc::Sender<()>>>>,
    join_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    stopped: watch::Receiver<bool>,
}

/// Start the JSON-RPC server on a Unix socket.
///
/// A stale socket file at `socket_path` is removed first.
pub async fn start_server(socket_path: &Path, state: ApiState) -> Result<ServerHandle> {
    // Remove a stale socket left by a previous run
    if socket_path.exists() {
        warn!("Removing existing socket at {:?}", socket_path);
        std::fs::remove_file(socket_path)
            .with_context(|| format!("Failed to remove existing socket at {:?}", socket_path))?;
    }

    // Ensure parent directory exists
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create socket directory {:?}", parent))?;
    }

    info!("Starting JSON-RPC server on {:?}", socket_path);

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind Unix socket at {:?}", socket_path))?;

    let api = Arc::new(WardenApiImpl::new(state));

    // Shutdown request in, stopped notification out
    let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
    let (stopped_tx, stopped_rx) = watch::channel(false);

    let server_task: JoinHandle<()> = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = rx.recv() => {
                    debug!("Server shutdown signal received");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, _addr)) => {
                            let api = api.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_connection(stream, api).await {
                                    warn!("Connection handler error: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            warn!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        let _ = stopped_tx.send(true);
        info!("JSON-RPC server stopped");
    });

    info!("JSON-RPC server started and listening");

    Ok(ServerHandle {
        shutdown: Arc::new(Mutex::new(Some(tx))),
        join_handle: Arc::new(Mutex::new(Some(server_task))),
        stopped: stopped_rx,
    })
}

async fn handle_connection(mut stream: UnixStream, api: Arc<WardenApiImpl>) -> Result<()> {
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;

        if n == 0 {
            // Connection closed
            break;
        }

        debug!("Received request ({} bytes)", line.trim_end().len());

        let response = match serde_json::from_str::<Value>(&line) {
            Ok(request) => process_request(request, &api).await,
            Err(e) => serde_json::json!({
                "jsonrpc": "2.0",
                "error": {
                    "code": ErrorCode::ParseError.code(),
                    "message": format!("Parse error: {}", e)
                },
                "id": null
            }),
        };

        writer.write_all(response.to_string().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}

async fn process_request(request: Value, api: &WardenApiImpl) -> Value {
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    let method = match request.get("method").and_then(|m| m.as_str()) {
        Some(m) => m,
        None => {
            return serde_json::json!({
                "jsonrpc": "2.0",
                "error": {
                    "code": ErrorCode::InvalidRequest.code(),
                    "message": "Invalid Request: missing method"
                },
                "id": id
            });
        }
    };

    // Absent params behave like an empty positional list
    let params = request.get("params").cloned().unwrap_or(Value::Array(vec![]));

    let result = match method {
        "authenticate" => match (
            param(&params, 0, "kind"),
            param(&params, 1, "profile"),
        ) {
            (Ok(kind), Ok(profile)) => respond(api.authenticate(kind, profile).await),
            (Err(e), _) | (_, Err(e)) => Err(e),
        },
        "encode_session" => match param(&params, 0, "principal") {
            Ok(principal) => respond(api.encode_session(principal).await),
            Err(e) => Err(e),
        },
        "decode_session" => match param(&params, 0, "reference") {
            Ok(reference) => respond(api.decode_session(reference).await),
            Err(e) => Err(e),
        },
        "authorization_url" => match param(&params, 0, "kind") {
            Ok(kind) => respond(api.authorization_url(kind).await),
            Err(e) => Err(e),
        },
        "complete_login" => match (
            param(&params, 0, "kind"),
            param(&params, 1, "code"),
            param(&params, 2, "state"),
        ) {
            (Ok(kind), Ok(code), Ok(state)) => {
                respond(api.complete_login(kind, code, state).await)
            }
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => Err(e),
        },
        _ => Err(ErrorObject::owned(
            ErrorCode::MethodNotFound.code(),
            "Method not found",
            None::<()>,
        )),
    };

    match result {
        Ok(value) => serde_json::json!({
            "jsonrpc": "2.0",
            "result": value,
            "id": id
        }),
        Err(error) => serde_json::json!({
            "jsonrpc": "2.0",
            "error": {
                "code": error.code(),
                "message": error.message()
            },
            "id": id
        }),
    }
}

/// Pull one parameter out of a positional or named parameter list.
fn param<T: DeserializeOwned>(params: &Value, position: usize, name: &str) -> RpcResult<T> {
    let value = match params {
        Value::Array(arr) => arr.get(position),
        Value::Object(map) => map.get(name),
        _ => None,
    }
    .ok_or_else(|| invalid_params(format!("missing parameter `{}`", name)))?;

    serde_json::from_value(value.clone())
        .map_err(|e| invalid_params(format!("invalid parameter `{}`: {}", name, e)))
}

fn respond<T: Serialize>(result: RpcResult<T>) -> RpcResult<Value> {
    let value = result?;
    serde_json::to_value(value).map_err(|e| {
        ErrorObject::owned(
            ErrorCode::InternalError.code(),
            format!("Failed to serialize response: {}", e),
            None::<()>,
        )
    })
}

fn invalid_params(message: String) -> ErrorObject<'static> {
    ErrorObject::owned(ErrorCode::InvalidParams.code(), message, None::<()>)
}

impl ServerHandle {
    /// Stop the server and wait for the accept loop to exit.
    pub async fn stop(&self) -> Result<()> {
        if let Some(tx) = self.shutdown.lock().await.take() {
            let _ = tx.send(()).await;
        }

        if let Some(handle) = self.join_handle.lock().await.take() {
            handle.await?;
        }

        Ok(())
    }

    /// Wait until the accept loop has exited, however it was stopped.
    pub async fn stopped(&self) {
        let mut stopped = self.stopped.clone();
        // A dropped sender means the loop is gone as well.
        let _ = stopped.wait_for(|done| *done).await;
    }
}
