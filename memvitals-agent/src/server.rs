//! Unix-socket transport for the query service.
//!
//! One task per connection; within a connection, requests are answered
//! strictly in order and each query is computed to completion before the
//! next frame is read. Connections are independent: a malformed frame
//! closes only the connection it arrived on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info, warn};

use crate::handlers::QueryHandler;
use crate::protocol::{read_frame, write_frame};
use memvitals_proto::MethodCall;

/// Listening end of the diagnostic query service.
pub struct QueryServer {
    listener: UnixListener,
    socket_path: PathBuf,
    handler: Arc<QueryHandler>,
}

impl QueryServer {
    /// Bind the listening socket, replacing a stale socket file if present.
    pub fn bind(path: &Path, handler: Arc<QueryHandler>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create socket directory {}", parent.display())
            })?;
        }

        match std::fs::remove_file(path) {
            Ok(()) => warn!(path = %path.display(), "Removed stale socket file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove stale socket {}", path.display()))
            }
        }

        let listener = UnixListener::bind(path)
            .with_context(|| format!("Failed to bind socket {}", path.display()))?;

        info!(path = %path.display(), "Listening for diagnostic queries");

        Ok(Self {
            listener,
            socket_path: path.to_path_buf(),
            handler,
        })
    }

    /// Accept connections until cancelled or the listener fails.
    pub async fn run(&self) -> Result<()> {
        loop {
            let (stream, _addr) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;

            debug!("Caller connected");

            let handler = self.handler.clone();
            tokio::spawn(async move {
                serve_connection(stream, handler).await;
            });
        }
    }

    /// Remove the socket file on shutdown.
    pub fn cleanup(&self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    path = %self.socket_path.display(),
                    error = %e,
                    "Failed to remove socket file"
                );
            }
        }
    }
}

/// Serve one caller until it disconnects or sends a malformed frame.
async fn serve_connection(mut stream: UnixStream, handler: Arc<QueryHandler>) {
    loop {
        match read_frame::<_, MethodCall>(&mut stream).await {
            Ok(Some(call)) => {
                debug!(id = %call.id, method = %call.method, "Received query");

                let reply = handler.handle(call);
                if let Err(e) = write_frame(&mut stream, &reply).await {
                    warn!(error = %e, "Failed to write reply");
                    return;
                }
            }
            Ok(None) => {
                debug!("Caller disconnected");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Malformed query frame, closing connection");
                return;
            }
        }
    }
}
