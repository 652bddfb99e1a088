use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::broadcaster::EventBroadcaster;
use crate::client::Client;
use crate::error::{BroadcasterError, Result};

struct AcceptLoop {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// Unix socket server exposing the live event stream
///
/// Every accepted connection becomes one subscriber of the shared
/// [`EventBroadcaster`].
pub struct EventStreamServer {
    socket_path: PathBuf,
    broadcaster: Arc<EventBroadcaster>,
    accept_loop: Mutex<Option<AcceptLoop>>,
}

impl EventStreamServer {
    pub fn new(socket_path: impl AsRef<Path>, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
            broadcaster,
            accept_loop: Mutex::new(None),
        }
    }

    /// Bind the socket and start accepting clients
    pub async fn start(&self) -> Result<()> {
        let mut accept_loop = self.accept_loop.lock().await;
        if accept_loop.is_some() {
            return Err(BroadcasterError::AlreadyRunning);
        }

        // Remove stale socket file
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;

        // Owner-only access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.socket_path, permissions)?;
        }

        tracing::info!("Event stream server started on {:?} (permissions: 0600)", self.socket_path);

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(accept_clients(
            listener,
            Arc::clone(&self.broadcaster),
            shutdown.clone(),
        ));

        *accept_loop = Some(AcceptLoop { shutdown, task });
        Ok(())
    }

    /// Stop accepting, close every client connection and remove the socket
    pub async fn stop(&self) -> Result<()> {
        let accept_loop = self
            .accept_loop
            .lock()
            .await
            .take()
            .ok_or(BroadcasterError::NotStarted)?;

        accept_loop.shutdown.cancel();
        if let Err(e) = accept_loop.task.await {
            tracing::warn!("Accept task ended abnormally: {}", e);
        }

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        tracing::info!("Event stream server stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.accept_loop.lock().await.is_some()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }
}

async fn accept_clients(
    listener: UnixListener,
    broadcaster: Arc<EventBroadcaster>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    tracing::info!("New client connection accepted");
                    let client = Client::new(stream);
                    tokio::spawn(client.serve(Arc::clone(&broadcaster), shutdown.child_token()));
                }
                Err(e) => {
                    tracing::error!("Failed to accept client: {}", e);
                }
            }
        }
    }
    tracing::info!("Client acceptance task stopped");
}

impl Drop for EventStreamServer {
    fn drop(&mut self) {
        if let Some(accept_loop) = self.accept_loop.get_mut().take() {
            accept_loop.shutdown.cancel();
            // Clean up socket file
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}
