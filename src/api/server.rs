//! API server lifecycle: bind, spawn the axum server in a background task,
//! return a handle with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Failed to read bound address: {0}")]
    LocalAddr(std::io::Error),
}

/// Handle to a running API server.
pub struct ApiServer {
    addr: SocketAddr,
    started_at: chrono::DateTime<chrono::Utc>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ApiServer {
    /// The address actually bound (resolves port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    /// Signal a graceful shutdown. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!(addr = %self.addr, "API server shutdown signal sent");
        }
    }

    /// Signal shutdown and wait for in-flight requests to drain.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("API server task failed: {e}");
            }
        }
    }
}

/// Bind `addr` and serve the API until shutdown.
pub async fn start_server_on(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let app = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        started_at: chrono::Utc::now(),
        shutdown_tx: Some(shutdown_tx),
        task: Some(task),
    })
}
