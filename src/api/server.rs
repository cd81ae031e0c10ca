//! Gateway server lifecycle: bind → spawn background task → return a handle
//! with a shutdown channel.

use std::net::SocketAddr;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::router::build_router;
use crate::api::types::ApiContext;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Failed to read server address: {0}")]
    LocalAddr(std::io::Error),
}

/// Metadata for a running gateway instance.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    pub instance_id: String,
    pub addr: SocketAddr,
    pub started_at: String,
}

/// Handle to a running gateway.
pub struct GatewayServer {
    pub info: ServerInfo,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl GatewayServer {
    /// Ask the server to stop accepting connections and drain.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Gateway shutdown signal sent");
        }
    }

    /// Wait until the server task has finished.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Gateway task ended abnormally: {e}");
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Start the gateway on the configured bind address.
pub async fn start_server(ctx: ApiContext) -> Result<GatewayServer, ServerError> {
    let addr = ctx.config.bind_addr;
    start_server_on(ctx, addr).await
}

/// Start the gateway on a specific address (port 0 picks an ephemeral port).
pub async fn start_server_on(
    ctx: ApiContext,
    addr: SocketAddr,
) -> Result<GatewayServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let app = build_router(ctx);

    let info = ServerInfo {
        instance_id: Uuid::new_v4().to_string(),
        addr,
        started_at: chrono::Utc::now().to_rfc3339(),
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Gateway received shutdown signal");
        };

        tracing::info!(%addr, "Gateway listening");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Gateway server error: {e}");
        }

        tracing::info!("Gateway stopped");
    });

    Ok(GatewayServer {
        info,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::GatewayConfig;
    use crate::db::open_memory_database;
    use crate::identity::MockIdentityProvider;

    fn test_ctx() -> ApiContext {
        ApiContext::new(
            GatewayConfig::local("https://project.supabase.co", "anon"),
            Arc::new(MockIdentityProvider::new()),
            open_memory_database().unwrap(),
        )
    }

    fn loopback() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let mut server = start_server_on(test_ctx(), loopback())
            .await
            .expect("server should start");

        assert!(server.info.addr.port() > 0);
        assert!(!server.info.instance_id.is_empty());

        let url = format!("http://{}/api/health", server.info.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn protected_route_redirects_over_the_wire() {
        let mut server = start_server_on(test_ctx(), loopback())
            .await
            .expect("server should start");

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let resp = client
            .get(format!("http://{}/dashboard", server.info.addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()["location"], "/auth/login");

        server.shutdown();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let server = start_server_on(test_ctx(), loopback()).await.unwrap();
        let err = start_server_on(test_ctx(), server.info.addr).await.err();
        assert!(matches!(err, Some(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut server = start_server_on(test_ctx(), loopback())
            .await
            .expect("server should start");

        server.shutdown();
        server.shutdown(); // Second call should be safe
    }
}
