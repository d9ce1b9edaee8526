//! HTTP server lifecycle: bind, serve, graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

const MIN_TIMEOUT: Duration = Duration::from_secs(1);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("graceful shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Server settings. Timeouts below one second fall back to their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    #[serde(with = "seconds")]
    pub request_timeout: Duration,
    #[serde(with = "seconds")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ServerConfig {
    fn normalized(mut self) -> Self {
        if self.request_timeout < MIN_TIMEOUT {
            self.request_timeout = DEFAULT_REQUEST_TIMEOUT;
        }
        if self.shutdown_timeout < MIN_TIMEOUT {
            self.shutdown_timeout = DEFAULT_SHUTDOWN_TIMEOUT;
        }
        self
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

/// An axum router plus the settings to serve it.
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config: config.normalized(),
            router,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the listening socket.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let listener = TcpListener::bind(&self.config.address)
            .await
            .map_err(|source| ServerError::Bind {
                address: self.config.address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            address: self.config.address.clone(),
            source,
        })?;

        let router = self.router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(self.config.request_timeout)),
        );

        Ok(BoundServer {
            listener,
            local_addr,
            router,
            shutdown_timeout: self.config.shutdown_timeout,
        })
    }

    /// Bind and serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServerError> {
        self.bind().await?.serve().await
    }
}

/// A server whose socket is bound but not yet accepting.
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
    shutdown_timeout: Duration,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until SIGINT or SIGTERM, then shut down gracefully.
    pub async fn serve(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve until `signal` resolves.
    ///
    /// After the signal the listener stops accepting and in-flight requests
    /// get `shutdown_timeout` to complete.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
        let graceful = async move {
            signal.await;
            let _ = signalled_tx.send(());
        };

        tracing::info!(address = %self.local_addr, "HTTP server started");

        let serve = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(graceful)
            .into_future();
        let mut serve = std::pin::pin!(serve);

        tokio::select! {
            res = &mut serve => return res.map_err(ServerError::Serve),
            _ = signalled_rx => {}
        }

        tracing::info!(timeout = ?self.shutdown_timeout, "HTTP server shutting down");

        match tokio::time::timeout(self.shutdown_timeout, serve).await {
            Ok(res) => {
                res.map_err(ServerError::Serve)?;
                tracing::info!("HTTP server stopped");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.shutdown_timeout, "HTTP server shutdown deadline elapsed");
                Err(ServerError::ShutdownTimeout(self.shutdown_timeout))
            }
        }
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
