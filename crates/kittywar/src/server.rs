//! `KittyWarServer` builder and server loop.
//!
//! This is the entry point for running a Kitty War server. It ties
//! together all the layers: transport → protocol → session → match.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use kittywar_match::{MatchmakerHandle, spawn_matchmaker};
use kittywar_session::{CardCatalog, ProfileStore};
use kittywar_transport::{DEFAULT_HANDSHAKE_TIMEOUT, TcpTransport};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::KittyWarError;
use crate::handler::handle_connection;

/// Address the server listens on unless told otherwise.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:2056";

/// How long open sessions get to clean up once shutdown starts.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the TCP listener to.
    pub bind_addr: String,

    /// How long a new connection has to send its first byte and, for
    /// WebSocket clients, finish the upgrade.
    pub handshake_timeout: Duration,

    /// How long [`KittyWarServer::run_until`] waits for sessions to forfeit
    /// their matches, log out and close before abandoning them.
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. Nothing in
/// here is mutated after startup; the store does its own locking.
pub(crate) struct ServerState<S: ProfileStore> {
    pub(crate) store: S,
    pub(crate) catalog: CardCatalog,
    pub(crate) matchmaker: MatchmakerHandle,
}

/// Builder for configuring and starting a Kitty War server.
///
/// # Example
///
/// ```rust,ignore
/// use kittywar::prelude::*;
///
/// let server = KittyWarServerBuilder::new()
///     .bind("0.0.0.0:2056")
///     .build(MemoryProfileStore::new())
///     .await?;
/// server.run().await
/// ```
pub struct KittyWarServerBuilder {
    config: ServerConfig,
    catalog: CardCatalog,
}

impl KittyWarServerBuilder {
    /// Creates a new builder with default settings and the built-in catalog.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            catalog: CardCatalog::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the transport detection and WebSocket upgrade timeout.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Sets how long sessions get to clean up during shutdown.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the card catalog served to clients.
    pub fn catalog(mut self, catalog: CardCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Binds the listener and starts the matchmaker.
    pub async fn build<S: ProfileStore>(
        self,
        store: S,
    ) -> Result<KittyWarServer<S>, KittyWarError> {
        let transport = TcpTransport::bind(&self.config.bind_addr)
            .await?
            .with_handshake_timeout(self.config.handshake_timeout);

        let state = Arc::new(ServerState {
            store,
            catalog: self.catalog,
            matchmaker: spawn_matchmaker(),
        });

        Ok(KittyWarServer {
            transport,
            state,
            shutdown_timeout: self.config.shutdown_timeout,
        })
    }
}

impl Default for KittyWarServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Kitty War server.
///
/// Call [`run()`](Self::run) to start accepting connections, or
/// [`run_until()`](Self::run_until) to stop on a signal.
pub struct KittyWarServer<S: ProfileStore> {
    transport: TcpTransport,
    state: Arc<ServerState<S>>,
    shutdown_timeout: Duration,
}

impl<S: ProfileStore> KittyWarServer<S> {
    /// Creates a new builder.
    pub fn builder() -> KittyWarServerBuilder {
        KittyWarServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, KittyWarError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the server accept loop forever.
    pub async fn run(self) -> Result<(), KittyWarError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the server accept loop until `shutdown` resolves.
    ///
    /// Each accepted socket gets its own task, which detects the wire
    /// format, performs the WebSocket upgrade if needed, and then serves
    /// the session until it ends. On shutdown the listener stops
    /// accepting and every session is told to finish: it forfeits its
    /// match, clears its login token and closes its socket. Sessions still
    /// running after the shutdown timeout are aborted.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), KittyWarError>
    where
        F: Future<Output = ()> + Send,
    {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Kitty War server running");

        let (stop_tx, stop_rx) = watch::channel(false);
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(pending) => {
                        let state = Arc::clone(&self.state);
                        let mut stop = stop_rx.clone();
                        sessions.spawn(async move {
                            let id = pending.id();
                            let conn = tokio::select! {
                                established = pending.establish() => match established {
                                    Ok(conn) => conn,
                                    Err(e) => {
                                        tracing::debug!(%id, error = %e, "connection setup failed");
                                        return;
                                    }
                                },
                                () = stopped(&mut stop) => return,
                            };
                            if let Err(e) = handle_connection(conn, state, stop).await {
                                tracing::debug!(%id, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                // Reap finished sessions so the set only holds live ones.
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}
            }
        }

        drop(self.transport);
        tracing::info!(sessions = sessions.len(), "shutting down, closing all sessions");
        let _ = stop_tx.send(true);

        let drained = tokio::time::timeout(self.shutdown_timeout, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                remaining = sessions.len(),
                "sessions did not finish in time, aborting"
            );
            sessions.shutdown().await;
        }

        tracing::info!("Kitty War server stopped");
        Ok(())
    }
}

/// Resolves once the server has started shutting down.
pub(crate) async fn stopped(stop: &mut watch::Receiver<bool>) {
    // An error means the server is gone, which is a stop as well.
    let _ = stop.wait_for(|stopping| *stopping).await;
}
