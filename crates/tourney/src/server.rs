//! `TourneyServer` builder and server loop.
//!
//! This is the entry point for running a voting server. It ties together
//! the layers: transport → protocol → store → fan-out.

use std::net::SocketAddr;
use std::sync::Arc;

use tourney_protocol::JsonCodec;
use tourney_room::{Rules, Store, Subscription};
use tourney_transport::{Transport, WebSocketTransport};

use crate::config::{DEFAULT_BIND_ADDR, ServerConfig};
use crate::handler::handle_connection;
use crate::registry::Registry;
use crate::TourneyError;

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) store: Store,
    pub(crate) registry: Arc<Registry>,
    pub(crate) codec: JsonCodec,
    _fanout: Subscription,
}

impl ServerState {
    /// Wires a registry to `store` as its fan-out subscriber.
    pub(crate) fn new(store: Store) -> Self {
        let registry = Arc::new(Registry::new(store.snapshot()));
        let sink = Arc::clone(&registry);
        let fanout = store.subscribe(move |snapshot| sink.publish(snapshot));
        Self {
            store,
            registry,
            codec: JsonCodec,
            _fanout: fanout,
        }
    }
}

/// Builder for configuring and starting a Tourney server.
///
/// # Example
///
/// ```rust,no_run
/// use tourney::prelude::*;
///
/// # async fn run() -> Result<(), TourneyError> {
/// let server = TourneyServer::builder()
///     .bind("0.0.0.0:8090")
///     .rules(Rules::with_vote_policy(VotePolicy::Repeated))
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct TourneyServerBuilder {
    bind_addr: String,
    rules: Rules,
    store: Option<Store>,
}

impl TourneyServerBuilder {
    pub fn new() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            rules: Rules::default(),
            store: None,
        }
    }

    /// Takes bind address and rules from `config`.
    pub fn config(mut self, config: &ServerConfig) -> Self {
        self.bind_addr = config.bind_addr.clone();
        self.rules = config.rules.clone();
        self
    }

    /// Sets the address to bind the server to. Port `0` picks a free one.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn rules(mut self, rules: Rules) -> Self {
        self.rules = rules;
        self
    }

    /// Serves an existing store instead of a fresh one. The store's own
    /// rules apply; [`rules`](Self::rules) is ignored.
    pub fn store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    /// Binds the listener. The server does not accept connections until
    /// [`TourneyServer::run`].
    pub async fn build(self) -> Result<TourneyServer, TourneyError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;
        let store = self.store.unwrap_or_else(|| Store::new(self.rules));

        Ok(TourneyServer {
            transport,
            state: Arc::new(ServerState::new(store)),
        })
    }
}

impl Default for TourneyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Tourney server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TourneyServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl TourneyServer {
    pub fn builder() -> TourneyServerBuilder {
        TourneyServerBuilder::new()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TourneyError> {
        Ok(self.transport.local_addr()?)
    }

    /// The store this server dispatches into. Actions dispatched through
    /// it reach connected clients like any other.
    pub fn store(&self) -> &Store {
        &self.state.store
    }

    /// Number of currently open client connections.
    pub fn connection_count(&self) -> usize {
        self.state.registry.connection_count()
    }

    /// Runs the accept loop, spawning a handler task per connection.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), TourneyError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Tourney server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
