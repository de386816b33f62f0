//! WebSocket Contest Server
//!
//! Async WebSocket server in front of the contest engine.
//! Handles authentication, request routing, and `ContestStarted` fan-out.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, RwLock, broadcast};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn, error, debug, instrument};

use crate::contest::{
    BroadcastSink, ContestConfig, ContestEngine, MemoryLedger, Snapshot, SnapshotError,
};
use crate::core::account::AccountId;
use crate::network::auth::{authenticate, AuthConfig};
use crate::network::handler::Handler;
use crate::network::protocol::{AuthRequest, AuthResult, ClientMessage, ErrorCode, ServerMessage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Idle time after which a connection is dropped.
    pub connection_timeout: Duration,
    /// Minting authority.
    pub owner: AccountId,
    /// Engine settings.
    pub contest: ContestConfig,
    /// Where to persist state. In-memory only if unset.
    pub state_path: Option<PathBuf>,
    /// Buffered notifications per subscriber.
    pub event_capacity: usize,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            connection_timeout: Duration::from_secs(300),
            owner: AccountId::default(),
            contest: ContestConfig::default(),
            state_path: None,
            event_capacity: 256,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables. `PBT_OWNER` is required.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let mut config = Self::default();

        let owner = var("PBT_OWNER").ok_or_else(|| ServerError::Config("PBT_OWNER is not set".into()))?;
        config.owner = owner
            .parse()
            .map_err(|e| ServerError::Config(format!("PBT_OWNER: {}", e)))?;

        if let Some(addr) = var("PBT_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| ServerError::Config(format!("PBT_BIND_ADDR: {}", e)))?;
        }
        if let Some(max) = var("PBT_MAX_CONNECTIONS") {
            config.max_connections = max
                .parse()
                .map_err(|e| ServerError::Config(format!("PBT_MAX_CONNECTIONS: {}", e)))?;
        }
        if let Some(min) = var("PBT_MIN_VALUE") {
            config.contest.min_value = min
                .parse()
                .map_err(|e| ServerError::Config(format!("PBT_MIN_VALUE: {}", e)))?;
        }
        config.state_path = var("PBT_STATE_PATH").filter(|p| !p.is_empty()).map(PathBuf::from);

        Ok(config)
    }
}

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Persisted state could not be loaded.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Connected client state.
struct ConnectedClient {
    /// Account (after auth).
    account: Option<AccountId>,
    /// Connection time.
    connected_at: Instant,
}

/// The contest server.
pub struct ContestServer {
    /// Server configuration.
    config: ServerConfig,
    /// Caller authentication settings.
    auth: Arc<AuthConfig>,
    /// Serialized engine access.
    handler: Arc<Handler<BroadcastSink>>,
    /// Notification fan-out.
    events: BroadcastSink,
    /// Connected clients.
    clients: Arc<RwLock<BTreeMap<SocketAddr, ConnectedClient>>>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl ContestServer {
    /// Create a server, restoring persisted state if a snapshot exists.
    pub fn new(config: ServerConfig, auth: AuthConfig) -> Result<Self, ServerError> {
        let (shutdown_tx, _) = broadcast::channel(1);
        let events = BroadcastSink::new(config.event_capacity.max(1));

        let restored = match &config.state_path {
            Some(path) => Snapshot::load(path)?,
            None => None,
        };

        let engine = match restored {
            Some(snapshot) => {
                if snapshot.owner != config.owner {
                    return Err(SnapshotError::OwnerMismatch {
                        expected: config.owner,
                        found: snapshot.owner,
                    }
                    .into());
                }
                info!(
                    "Restored state: {} accounts, supply {}",
                    snapshot.balances.len(),
                    snapshot.total_supply
                );
                snapshot.restore(config.contest, events.clone())?
            }
            None => ContestEngine::new(config.contest, MemoryLedger::new(config.owner), events.clone()),
        };

        if !auth.is_configured() {
            if auth.insecure_allow_claimed {
                warn!("Token validation disabled; trusting self-declared accounts");
            } else {
                warn!("Authentication not configured; mint and unlock are unavailable");
            }
        }

        Ok(Self {
            handler: Arc::new(Handler::new(engine, config.state_path.clone())),
            config,
            auth: Arc::new(auth),
            events,
            clients: Arc::new(RwLock::new(BTreeMap::new())),
            shutdown_tx,
        })
    }

    /// Bind and run the server until shutdown.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Run the accept loop on an already bound listener.
    #[instrument(skip_all)]
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!("Contest server listening on {}", listener.local_addr()?);
        info!("Owner: {}", self.config.owner);

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let clients_count = self.clients.read().await.len();
                            if clients_count >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }

                            info!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let clients = self.clients.clone();
        let handler = self.handler.clone();
        let auth = self.auth.clone();
        let version = self.config.version.clone();
        let idle_timeout = self.config.connection_timeout;
        let mut events_rx = self.events.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(64);

            // Register client
            clients.write().await.insert(addr, ConnectedClient {
                account: None,
                connected_at: Instant::now(),
            });

            // Spawn message sender task
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut account: Option<AccountId> = None;
            let idle = tokio::time::sleep(idle_timeout);
            tokio::pin!(idle);

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);

                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("Invalid message from {}: {}", addr, e);
                                        let _ = msg_tx.send(ServerMessage::error(
                                            ErrorCode::InvalidInput,
                                            "Invalid message format",
                                        )).await;
                                        continue;
                                    }
                                };

                                let response = match client_msg {
                                    ClientMessage::Auth(req) => {
                                        let (resolved, response) = Self::handle_auth(addr, req, &auth, &version);
                                        if let Some(resolved) = resolved {
                                            account = Some(resolved);
                                            if let Some(client) = clients.write().await.get_mut(&addr) {
                                                client.account = Some(resolved);
                                            }
                                        }
                                        response
                                    }
                                    other => handler.handle(account, other).await,
                                };

                                if msg_tx.send(response).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(_))) => {
                                let _ = msg_tx.send(ServerMessage::error(
                                    ErrorCode::InvalidInput,
                                    "Binary frames are not supported",
                                )).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                error!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    event = events_rx.recv() => {
                        match event {
                            Ok(event) => {
                                let _ = msg_tx.send(ServerMessage::ContestStarted(event)).await;
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                warn!("Client {} missed {} notifications", addr, skipped);
                            }
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    _ = &mut idle => {
                        info!("Client {} idle for {:?}, disconnecting", addr, idle_timeout);
                        break;
                    }
                    _ = shutdown_rx.recv() => {
                        let _ = msg_tx.send(ServerMessage::Shutdown {
                            reason: "Server shutting down".to_string(),
                        }).await;
                        break;
                    }
                }
            }

            // Let queued responses drain before dropping the socket.
            drop(msg_tx);
            if tokio::time::timeout(Duration::from_secs(1), sender_task).await.is_err() {
                debug!("Sender for {} did not drain in time", addr);
            }

            if let Some(client) = clients.write().await.remove(&addr) {
                info!("Client {} cleaned up after {:?}", addr, client.connected_at.elapsed());
            }
        });
    }

    /// Handle authentication. Returns the resolved account on success.
    fn handle_auth(
        addr: SocketAddr,
        req: AuthRequest,
        auth: &AuthConfig,
        version: &str,
    ) -> (Option<AccountId>, ServerMessage) {
        match authenticate(req.token.as_deref(), req.account, auth) {
            Ok(account) => {
                let session_id = uuid::Uuid::new_v4().to_string();
                info!("Client {} authenticated as {} (session {})", addr, account, session_id);
                let result = AuthResult {
                    success: true,
                    account: Some(account),
                    session_id: Some(session_id),
                    error: None,
                    server_version: version.to_string(),
                };
                (Some(account), ServerMessage::AuthResult(result))
            }
            Err(e) => {
                debug!("Client {} failed authentication: {}", addr, e);
                let result = AuthResult {
                    success: false,
                    account: None,
                    session_id: None,
                    error: Some(e.to_string()),
                    server_version: version.to_string(),
                };
                (None, ServerMessage::AuthResult(result))
            }
        }
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub async fn connection_count(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Get authenticated connection count.
    pub async fn authenticated_count(&self) -> usize {
        self.clients.read().await.values().filter(|c| c.account.is_some()).count()
    }

    /// Request handler shared by all connections.
    pub fn handler(&self) -> &Arc<Handler<BroadcastSink>> {
        &self.handler
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_tungstenite::connect_async;
    use crate::contest::ContestRequest;
    use crate::core::signature::{sign_alpha, sign_beta, Keypair};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn test_config(owner: AccountId) -> ServerConfig {
        ServerConfig {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            owner,
            ..Default::default()
        }
    }

    fn insecure_auth() -> AuthConfig {
        AuthConfig {
            insecure_allow_claimed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.max_connections, 1000);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.contest.min_value, 1);
        assert!(config.state_path.is_none());
    }

    #[test]
    fn test_config_from_lookup() {
        let owner = AccountId::new([7; 20]);
        let config = ServerConfig::from_lookup(lookup(&[
            ("PBT_OWNER", &owner.to_string()),
            ("PBT_BIND_ADDR", "127.0.0.1:9000"),
            ("PBT_MAX_CONNECTIONS", "5"),
            ("PBT_MIN_VALUE", "2"),
            ("PBT_STATE_PATH", "/tmp/pbt.bin"),
        ]))
        .unwrap();

        assert_eq!(config.owner, owner);
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.contest.min_value, 2);
        assert_eq!(config.state_path, Some(PathBuf::from("/tmp/pbt.bin")));
    }

    #[test]
    fn test_config_requires_owner() {
        assert!(matches!(ServerConfig::from_lookup(lookup(&[])), Err(ServerError::Config(_))));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("PBT_OWNER", "not-hex")])),
            Err(ServerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = ContestServer::new(test_config(AccountId::new([1; 20])), AuthConfig::default()).unwrap();
        assert_eq!(server.connection_count().await, 0);
        assert_eq!(server.authenticated_count().await, 0);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_restores_snapshot_and_checks_owner() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        let owner = AccountId::new([1; 20]);
        let holder = AccountId::new([2; 20]);

        let mut engine = ContestEngine::new(ContestConfig::default(), MemoryLedger::new(owner), ());
        engine.mint(&holder, 25, &owner).unwrap();
        Snapshot::capture(&engine).save(&path).unwrap();

        let config = ServerConfig {
            state_path: Some(path.clone()),
            ..test_config(owner)
        };
        let server = ContestServer::new(config.clone(), AuthConfig::default()).unwrap();
        let balance = server.handler().with_engine(|e| e.balance_of(&holder)).await;
        assert_eq!(balance, 25);

        let wrong_owner = ServerConfig {
            owner: AccountId::new([9; 20]),
            ..config
        };
        assert!(matches!(
            ContestServer::new(wrong_owner, AuthConfig::default()),
            Err(ServerError::Snapshot(SnapshotError::OwnerMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_websocket_contest_round_trip() {
        let owner = Keypair::from_seed("Owner");
        let a = Keypair::from_seed("Alice");
        let b = Keypair::from_seed("Bob");

        let server = Arc::new(ContestServer::new(test_config(owner.account_id()), insecure_auth()).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let running = server.clone();
        let server_task = tokio::spawn(async move { running.serve(listener).await });

        let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

        async fn exchange(
            ws: &mut tokio_tungstenite::WebSocketStream<
                tokio_tungstenite::MaybeTlsStream<TcpStream>,
            >,
            msg: &ClientMessage,
        ) -> ServerMessage {
            ws.send(Message::Text(msg.to_json().unwrap())).await.unwrap();
            loop {
                match ws.next().await.unwrap().unwrap() {
                    Message::Text(text) => return ServerMessage::from_json(&text).unwrap(),
                    _ => continue,
                }
            }
        }

        let auth = ClientMessage::Auth(AuthRequest {
            token: None,
            account: Some(owner.account_id()),
            client_version: "test".into(),
        });
        let response = exchange(&mut ws, &auth).await;
        assert!(matches!(response, ServerMessage::AuthResult(AuthResult { success: true, .. })));

        let mint = ClientMessage::Mint { to: a.account_id(), amount: 50 };
        assert!(matches!(exchange(&mut ws, &mint).await, ServerMessage::Minted { balance: 50, .. }));

        let now = chrono::Utc::now().timestamp() as u64;
        let alpha_signature = sign_alpha(&a, &b.account_id(), 10, now - 60, now + 60);
        let beta_signature = sign_beta(&b, &alpha_signature);
        let contest = ClientMessage::Contest(ContestRequest {
            from: a.account_id(),
            to: b.account_id(),
            value: 10,
            t0: now - 60,
            t1: now + 60,
            alpha_signature,
            beta_signature,
        });

        // The direct response and the broadcast may arrive in either order.
        let first = exchange(&mut ws, &contest).await;
        let second = match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => ServerMessage::from_json(&text).unwrap(),
            other => panic!("unexpected frame: {:?}", other),
        };
        let accepted = [&first, &second]
            .iter()
            .any(|m| matches!(m, ServerMessage::ContestAccepted(e) if e.value == 10));
        let broadcast = [&first, &second]
            .iter()
            .any(|m| matches!(m, ServerMessage::ContestStarted(e) if e.from == a.account_id()));
        assert!(accepted && broadcast);

        server.shutdown();
        server_task.await.unwrap().unwrap();
    }
}
