//! Test helpers for integration tests
//!
//! Provides a gateway bound to an ephemeral port, credential helpers and
//! raw WebSocket access for protocol-level assertions.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chat_client::{ClientConfig, GatewayClient};
use chat_common::{AppConfig, JwtService};
use chat_core::{Message as StoredMessage, NewMessage, ReadTarget, RepoResult, Snowflake, Store};
use chrono::{DateTime, Utc};
use chat_db::MemoryBackend;
use chat_gateway::protocol::GatewayMessage;
use chat_gateway::{create_app, GatewayState};
use chat_service::ServiceContext;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{seed, TEST_JWT_SECRET};

/// Raw client socket
pub type RawSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long tests wait for an expected frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long tests wait before concluding nothing arrives
pub const QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub backend: Arc<MemoryBackend>,
    pub state: GatewayState,
    jwt: JwtService,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with the fixture data
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config(&[])?).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        Self::start_with_store(config, |backend| backend as Arc<dyn Store>).await
    }

    /// Start a test server whose Store is `wrap` applied to the fixture backend.
    /// The Directory stays the bare backend.
    pub async fn start_with_store<F>(config: AppConfig, wrap: F) -> Result<Self>
    where
        F: FnOnce(Arc<MemoryBackend>) -> Arc<dyn Store>,
    {
        chat_common::try_init_tracing();

        let backend = Arc::new(MemoryBackend::new(config.snowflake.worker_id));
        seed(&backend);

        let jwt = JwtService::new(&config.jwt.secret, config.jwt.access_token_expiry);
        let context = ServiceContext::builder()
            .directory(backend.clone())
            .store(wrap(backend.clone()))
            .jwt_service(Arc::new(jwt.clone()))
            .build()
            .map_err(|e| anyhow::anyhow!("service context: {e}"))?;

        let state = GatewayState::new(context, config);
        let app = create_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            backend,
            state,
            jwt,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Credential for `user_id`, signed with the server's secret
    pub fn token_for(&self, user_id: Snowflake) -> String {
        self.jwt.issue(user_id).unwrap_or_default()
    }

    /// Connect as `user_id` through the client library
    pub async fn connect(&self, user_id: Snowflake) -> Result<GatewayClient> {
        self.connect_with(user_id, ClientConfig::default()).await
    }

    pub async fn connect_with(&self, user_id: Snowflake, config: ClientConfig) -> Result<GatewayClient> {
        GatewayClient::connect(&self.gateway_url(), &self.token_for(user_id), config)
            .await
            .with_context(|| format!("connect as {user_id}"))
    }

    /// Connect without any protocol handling
    pub async fn connect_raw(&self, token: &str) -> Result<RawSocket> {
        let (socket, _) = connect_async(format!("{}?token={token}", self.gateway_url())).await?;
        Ok(socket)
    }

    /// Live connections of `user_id` as seen by the server
    pub fn connection_count(&self, user_id: Snowflake) -> usize {
        self.state.connection_manager().user_connections(user_id).len()
    }

    /// Wait until the server has dropped every connection of `user_id`
    pub async fn wait_disconnected(&self, user_id: Snowflake) -> Result<()> {
        tokio::time::timeout(RECV_TIMEOUT, async {
            while self.connection_count(user_id) > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .context("connection still registered")
    }
}

/// Store that stalls before moving the latest-message pointer
pub struct SlowStore {
    inner: Arc<MemoryBackend>,
    delay: Duration,
}

impl SlowStore {
    pub fn wrap(inner: Arc<MemoryBackend>, delay: Duration) -> Arc<dyn Store> {
        Arc::new(Self { inner, delay })
    }
}

#[async_trait]
impl Store for SlowStore {
    async fn create_message(&self, draft: NewMessage) -> RepoResult<StoredMessage> {
        self.inner.create_message(draft).await
    }

    async fn set_latest_message(&self, conversation_id: Snowflake, message_id: Snowflake) -> RepoResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.set_latest_message(conversation_id, message_id).await
    }

    async fn append_read_receipt(
        &self,
        target: ReadTarget,
        user_id: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<u64> {
        self.inner.append_read_receipt(target, user_id, at).await
    }
}

/// Configuration with the test secret; `overrides` replace individual variables
pub fn test_config(overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("GATEWAY_PORT".to_string(), "0".to_string()),
        ("JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
        ("WORKER_ID".to_string(), "1".to_string()),
    ]);
    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    AppConfig::from_lookup(|key| vars.get(key).cloned())
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Next gateway frame on a raw socket, skipping ping/pong
pub async fn recv_frame(socket: &mut RawSocket) -> Result<GatewayMessage> {
    loop {
        let message = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .context("no frame within timeout")?
            .context("socket closed")??;
        match message {
            Message::Text(text) => return Ok(GatewayMessage::from_json(&text)?),
            Message::Close(frame) => anyhow::bail!("connection closed: {frame:?}"),
            _ => {}
        }
    }
}

/// Send a frame on a raw socket
pub async fn send_frame(socket: &mut RawSocket, frame: &GatewayMessage) -> Result<()> {
    socket.send(Message::Text(frame.to_json()?)).await?;
    Ok(())
}

/// Read until the server closes and return its close code
pub async fn recv_close_code(socket: &mut RawSocket) -> Result<Option<u16>> {
    loop {
        let next = tokio::time::timeout(RECV_TIMEOUT, socket.next())
            .await
            .context("connection not closed within timeout")?;
        match next {
            Some(Ok(Message::Close(frame))) => return Ok(frame.map(|f| u16::from(f.code))),
            Some(Ok(_)) => {}
            Some(Err(_)) | None => return Ok(None),
        }
    }
}
