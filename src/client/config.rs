//! Client configuration and client factory.

use std::sync::Arc;

use tokio::runtime::Handle;

use crate::core::{
    ConfigError, Frame, SessionStats, DEFAULT_FREE_LIST_MAX_SIZE, DEFAULT_PAYLOAD_SIZE,
    DEFAULT_SEND_QUEUE_MAX_SIZE,
};
use crate::transport::{
    Endpoint, EndpointCache, LinkFactory, LinkParams, Resolver, TcpConnector, TokioResolver,
};

use super::client::TransportClient;
use super::parent::TransportParent;

/// Connection parameters shared by successive connection attempts.
///
/// Immutable after construction except for the endpoint cache, which every
/// client built from this config reads at start and writes when it starts a
/// link.
#[derive(Debug)]
pub struct ClientConfig {
    server_host: String,
    /// Kept as text; parsed by the resolver.
    server_port: String,
    send_queue_max_size: usize,
    /// Also bounds the packets a client holds unhandled.
    free_list_max_size: usize,
    frame: Arc<Frame>,
    stats: Arc<SessionStats>,
    /// Written by clients when they start a link.
    endpoint_cache: EndpointCache,
}

impl ClientConfig {
    /// Default config: queue bound 64, free-list bound 8, nothing cached.
    ///
    /// Host and port are empty; use [`ClientConfig::builder`] for a usable
    /// config.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            server_host: String::new(),
            server_port: String::new(),
            send_queue_max_size: DEFAULT_SEND_QUEUE_MAX_SIZE,
            free_list_max_size: DEFAULT_FREE_LIST_MAX_SIZE,
            frame: Arc::new(Frame::default()),
            stats: Arc::new(SessionStats::new()),
            endpoint_cache: EndpointCache::new(),
        })
    }

    /// Start building a config.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Build a client for one connection attempt, using the system resolver
    /// and a TCP link on `handle`. The client is not started.
    pub fn new_client<P: TransportParent>(
        self: &Arc<Self>,
        handle: &Handle,
        parent: P,
    ) -> TransportClient<P> {
        self.new_client_with(
            parent,
            TokioResolver::new(handle.clone()),
            TcpConnector::new(handle.clone()),
        )
    }

    /// Build a client with custom resolver and link collaborators.
    pub fn new_client_with<P, R, F>(
        self: &Arc<Self>,
        parent: P,
        resolver: R,
        connector: F,
    ) -> TransportClient<P, R, F>
    where
        P: TransportParent,
        R: Resolver,
        F: LinkFactory,
    {
        TransportClient::new(Arc::clone(self), parent, resolver, connector)
    }

    /// Server host as configured.
    pub fn server_host(&self) -> &str {
        &self.server_host
    }

    /// Server port as configured.
    pub fn server_port(&self) -> &str {
        &self.server_port
    }

    /// Link send-queue bound.
    pub fn send_queue_max_size(&self) -> usize {
        self.send_queue_max_size
    }

    /// Link free-list bound.
    pub fn free_list_max_size(&self) -> usize {
        self.free_list_max_size
    }

    /// Buffer sizing policy.
    pub fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }

    /// Counters shared by all attempts.
    pub fn stats(&self) -> &Arc<SessionStats> {
        &self.stats
    }

    /// Endpoint remembered across attempts.
    pub fn endpoint_cache(&self) -> &EndpointCache {
        &self.endpoint_cache
    }

    pub(crate) fn link_params(&self, endpoint: Endpoint) -> LinkParams {
        LinkParams {
            endpoint,
            send_queue_max_size: self.send_queue_max_size,
            free_list_max_size: self.free_list_max_size,
            frame: Arc::clone(&self.frame),
            stats: Arc::clone(&self.stats),
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    server_host: String,
    server_port: String,
    send_queue_max_size: usize,
    free_list_max_size: usize,
    frame: Option<Arc<Frame>>,
    stats: Option<Arc<SessionStats>>,
}

impl ClientConfigBuilder {
    /// Create a builder with default bounds.
    pub fn new() -> Self {
        Self {
            server_host: String::new(),
            server_port: String::new(),
            send_queue_max_size: DEFAULT_SEND_QUEUE_MAX_SIZE,
            free_list_max_size: DEFAULT_FREE_LIST_MAX_SIZE,
            frame: None,
            stats: None,
        }
    }

    /// Set the server host name or address literal.
    pub fn server_host(mut self, host: impl Into<String>) -> Self {
        self.server_host = host.into();
        self
    }

    /// Set the server port.
    pub fn server_port(mut self, port: impl Into<String>) -> Self {
        self.server_port = port.into();
        self
    }

    /// Set the link send-queue bound.
    pub fn send_queue_max_size(mut self, size: usize) -> Self {
        self.send_queue_max_size = size;
        self
    }

    /// Set the link free-list bound.
    pub fn free_list_max_size(mut self, size: usize) -> Self {
        self.free_list_max_size = size;
        self
    }

    /// Share a frame policy.
    pub fn frame(mut self, frame: Arc<Frame>) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Share a stats sink.
    pub fn stats(mut self, stats: Arc<SessionStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Validate and build the config.
    pub fn build(self) -> Result<Arc<ClientConfig>, ConfigError> {
        if self.server_host.is_empty() {
            return Err(ConfigError::Missing("server host"));
        }
        if self.server_port.is_empty() {
            return Err(ConfigError::Missing("server port"));
        }
        if self.send_queue_max_size == 0 {
            return Err(ConfigError::Invalid {
                field: "send_queue_max_size",
                reason: "must be positive".into(),
            });
        }
        if self.free_list_max_size == 0 {
            return Err(ConfigError::Invalid {
                field: "free_list_max_size",
                reason: "must be positive".into(),
            });
        }

        Ok(Arc::new(ClientConfig {
            server_host: self.server_host,
            server_port: self.server_port,
            send_queue_max_size: self.send_queue_max_size,
            free_list_max_size: self.free_list_max_size,
            frame: self.frame.unwrap_or_else(|| Arc::new(Frame::default())),
            stats: self.stats.unwrap_or_else(|| Arc::new(SessionStats::new())),
            endpoint_cache: EndpointCache::new(),
        }))
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// File-level description of a client config.
///
/// ```toml
/// host = "vpn.example.com"
/// port = "443"
/// send_queue_max_size = 64
/// free_list_max_size = 8
/// payload_size = 2048
/// ```
#[cfg(feature = "config-file")]
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: String,
    /// Link send-queue bound.
    pub send_queue_max_size: usize,
    /// Link free-list bound.
    pub free_list_max_size: usize,
    /// Maximum packet payload.
    pub payload_size: usize,
}

#[cfg(feature = "config-file")]
impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: String::new(),
            send_queue_max_size: DEFAULT_SEND_QUEUE_MAX_SIZE,
            free_list_max_size: DEFAULT_FREE_LIST_MAX_SIZE,
            payload_size: DEFAULT_PAYLOAD_SIZE,
        }
    }
}

#[cfg(feature = "config-file")]
impl ClientOptions {
    /// Parse options from TOML.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Validate and turn the options into a shared config.
    pub fn into_config(self) -> Result<Arc<ClientConfig>, ConfigError> {
        if self.payload_size == 0 {
            return Err(ConfigError::Invalid {
                field: "payload_size",
                reason: "must be positive".into(),
            });
        }
        ClientConfig::builder()
            .server_host(self.host)
            .server_port(self.port)
            .send_queue_max_size(self.send_queue_max_size)
            .free_list_max_size(self.free_list_max_size)
            .frame(Arc::new(Frame::new(self.payload_size)))
            .build()
    }
}
