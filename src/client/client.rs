//! The per-attempt transport client state machine.
//!
//! ```text
//!   start()          resolved           link started
//! Idle ──► Resolving ──────► StartingLink ──────► Active
//!   │  (cache hit) ─────────────►▲                  │
//!   └──────────────┴─────────────┴──── stop() ──────┴──► Stopped
//! ```
//!
//! Every input handler checks for `Stopped` first. A completion that was
//! already in flight when `stop()` ran is discarded, never acted on.

use std::io;
use std::net::IpAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tracing::{debug, trace, warn};

use crate::core::{ErrorKind, TransportError, STREAM_PROTOCOL};
use crate::transport::{
    ClientInput, Endpoint, Link, LinkFactory, Mailbox, Resolver, TcpConnector, TokioResolver,
};

use super::config::ClientConfig;
use super::parent::TransportParent;

/// Lifecycle phase of a transport client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Created, not started.
    Idle,
    /// Waiting for the resolver.
    Resolving,
    /// Caching the endpoint and starting the link.
    StartingLink,
    /// Link started; relaying packets.
    Active,
    /// Torn down. Terminal.
    Stopped,
}

/// Server endpoint details reported to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpointInfo {
    /// Configured host.
    pub host: String,
    /// Configured port.
    pub port: String,
    /// Protocol label, e.g. `"TCPv4"`. Plain `"TCP"` before an endpoint is known.
    pub proto: String,
    /// Resolved address text. Empty before an endpoint is known.
    pub ip_addr: String,
}

/// Client for one connection attempt.
///
/// Owned by the controller that created it; dropping it performs a full
/// [`stop`](TransportClient::stop). There is no retry of any kind: every
/// failure stops the client and is then reported through
/// [`TransportParent::transport_error`].
pub struct TransportClient<P, R = TokioResolver, F = TcpConnector>
where
    P: TransportParent,
    R: Resolver,
    F: LinkFactory,
{
    config: Arc<ClientConfig>,
    /// Receives every event; owned, so it outlives any in-flight completion.
    parent: P,
    resolver: R,
    /// Builds the link once an endpoint is chosen.
    connector: F,
    /// At most one per client. Released on stop.
    link: Option<F::Link>,
    /// Completions from the resolver and link; packets are bounded by
    /// `free_list_max_size`.
    mailbox: Mailbox,
    /// Chosen endpoint. Never changes once set.
    server_endpoint: Option<Endpoint>,
    phase: ClientPhase,
}

impl<P, R, F> TransportClient<P, R, F>
where
    P: TransportParent,
    R: Resolver,
    F: LinkFactory,
{
    pub(crate) fn new(config: Arc<ClientConfig>, parent: P, resolver: R, connector: F) -> Self {
        let mailbox = Mailbox::with_read_capacity(config.free_list_max_size());
        Self {
            config,
            parent,
            resolver,
            connector,
            link: None,
            mailbox,
            server_endpoint: None,
            phase: ClientPhase::Idle,
        }
    }

    /// Begin the attempt.
    ///
    /// Uses the config's cached endpoint if there is one; otherwise notifies
    /// the parent and starts resolving. No-op once a link exists, while a
    /// resolve is pending, or after the client stopped.
    pub fn start(&mut self) {
        if self.link.is_some() {
            return;
        }
        if self.phase != ClientPhase::Idle {
            debug!(phase = ?self.phase, "start ignored");
            return;
        }

        if let Some(endpoint) = self.config.endpoint_cache().endpoint() {
            debug!(%endpoint, "using cached endpoint");
            self.server_endpoint = Some(endpoint);
            self.start_link();
        } else {
            let host = self.config.server_host();
            let port = self.config.server_port();
            self.parent.transport_pre_resolve();
            self.phase = ClientPhase::Resolving;
            debug!(host, port, "resolving server");
            self.resolver
                .async_resolve(host, port, self.mailbox.dispatch());
        }
    }

    /// Tear down: stop and release the link, cancel any resolve, and enter
    /// [`ClientPhase::Stopped`]. Idempotent.
    pub fn stop(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.stop();
        }
        self.resolver.cancel();
        if self.phase != ClientPhase::Stopped {
            debug!(host = self.config.server_host(), "transport client stopped");
            self.phase = ClientPhase::Stopped;
        }
    }

    /// Send an owned packet. Returns `false` if there is no link or the link
    /// rejected it.
    pub fn transport_send(&mut self, buf: BytesMut) -> bool {
        match self.link.as_mut() {
            Some(link) => link.send(buf),
            None => false,
        }
    }

    /// Copy `buf` and send it. Returns `false` if there is no link or the
    /// link rejected it.
    pub fn transport_send_const(&mut self, buf: &[u8]) -> bool {
        match self.link.as_mut() {
            Some(link) => link.send(BytesMut::from(buf)),
            None => false,
        }
    }

    /// Handle one asynchronous completion.
    pub fn handle(&mut self, input: ClientInput) {
        match input {
            ClientInput::Resolved(result) => self.resolve_complete(result),
            ClientInput::LinkRead(buf) => self.link_read(buf),
            ClientInput::LinkError(message) => self.link_error(message),
        }
    }

    /// Handle every completion already queued, without waiting. Returns the
    /// number of inputs taken from the mailbox.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Some(input) = self.mailbox.try_recv() {
            self.handle(input);
            handled += 1;
        }
        handled
    }

    /// Wait for and handle the next completion.
    ///
    /// Returns `false` without waiting once the client has stopped.
    /// Cancel-safe, so it can be raced against controller work in
    /// `tokio::select!`.
    pub async fn dispatch_next(&mut self) -> bool {
        if self.is_halted() {
            return false;
        }
        match self.mailbox.recv().await {
            Some(input) => {
                self.handle(input);
                true
            }
            None => false,
        }
    }

    /// Drive the client until it stops.
    ///
    /// Call after [`start`](TransportClient::start); an idle client never
    /// receives input.
    pub async fn run(&mut self) {
        while self.dispatch_next().await {}
    }

    /// Received packets waiting to be handled. Never above the config's
    /// `free_list_max_size`.
    pub fn pending_reads(&self) -> usize {
        self.mailbox.queued_reads()
    }

    /// Current phase.
    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    /// Check if the client has stopped.
    pub fn is_halted(&self) -> bool {
        self.phase == ClientPhase::Stopped
    }

    /// Check if a link is held.
    pub fn has_link(&self) -> bool {
        self.link.is_some()
    }

    /// The endpoint this attempt is using, once known.
    pub fn server_endpoint(&self) -> Option<Endpoint> {
        self.server_endpoint
    }

    /// Address of the endpoint in use, once known.
    pub fn server_endpoint_addr(&self) -> Option<IpAddr> {
        self.server_endpoint.map(|endpoint| endpoint.address())
    }

    /// Host, port, protocol label and address text of the server.
    pub fn server_endpoint_info(&self) -> ServerEndpointInfo {
        let (proto, ip_addr) = match self.server_endpoint {
            Some(endpoint) => (endpoint.protocol_tag(), endpoint.address().to_string()),
            None => (STREAM_PROTOCOL.to_string(), String::new()),
        };
        ServerEndpointInfo {
            host: self.config.server_host().to_string(),
            port: self.config.server_port().to_string(),
            proto,
            ip_addr,
        }
    }

    /// The config this client was built from.
    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }

    /// The parent receiving events.
    pub fn parent(&self) -> &P {
        &self.parent
    }

    /// Mutable access to the parent.
    pub fn parent_mut(&mut self) -> &mut P {
        &mut self.parent
    }

    fn resolve_complete(&mut self, result: io::Result<Vec<Endpoint>>) {
        if self.is_halted() {
            trace!("discarding resolve result for stopped client");
            return;
        }
        if self.phase != ClientPhase::Resolving {
            trace!(phase = ?self.phase, "discarding unexpected resolve result");
            return;
        }

        // First candidate only; no fallback across the rest.
        match result.map(|endpoints| endpoints.into_iter().next()) {
            Ok(Some(endpoint)) => {
                debug!(%endpoint, "server resolved");
                self.server_endpoint = Some(endpoint);
                self.start_link();
            }
            Ok(None) => self.resolve_failed(io::Error::new(
                io::ErrorKind::NotFound,
                "resolver returned no addresses",
            )),
            Err(e) => self.resolve_failed(e),
        }
    }

    fn resolve_failed(&mut self, error: io::Error) {
        self.config.stats().error(ErrorKind::ResolveError);
        self.stop();
        let err = TransportError::Resolve {
            host: self.config.server_host().to_string(),
            port: self.config.server_port().to_string(),
            message: error.to_string(),
        };
        warn!(error = %err, "resolve failed");
        self.parent.transport_error(err);
    }

    fn start_link(&mut self) {
        let Some(endpoint) = self.server_endpoint else {
            return;
        };
        self.phase = ClientPhase::StartingLink;

        // Cached before the link proves the endpoint reachable.
        self.config.endpoint_cache().set_endpoint(endpoint);

        let params = self.config.link_params(endpoint);
        let mut link = self.connector.new_link(params, self.mailbox.dispatch());
        link.start();
        self.link = Some(link);
        self.parent.transport_connecting();
        self.phase = ClientPhase::Active;
        debug!(%endpoint, "link started");
    }

    fn link_read(&mut self, buf: BytesMut) {
        if self.is_halted() {
            trace!(len = buf.len(), "discarding packet for stopped client");
            return;
        }
        self.parent.transport_recv(buf);
    }

    fn link_error(&mut self, message: String) {
        if self.is_halted() {
            trace!(%message, "discarding link error for stopped client");
            return;
        }
        let err = TransportError::Link {
            host: self.config.server_host().to_string(),
            message,
        };
        self.stop();
        warn!(error = %err, "link failed");
        self.parent.transport_error(err);
    }
}

impl<P, R, F> Drop for TransportClient<P, R, F>
where
    P: TransportParent,
    R: Resolver,
    F: LinkFactory,
{
    fn drop(&mut self) {
        self.stop();
    }
}

impl<P, R, F> std::fmt::Debug for TransportClient<P, R, F>
where
    P: TransportParent,
    R: Resolver,
    F: LinkFactory,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("host", &self.config.server_host())
            .field("port", &self.config.server_port())
            .field("phase", &self.phase)
            .field("server_endpoint", &self.server_endpoint)
            .field("has_link", &self.link.is_some())
            .finish()
    }
}
