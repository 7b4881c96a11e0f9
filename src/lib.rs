//! # tunnel-transport
//!
//! Client-side stream transport for a secure tunneling protocol.
//!
//! One [`TransportClient`](client::TransportClient) drives one connection
//! attempt: it resolves the server (or reuses the endpoint remembered by its
//! [`ClientConfig`](client::ClientConfig)), starts a length-prefixed TCP link,
//! relays packets in both directions, and reports the first failure to its
//! parent after tearing itself down. Reconnection is the parent's business:
//! it builds a fresh client from the same config.
//!
//! ## Feature Flags
//!
//! - `transport` (default): endpoints, resolver, TCP link, dispatch mailbox
//! - `client` (default): the transport client state machine and its config
//! - `config-file` (default): TOML client options
//! - `crypto` (default): CBC/HMAC and AEAD data-channel pipelines
//!
//! ## Modules
//!
//! - [`core`]: constants, error types, counters and frame sizing (always included)
//! - [`transport`]: resolver and link collaborators (requires `transport`)
//! - [`client`]: transport client (requires `client`)
//! - [`crypto`]: data-channel selection (requires `crypto`)
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tunnel_transport::prelude::*;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> Result<(), ConfigError> {
//! let config = ClientConfig::builder()
//!     .server_host("vpn.example.com")
//!     .server_port("443")
//!     .build()?;
//!
//! let (events, mut rx) = mpsc::unbounded_channel::<TransportEvent>();
//! let mut client = config.new_client(&tokio::runtime::Handle::current(), events);
//! client.start();
//!
//! while client.dispatch_next().await {
//!     while let Ok(event) = rx.try_recv() {
//!         match event {
//!             TransportEvent::Connecting => {
//!                 client.transport_send_const(b"hello");
//!             }
//!             TransportEvent::Recv(packet) => println!("{} bytes", packet.len()),
//!             TransportEvent::Error(err) => eprintln!("{err}"),
//!             TransportEvent::PreResolve => {}
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Client API (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        AddressFamily, ClientInput, Dispatch, Endpoint, EndpointCache, Link, LinkFactory,
        LinkParams, Resolver, TcpConnector, TcpLink, TokioResolver,
    };

    #[cfg(feature = "client")]
    pub use crate::client::{
        ClientConfig, ClientConfigBuilder, ClientPhase, ServerEndpointInfo, TransportClient,
        TransportEvent, TransportParent,
    };

    #[cfg(feature = "config-file")]
    pub use crate::client::ClientOptions;

    #[cfg(feature = "crypto")]
    pub use crate::crypto::{
        CipherAlg, CipherMode, CryptoDcSelect, DataChannel, DataChannelContext,
        DataChannelKeys, DataChannelSettings, DigestAlg, KeyMaterial,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{ConfigError, CryptoError, DataChannelSelectError, TransportError};

#[cfg(feature = "client")]
pub use crate::client::{ClientConfig, TransportClient, TransportEvent, TransportParent};
