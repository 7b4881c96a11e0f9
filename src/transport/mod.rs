//! Transport layer: endpoints, resolution and the stream link.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      Transport client (client/)         │
//! ├──────────────┬──────────────────────────┤
//! │  Resolver    │  Link  (TCP, framed)     │  ← This module
//! ├──────────────┴──────────────────────────┤
//! │         tokio runtime / sockets         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Collaborators report completions by posting [`ClientInput`] through a
//! [`Dispatch`] handle; they never call into the client directly.

mod dispatch;
mod endpoint;
mod link;
mod resolver;
mod tcp;

pub use dispatch::{ClientInput, Dispatch, Mailbox};
pub use endpoint::{AddressFamily, Endpoint, EndpointCache};
pub use link::{Link, LinkFactory, LinkParams};
pub use resolver::{resolve, Resolver, TokioResolver};
pub use tcp::{BufferPool, TcpConnector, TcpLink};
