//! The byte-stream link seen from the transport client.

use std::sync::Arc;

use bytes::BytesMut;

use crate::core::{Frame, SessionStats};

use super::dispatch::Dispatch;
use super::endpoint::Endpoint;

/// Everything a link needs to connect and size its queues.
#[derive(Debug, Clone)]
pub struct LinkParams {
    /// Remote endpoint to connect to.
    pub endpoint: Endpoint,
    /// Maximum queued outbound packets before `send` is rejected.
    pub send_queue_max_size: usize,
    /// Maximum recycled buffers kept for reuse.
    pub free_list_max_size: usize,
    /// Buffer sizing policy.
    pub frame: Arc<Frame>,
    /// Counters.
    pub stats: Arc<SessionStats>,
}

/// A started-once stream link.
///
/// Received packets are posted with [`Dispatch::post_read`], which waits while
/// the client's read lane is full. Failures are posted as
/// `ClientInput::LinkError` to the same dispatch handle.
pub trait Link {
    /// Begin connecting and relaying.
    fn start(&mut self);

    /// Stop all I/O and release the socket. Idempotent.
    fn stop(&mut self);

    /// Queue a packet. Returns `false` if rejected (queue full, bad size, or
    /// stopped); the buffer is dropped in that case.
    fn send(&mut self, buf: BytesMut) -> bool;
}

/// Builds links for a transport client.
pub trait LinkFactory {
    /// Link type produced.
    type Link: Link;

    /// Construct a link without starting it.
    fn new_link(&mut self, params: LinkParams, dispatch: Dispatch) -> Self::Link;
}
