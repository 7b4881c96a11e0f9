//! The upward interface a transport client reports to.

use bytes::BytesMut;
use tokio::sync::mpsc;

use crate::core::TransportError;

/// Receiver of transport lifecycle and data events.
///
/// Implemented by the session controller that owns the client.
pub trait TransportParent {
    /// Resolution is about to begin. Not called when the endpoint cache is used.
    fn transport_pre_resolve(&mut self) {}

    /// The link was started. This does not mean the peer is reachable yet.
    fn transport_connecting(&mut self);

    /// A packet arrived from the link.
    fn transport_recv(&mut self, buf: BytesMut);

    /// The attempt failed. The client is already stopped when this is called.
    fn transport_error(&mut self, err: TransportError);
}

/// A transport event, for controllers that consume events as a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// See [`TransportParent::transport_pre_resolve`].
    PreResolve,
    /// See [`TransportParent::transport_connecting`].
    Connecting,
    /// See [`TransportParent::transport_recv`].
    Recv(BytesMut),
    /// See [`TransportParent::transport_error`].
    Error(TransportError),
}

impl TransportParent for mpsc::UnboundedSender<TransportEvent> {
    fn transport_pre_resolve(&mut self) {
        let _ = self.send(TransportEvent::PreResolve);
    }

    fn transport_connecting(&mut self) {
        let _ = self.send(TransportEvent::Connecting);
    }

    fn transport_recv(&mut self, buf: BytesMut) {
        let _ = self.send(TransportEvent::Recv(buf));
    }

    fn transport_error(&mut self, err: TransportError) {
        let _ = self.send(TransportEvent::Error(err));
    }
}

impl TransportParent for Vec<TransportEvent> {
    fn transport_pre_resolve(&mut self) {
        self.push(TransportEvent::PreResolve);
    }

    fn transport_connecting(&mut self) {
        self.push(TransportEvent::Connecting);
    }

    fn transport_recv(&mut self, buf: BytesMut) {
        self.push(TransportEvent::Recv(buf));
    }

    fn transport_error(&mut self, err: TransportError) {
        self.push(TransportEvent::Error(err));
    }
}
