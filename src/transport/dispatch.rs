//! Completion delivery from collaborators into a transport client.
//!
//! Resolvers and links run on the runtime; they never touch client state.
//! Instead they post a [`ClientInput`] through a [`Dispatch`] handle, and the
//! client handles inputs one at a time from its [`Mailbox`].
//!
//! Received packets use a bounded lane so a link cannot read ahead of the
//! client by more than the lane's capacity. Everything else is unbounded.

use std::io;

use bytes::BytesMut;
use tokio::sync::mpsc;

use crate::core::DEFAULT_FREE_LIST_MAX_SIZE;

use super::endpoint::Endpoint;

/// An asynchronous completion addressed to a transport client.
#[derive(Debug)]
pub enum ClientInput {
    /// Resolver finished; candidates are in resolver order.
    Resolved(io::Result<Vec<Endpoint>>),
    /// Link received a packet.
    LinkRead(BytesMut),
    /// Link failed; the text is diagnostic.
    LinkError(String),
}

/// Cloneable handle used by collaborators to post completions.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// Resolve results and link errors.
    tx: mpsc::UnboundedSender<ClientInput>,
    /// Received packets; bounded.
    reads: mpsc::Sender<BytesMut>,
}

impl Dispatch {
    /// Post an input without waiting. Returns `false` if the client no longer
    /// exists, or if the input is a packet and the read lane is full.
    pub fn post(&self, input: ClientInput) -> bool {
        match input {
            ClientInput::LinkRead(buf) => self.reads.try_send(buf).is_ok(),
            other => self.tx.send(other).is_ok(),
        }
    }

    /// Post a received packet, waiting for room in the read lane.
    ///
    /// Returns `false` if the client no longer exists.
    pub async fn post_read(&self, buf: BytesMut) -> bool {
        self.reads.send(buf).await.is_ok()
    }

    /// Check whether the receiving client has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A client's private input queue.
#[derive(Debug)]
pub struct Mailbox {
    tx: mpsc::UnboundedSender<ClientInput>,
    rx: mpsc::UnboundedReceiver<ClientInput>,
    /// Kept so the read lane never closes while the mailbox lives, and to
    /// measure how full it is.
    reads_tx: mpsc::Sender<BytesMut>,
    reads_rx: mpsc::Receiver<BytesMut>,
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Mailbox {
    /// Create an empty mailbox with the default read lane capacity.
    pub fn new() -> Self {
        Self::with_read_capacity(DEFAULT_FREE_LIST_MAX_SIZE)
    }

    /// Create an empty mailbox holding at most `capacity` unhandled packets.
    pub fn with_read_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (reads_tx, reads_rx) = mpsc::channel(capacity.max(1));
        Self {
            tx,
            rx,
            reads_tx,
            reads_rx,
        }
    }

    /// A handle that posts into this mailbox.
    pub fn dispatch(&self) -> Dispatch {
        Dispatch {
            tx: self.tx.clone(),
            reads: self.reads_tx.clone(),
        }
    }

    /// Packets posted and not yet taken.
    pub fn queued_reads(&self) -> usize {
        self.reads_tx.max_capacity() - self.reads_tx.capacity()
    }

    /// Maximum number of packets the read lane holds.
    pub fn read_capacity(&self) -> usize {
        self.reads_tx.max_capacity()
    }

    /// Take the next queued input without waiting.
    ///
    /// Packets come first: a link posts its error only after its last packet
    /// was queued.
    pub fn try_recv(&mut self) -> Option<ClientInput> {
        if let Ok(buf) = self.reads_rx.try_recv() {
            return Some(ClientInput::LinkRead(buf));
        }
        self.rx.try_recv().ok()
    }

    /// Wait for the next input, with the same ordering as
    /// [`try_recv`](Mailbox::try_recv).
    ///
    /// Cancel-safe. Never returns `None` while the mailbox is alive, because
    /// the mailbox keeps its own senders.
    pub async fn recv(&mut self) -> Option<ClientInput> {
        tokio::select! {
            biased;
            Some(buf) = self.reads_rx.recv() => Some(ClientInput::LinkRead(buf)),
            input = self.rx.recv() => input,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_arrive_in_post_order() {
        let mut mailbox = Mailbox::new();
        let dispatch = mailbox.dispatch();

        assert!(dispatch.post(ClientInput::LinkRead(BytesMut::from(&b"one"[..]))));
        assert!(dispatch.post(ClientInput::LinkRead(BytesMut::from(&b"two"[..]))));
        assert!(dispatch.post(ClientInput::LinkError("eof".into())));

        match mailbox.try_recv() {
            Some(ClientInput::LinkRead(buf)) => assert_eq!(&buf[..], b"one"),
            other => panic!("unexpected {other:?}"),
        }
        match mailbox.try_recv() {
            Some(ClientInput::LinkRead(buf)) => assert_eq!(&buf[..], b"two"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(mailbox.try_recv(), Some(ClientInput::LinkError(_))));
        assert!(mailbox.try_recv().is_none());
    }

    #[test]
    fn test_post_after_mailbox_dropped() {
        let mailbox = Mailbox::new();
        let dispatch = mailbox.dispatch();
        drop(mailbox);

        assert!(dispatch.is_closed());
        assert!(!dispatch.post(ClientInput::LinkError("late".into())));
        assert!(!dispatch.post(ClientInput::LinkRead(BytesMut::from(&b"late"[..]))));
    }

    #[test]
    fn test_read_lane_is_bounded() {
        let mut mailbox = Mailbox::with_read_capacity(2);
        let dispatch = mailbox.dispatch();

        assert!(dispatch.post(ClientInput::LinkRead(BytesMut::from(&b"a"[..]))));
        assert!(dispatch.post(ClientInput::LinkRead(BytesMut::from(&b"b"[..]))));
        assert!(!dispatch.post(ClientInput::LinkRead(BytesMut::from(&b"c"[..]))));
        // Errors are never held back by a full read lane.
        assert!(dispatch.post(ClientInput::LinkError("reset".into())));
        assert_eq!(mailbox.queued_reads(), 2);

        assert!(matches!(mailbox.try_recv(), Some(ClientInput::LinkRead(_))));
        assert_eq!(mailbox.queued_reads(), 1);
    }

    #[tokio::test]
    async fn test_post_read_waits_for_room() {
        let mut mailbox = Mailbox::with_read_capacity(1);
        let dispatch = mailbox.dispatch();
        assert!(dispatch.post_read(BytesMut::from(&b"first"[..])).await);

        let writer = tokio::spawn(async move {
            dispatch.post_read(BytesMut::from(&b"second"[..])).await
        });
        tokio::task::yield_now().await;
        assert!(!writer.is_finished());
        assert_eq!(mailbox.queued_reads(), 1);

        match mailbox.recv().await {
            Some(ClientInput::LinkRead(buf)) => assert_eq!(&buf[..], b"first"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(writer.await.unwrap());
        match mailbox.recv().await {
            Some(ClientInput::LinkRead(buf)) => assert_eq!(&buf[..], b"second"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
