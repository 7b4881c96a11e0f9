//! TCP implementation of [`Link`].
//!
//! Packets travel on the stream behind a 2-byte big-endian length prefix.
//! One runtime task owns the socket; it connects, then runs the reader and
//! the writer until either fails or the link is stopped. The reader keeps one
//! packet outstanding: it waits for room in the client's read lane before it
//! reads the next length prefix.

use std::io;
use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::core::{ErrorKind, Frame, SessionStats, LENGTH_PREFIX_SIZE};

use super::dispatch::{ClientInput, Dispatch};
use super::link::{Link, LinkFactory, LinkParams};

/// Bounded free list of packet buffers.
///
/// Written buffers are recycled here and handed back out to the reader.
#[derive(Debug)]
pub struct BufferPool {
    free: Mutex<Vec<BytesMut>>,
    /// Free-list cap; recycled buffers beyond it are dropped.
    max_free: usize,
    /// Capacity of freshly allocated buffers.
    capacity: usize,
}

impl BufferPool {
    /// Create a pool keeping at most `max_free` buffers of `capacity` bytes.
    pub fn new(max_free: usize, capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(max_free)),
            max_free,
            capacity,
        }
    }

    /// Take a cleared buffer, allocating if the free list is empty.
    pub fn take(&self) -> BytesMut {
        self.free
            .lock()
            .pop()
            .unwrap_or_else(|| BytesMut::with_capacity(self.capacity))
    }

    /// Return a buffer; dropped if the free list is full.
    pub fn recycle(&self, mut buf: BytesMut) {
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.max_free {
            free.push(buf);
        }
    }

    /// Buffers currently on the free list.
    pub fn free_len(&self) -> usize {
        self.free.lock().len()
    }
}

/// A TCP link to one endpoint.
#[derive(Debug)]
pub struct TcpLink {
    params: LinkParams,
    dispatch: Dispatch,
    /// Runtime the I/O task is spawned on.
    handle: Handle,
    /// Send side of the bounded outbound queue. `None` once stopped.
    queue_tx: Option<mpsc::Sender<BytesMut>>,
    /// Handed to the I/O task on start.
    queue_rx: Option<mpsc::Receiver<BytesMut>>,
    pool: Arc<BufferPool>,
    /// The I/O task, aborted on stop.
    task: Option<JoinHandle<()>>,
    halted: bool,
}

impl TcpLink {
    /// Create a link that will run on `handle` once started.
    ///
    /// Sends made before [`Link::start`] are queued and flushed after connect.
    pub fn new(handle: Handle, params: LinkParams, dispatch: Dispatch) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(params.send_queue_max_size.max(1));
        let pool = Arc::new(BufferPool::new(
            params.free_list_max_size,
            params.frame.buffer_capacity(),
        ));
        Self {
            params,
            dispatch,
            handle,
            queue_tx: Some(queue_tx),
            queue_rx: Some(queue_rx),
            pool,
            task: None,
            halted: false,
        }
    }

    /// Check if [`Link::stop`] has been called.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// The link's buffer free list.
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }
}

impl Link for TcpLink {
    fn start(&mut self) {
        if self.halted || self.task.is_some() {
            return;
        }
        let Some(queue_rx) = self.queue_rx.take() else {
            return;
        };
        let io = LinkIo {
            frame: Arc::clone(&self.params.frame),
            stats: Arc::clone(&self.params.stats),
            pool: Arc::clone(&self.pool),
            dispatch: self.dispatch.clone(),
        };
        let endpoint = self.params.endpoint;
        self.task = Some(self.handle.spawn(async move {
            if let Err(message) = io.run(endpoint.socket_addr(), queue_rx).await {
                io.dispatch.post(ClientInput::LinkError(message));
            }
        }));
    }

    fn stop(&mut self) {
        if self.halted {
            return;
        }
        self.halted = true;
        self.queue_tx = None;
        self.queue_rx = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(endpoint = %self.params.endpoint, "link stopped");
    }

    fn send(&mut self, buf: BytesMut) -> bool {
        let Some(queue_tx) = &self.queue_tx else {
            return false;
        };
        if !self.params.frame.accepts(buf.len()) {
            self.params.stats.error(ErrorKind::TcpSizeError);
            return false;
        }
        match queue_tx.try_send(buf) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.params.stats.error(ErrorKind::TcpOverflow);
                trace!(endpoint = %self.params.endpoint, "send queue full");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Shared state of the link's I/O task.
struct LinkIo {
    /// Size bounds applied to both directions.
    frame: Arc<Frame>,
    stats: Arc<SessionStats>,
    pool: Arc<BufferPool>,
    /// Where packets and the final error are posted.
    dispatch: Dispatch,
}

impl LinkIo {
    async fn run(
        &self,
        addr: std::net::SocketAddr,
        queue_rx: mpsc::Receiver<BytesMut>,
    ) -> Result<(), String> {
        let stream = TcpStream::connect(addr).await.map_err(|e| {
            self.stats.error(ErrorKind::ConnectError);
            format!("connect to {addr} failed: {e}")
        })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!(%addr, error = %e, "set_nodelay failed");
        }
        debug!(%addr, "link connected");

        let (reader, writer) = stream.into_split();
        tokio::select! {
            result = self.read_loop(reader) => result,
            result = self.write_loop(writer, queue_rx) => result,
        }
    }

    async fn read_loop(&self, reader: OwnedReadHalf) -> Result<(), String> {
        let mut reader = BufReader::new(reader);
        loop {
            let len = match reader.read_u16().await {
                Ok(len) => usize::from(len),
                Err(e) => return Err(self.recv_failure(e)),
            };
            if !self.frame.accepts(len) {
                self.stats.error(ErrorKind::TcpSizeError);
                return Err(format!("received packet size {len} out of range"));
            }

            let mut buf = self.pool.take();
            buf.resize(len, 0);
            if let Err(e) = reader.read_exact(&mut buf[..]).await {
                return Err(self.recv_failure(e));
            }
            self.stats.inc_recv(len);

            if !self.dispatch.post_read(buf).await {
                return Ok(());
            }
        }
    }

    async fn write_loop(
        &self,
        writer: OwnedWriteHalf,
        mut queue_rx: mpsc::Receiver<BytesMut>,
    ) -> Result<(), String> {
        let mut writer =
            BufWriter::with_capacity(LENGTH_PREFIX_SIZE + self.frame.payload_size(), writer);
        while let Some(buf) = queue_rx.recv().await {
            let len = buf.len();
            if let Err(e) = write_packet(&mut writer, &buf).await {
                self.stats.error(ErrorKind::NetworkSendError);
                return Err(format!("send error: {e}"));
            }
            self.stats.inc_send(len);
            self.pool.recycle(buf);
        }
        Ok(())
    }

    fn recv_failure(&self, e: io::Error) -> String {
        self.stats.error(ErrorKind::NetworkRecvError);
        if e.kind() == io::ErrorKind::UnexpectedEof {
            "connection closed by peer".to_string()
        } else {
            format!("recv error: {e}")
        }
    }
}

async fn write_packet(writer: &mut BufWriter<OwnedWriteHalf>, packet: &[u8]) -> io::Result<()> {
    // `send` only queues packets the frame accepts, which fit in u16.
    writer.write_u16(packet.len() as u16).await?;
    writer.write_all(packet).await?;
    writer.flush().await
}

/// Builds [`TcpLink`]s on a runtime handle.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    handle: Handle,
}

impl TcpConnector {
    /// Create a connector that spawns link tasks on `handle`.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl LinkFactory for TcpConnector {
    type Link = TcpLink;

    fn new_link(&mut self, params: LinkParams, dispatch: Dispatch) -> TcpLink {
        TcpLink::new(self.handle.clone(), params, dispatch)
    }
}
