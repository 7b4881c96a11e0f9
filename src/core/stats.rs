//! Session statistics counters.
//!
//! Counters are plain relaxed atomics: they are diagnostics, never used to
//! make decisions.

use std::sync::atomic::{AtomicU64, Ordering};

/// Error conditions counted by the transport and data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Server name could not be resolved.
    ResolveError,
    /// Send rejected because the link queue was full.
    TcpOverflow,
    /// Packet too large or empty for the stream framing.
    TcpSizeError,
    /// Socket read failed or hit EOF.
    NetworkRecvError,
    /// Socket write failed.
    NetworkSendError,
    /// AEAD open or CBC unpad failed.
    DecryptError,
    /// CBC packet HMAC mismatch.
    HmacError,
    /// Replayed or too-old packet id.
    ReplayError,
    /// Link could not connect to the endpoint.
    ConnectError,
}

impl ErrorKind {
    /// Number of error kinds.
    pub const COUNT: usize = 9;

    fn index(self) -> usize {
        match self {
            ErrorKind::ResolveError => 0,
            ErrorKind::TcpOverflow => 1,
            ErrorKind::TcpSizeError => 2,
            ErrorKind::NetworkRecvError => 3,
            ErrorKind::NetworkSendError => 4,
            ErrorKind::DecryptError => 5,
            ErrorKind::HmacError => 6,
            ErrorKind::ReplayError => 7,
            ErrorKind::ConnectError => 8,
        }
    }

    /// Short name for logs.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::ResolveError => "RESOLVE_ERROR",
            ErrorKind::TcpOverflow => "TCP_OVERFLOW",
            ErrorKind::TcpSizeError => "TCP_SIZE_ERROR",
            ErrorKind::NetworkRecvError => "NETWORK_RECV_ERROR",
            ErrorKind::NetworkSendError => "NETWORK_SEND_ERROR",
            ErrorKind::DecryptError => "DECRYPT_ERROR",
            ErrorKind::HmacError => "HMAC_ERROR",
            ErrorKind::ReplayError => "REPLAY_ERROR",
            ErrorKind::ConnectError => "CONNECT_ERROR",
        }
    }
}

/// Shared counters for one configuration.
#[derive(Debug, Default)]
pub struct SessionStats {
    /// One counter per [`ErrorKind`], indexed by `ErrorKind::index`.
    errors: [AtomicU64; ErrorKind::COUNT],
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    packets_in: AtomicU64,
    packets_out: AtomicU64,
}

impl SessionStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `kind`.
    pub fn error(&self, kind: ErrorKind) {
        self.errors[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Number of times `kind` was counted.
    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.errors[kind.index()].load(Ordering::Relaxed)
    }

    /// Record one received packet of `len` bytes.
    pub fn inc_recv(&self, len: usize) {
        self.packets_in.fetch_add(1, Ordering::Relaxed);
        self.bytes_in.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Record one sent packet of `len` bytes.
    pub fn inc_send(&self, len: usize) {
        self.packets_out.fetch_add(1, Ordering::Relaxed);
        self.bytes_out.fetch_add(len as u64, Ordering::Relaxed);
    }

    /// Payload bytes received.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in.load(Ordering::Relaxed)
    }

    /// Payload bytes sent.
    pub fn bytes_out(&self) -> u64 {
        self.bytes_out.load(Ordering::Relaxed)
    }

    /// Packets received.
    pub fn packets_in(&self) -> u64 {
        self.packets_in.load(Ordering::Relaxed)
    }

    /// Packets sent.
    pub fn packets_out(&self) -> u64 {
        self.packets_out.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_counters_are_independent() {
        let stats = SessionStats::new();
        stats.error(ErrorKind::ResolveError);
        stats.error(ErrorKind::ResolveError);
        stats.error(ErrorKind::TcpOverflow);

        assert_eq!(stats.error_count(ErrorKind::ResolveError), 2);
        assert_eq!(stats.error_count(ErrorKind::TcpOverflow), 1);
        assert_eq!(stats.error_count(ErrorKind::HmacError), 0);
    }

    #[test]
    fn test_traffic_counters() {
        let stats = SessionStats::new();
        stats.inc_recv(100);
        stats.inc_recv(50);
        stats.inc_send(10);

        assert_eq!(stats.packets_in(), 2);
        assert_eq!(stats.bytes_in(), 150);
        assert_eq!(stats.packets_out(), 1);
        assert_eq!(stats.bytes_out(), 10);
    }
}
