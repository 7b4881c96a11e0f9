//! Resolved server endpoints and the per-config endpoint cache.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use parking_lot::Mutex;

use crate::core::STREAM_PROTOCOL;

/// IP address family of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    /// IPv4.
    V4,
    /// IPv6.
    V6,
}

impl AddressFamily {
    /// Version suffix used in protocol labels (`"v4"` / `"v6"`).
    pub fn version_string(self) -> &'static str {
        match self {
            AddressFamily::V4 => "v4",
            AddressFamily::V6 => "v6",
        }
    }
}

/// A resolved (address, port, family) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    addr: SocketAddr,
}

impl Endpoint {
    /// Wrap a socket address.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// The IP address.
    pub fn address(&self) -> IpAddr {
        self.addr.ip()
    }

    /// The port.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The address family.
    pub fn family(&self) -> AddressFamily {
        match self.addr {
            SocketAddr::V4(_) => AddressFamily::V4,
            SocketAddr::V6(_) => AddressFamily::V6,
        }
    }

    /// The underlying socket address.
    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Family-qualified stream protocol label, e.g. `"TCPv4"`.
    pub fn protocol_tag(&self) -> String {
        format!("{}{}", STREAM_PROTOCOL, self.family().version_string())
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}

/// Last endpoint used for a configuration.
///
/// Shared by every client built from the same config, so a reconnect can
/// skip resolution. Only cleared through [`EndpointCache::invalidate`].
#[derive(Debug, Default)]
pub struct EndpointCache {
    endpoint: Mutex<Option<Endpoint>>,
}

impl EndpointCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if an endpoint is stored.
    pub fn is_defined(&self) -> bool {
        self.endpoint.lock().is_some()
    }

    /// The stored endpoint, if any.
    pub fn endpoint(&self) -> Option<Endpoint> {
        *self.endpoint.lock()
    }

    /// Store `endpoint`, replacing any previous one.
    pub fn set_endpoint(&self, endpoint: Endpoint) {
        *self.endpoint.lock() = Some(endpoint);
    }

    /// Forget the stored endpoint.
    pub fn invalidate(&self) {
        *self.endpoint.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn test_endpoint_v4() {
        let ep = Endpoint::new(SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 8, 0, 1)), 1194));
        assert_eq!(ep.family(), AddressFamily::V4);
        assert_eq!(ep.port(), 1194);
        assert_eq!(ep.protocol_tag(), "TCPv4");
        assert_eq!(ep.address().to_string(), "10.8.0.1");
    }

    #[test]
    fn test_endpoint_v6() {
        let ep = Endpoint::new(SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 443));
        assert_eq!(ep.family(), AddressFamily::V6);
        assert_eq!(ep.protocol_tag(), "TCPv6");
        assert_eq!(ep.address().to_string(), "::1");
        assert_eq!(ep.to_string(), "[::1]:443");
    }

    #[test]
    fn test_cache_lifecycle() {
        let cache = EndpointCache::new();
        assert!(!cache.is_defined());
        assert_eq!(cache.endpoint(), None);

        let first: Endpoint = "192.0.2.1:1194".parse::<SocketAddr>().unwrap().into();
        cache.set_endpoint(first);
        assert!(cache.is_defined());
        assert_eq!(cache.endpoint(), Some(first));

        let second: Endpoint = "192.0.2.2:1194".parse::<SocketAddr>().unwrap().into();
        cache.set_endpoint(second);
        assert_eq!(cache.endpoint(), Some(second));

        cache.invalidate();
        assert!(!cache.is_defined());
    }
}
