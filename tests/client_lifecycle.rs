//! Lifecycle tests for `TransportClient` with scripted collaborators.
//!
//! The resolver and link here do no I/O; they record what the client asks
//! of them and hand their `Dispatch` back to the test, which then plays the
//! part of the runtime by posting completions.

use std::cell::RefCell;
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;

use bytes::BytesMut;
use tunnel_transport::core::ErrorKind;
use tunnel_transport::prelude::*;

#[derive(Default)]
struct Probe {
    queries: Vec<(String, String)>,
    cancels: usize,
    resolve_dispatch: Option<Dispatch>,
    links: Vec<Endpoint>,
    link_dispatch: Option<Dispatch>,
    link_starts: usize,
    link_stops: usize,
    sent: Vec<Vec<u8>>,
    reject_sends: bool,
}

type Shared = Rc<RefCell<Probe>>;

struct ScriptedResolver(Shared);

impl Resolver for ScriptedResolver {
    fn async_resolve(&mut self, host: &str, port: &str, dispatch: Dispatch) {
        let mut probe = self.0.borrow_mut();
        probe.queries.push((host.to_string(), port.to_string()));
        probe.resolve_dispatch = Some(dispatch);
    }

    fn cancel(&mut self) {
        self.0.borrow_mut().cancels += 1;
    }
}

struct ScriptedLink(Shared);

impl Link for ScriptedLink {
    fn start(&mut self) {
        self.0.borrow_mut().link_starts += 1;
    }

    fn stop(&mut self) {
        self.0.borrow_mut().link_stops += 1;
    }

    fn send(&mut self, buf: BytesMut) -> bool {
        let mut probe = self.0.borrow_mut();
        if probe.reject_sends {
            return false;
        }
        probe.sent.push(buf.to_vec());
        true
    }
}

struct ScriptedConnector(Shared);

impl LinkFactory for ScriptedConnector {
    type Link = ScriptedLink;

    fn new_link(&mut self, params: LinkParams, dispatch: Dispatch) -> ScriptedLink {
        let mut probe = self.0.borrow_mut();
        probe.links.push(params.endpoint);
        probe.link_dispatch = Some(dispatch);
        ScriptedLink(Rc::clone(&self.0))
    }
}

/// Parent that also notes how many link stops had happened when the error
/// arrived.
struct Controller {
    events: Vec<TransportEvent>,
    probe: Shared,
    link_stops_at_error: Option<usize>,
}

impl TransportParent for Controller {
    fn transport_pre_resolve(&mut self) {
        self.events.push(TransportEvent::PreResolve);
    }

    fn transport_connecting(&mut self) {
        self.events.push(TransportEvent::Connecting);
    }

    fn transport_recv(&mut self, buf: BytesMut) {
        self.events.push(TransportEvent::Recv(buf));
    }

    fn transport_error(&mut self, err: TransportError) {
        self.link_stops_at_error = Some(self.probe.borrow().link_stops);
        self.events.push(TransportEvent::Error(err));
    }
}

type Client = TransportClient<Controller, ScriptedResolver, ScriptedConnector>;

fn config() -> std::sync::Arc<ClientConfig> {
    ClientConfig::builder()
        .server_host("vpn.example.com")
        .server_port("1194")
        .build()
        .unwrap()
}

fn client_for(config: &std::sync::Arc<ClientConfig>) -> (Client, Shared) {
    let probe = Shared::default();
    let controller = Controller {
        events: Vec::new(),
        probe: Rc::clone(&probe),
        link_stops_at_error: None,
    };
    let client = config.new_client_with(
        controller,
        ScriptedResolver(Rc::clone(&probe)),
        ScriptedConnector(Rc::clone(&probe)),
    );
    (client, probe)
}

fn endpoint(addr: &str) -> Endpoint {
    addr.parse::<SocketAddr>().unwrap().into()
}

fn post_resolved(probe: &Shared, result: io::Result<Vec<Endpoint>>) {
    let dispatch = probe.borrow().resolve_dispatch.clone().unwrap();
    assert!(dispatch.post(ClientInput::Resolved(result)));
}

fn post_link(probe: &Shared, input: ClientInput) {
    let dispatch = probe.borrow().link_dispatch.clone().unwrap();
    assert!(dispatch.post(input));
}

#[test]
fn test_start_is_idempotent() {
    let config = config();
    let (mut client, probe) = client_for(&config);

    client.start();
    client.start();

    assert_eq!(probe.borrow().queries, vec![("vpn.example.com".to_string(), "1194".to_string())]);
    assert_eq!(client.parent().events, vec![TransportEvent::PreResolve]);
    assert_eq!(client.phase(), ClientPhase::Resolving);
}

#[test]
fn test_cached_endpoint_skips_resolution() {
    let config = config();
    let cached = endpoint("203.0.113.9:1194");
    config.endpoint_cache().set_endpoint(cached);

    let (mut client, probe) = client_for(&config);
    client.start();

    let probe = probe.borrow();
    assert!(probe.queries.is_empty());
    assert_eq!(probe.links, vec![cached]);
    assert_eq!(probe.link_starts, 1);
    assert_eq!(client.parent().events, vec![TransportEvent::Connecting]);
    assert_eq!(client.phase(), ClientPhase::Active);
}

#[test]
fn test_resolution_uses_first_candidate_and_fills_cache() {
    let config = config();
    let (mut client, probe) = client_for(&config);
    client.start();

    let first = endpoint("192.0.2.1:1194");
    let second = endpoint("192.0.2.2:1194");
    post_resolved(&probe, Ok(vec![first, second]));
    assert_eq!(client.dispatch_pending(), 1);

    assert_eq!(probe.borrow().links, vec![first]);
    assert_eq!(client.server_endpoint(), Some(first));
    // Written before the link has proven anything.
    assert_eq!(config.endpoint_cache().endpoint(), Some(first));
    assert_eq!(
        client.parent().events,
        vec![TransportEvent::PreResolve, TransportEvent::Connecting]
    );
}

#[test]
fn test_next_attempt_reuses_cache() {
    let config = config();
    {
        let (mut client, probe) = client_for(&config);
        client.start();
        post_resolved(&probe, Ok(vec![endpoint("192.0.2.7:1194")]));
        client.dispatch_pending();
    }

    let (mut retry, probe) = client_for(&config);
    retry.start();
    assert!(probe.borrow().queries.is_empty());
    assert_eq!(probe.borrow().links, vec![endpoint("192.0.2.7:1194")]);
}

#[test]
fn test_resolve_failure_tears_down_then_reports() {
    let config = config();
    let (mut client, probe) = client_for(&config);
    client.start();

    post_resolved(
        &probe,
        Err(io::Error::new(io::ErrorKind::NotFound, "no such host")),
    );
    client.dispatch_pending();

    assert!(client.is_halted());
    assert!(!client.has_link());
    assert!(probe.borrow().cancels >= 1);
    assert!(probe.borrow().links.is_empty());
    assert_eq!(config.stats().error_count(ErrorKind::ResolveError), 1);
    assert!(!config.endpoint_cache().is_defined());

    match client.parent().events.last() {
        Some(TransportEvent::Error(err)) => {
            assert!(err.is_resolve_error());
            assert_eq!(err.host(), "vpn.example.com");
            assert_eq!(
                err.to_string(),
                "DNS resolve error on 'vpn.example.com' (port 1194) for TCP session: no such host"
            );
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_link_error_stops_link_before_reporting() {
    let config = config();
    let (mut client, probe) = client_for(&config);
    client.start();
    post_resolved(&probe, Ok(vec![endpoint("192.0.2.1:1194")]));
    client.dispatch_pending();

    post_link(&probe, ClientInput::LinkError("connection reset".into()));
    client.dispatch_pending();

    assert!(client.is_halted());
    assert_eq!(client.parent().link_stops_at_error, Some(1));
    match client.parent().events.last() {
        Some(TransportEvent::Error(TransportError::Link { host, message })) => {
            assert_eq!(host, "vpn.example.com");
            assert_eq!(message, "connection reset");
        }
        other => panic!("unexpected {other:?}"),
    }

    // Nothing further is reported.
    let reported = client.parent().events.len();
    client.stop();
    assert_eq!(client.parent().events.len(), reported);
    assert_eq!(probe.borrow().link_stops, 1);
}

#[test]
fn test_completions_after_stop_are_discarded() {
    let config = config();
    let (mut client, probe) = client_for(&config);
    client.start();
    client.stop();

    post_resolved(&probe, Ok(vec![endpoint("192.0.2.1:1194")]));
    assert_eq!(client.dispatch_pending(), 1);

    assert!(!client.has_link());
    assert_eq!(client.phase(), ClientPhase::Stopped);
    assert_eq!(client.server_endpoint(), None);
    assert!(probe.borrow().links.is_empty());
    assert!(!config.endpoint_cache().is_defined());
    assert_eq!(client.parent().events, vec![TransportEvent::PreResolve]);
}

#[test]
fn test_packets_after_stop_are_discarded() {
    let config = config();
    let (mut client, probe) = client_for(&config);
    client.start();
    post_resolved(&probe, Ok(vec![endpoint("192.0.2.1:1194")]));
    client.dispatch_pending();

    post_link(&probe, ClientInput::LinkRead(BytesMut::from(&b"early"[..])));
    client.dispatch_pending();
    client.stop();
    post_link(&probe, ClientInput::LinkRead(BytesMut::from(&b"late"[..])));
    post_link(&probe, ClientInput::LinkError("eof".into()));
    client.dispatch_pending();

    assert_eq!(
        client.parent().events,
        vec![
            TransportEvent::PreResolve,
            TransportEvent::Connecting,
            TransportEvent::Recv(BytesMut::from(&b"early"[..])),
        ]
    );
}

#[test]
fn test_send_without_link_fails() {
    let config = config();
    let (mut client, probe) = client_for(&config);
    assert!(!client.transport_send(BytesMut::from(&b"x"[..])));
    client.start();
    assert!(!client.transport_send_const(b"x"));
    assert!(probe.borrow().sent.is_empty());
}

#[test]
fn test_send_passes_through_link_verdict() {
    let config = config();
    config.endpoint_cache().set_endpoint(endpoint("192.0.2.1:1194"));
    let (mut client, probe) = client_for(&config);
    client.start();

    assert!(client.transport_send_const(b"first"));
    probe.borrow_mut().reject_sends = true;
    assert!(!client.transport_send(BytesMut::from(&b"second"[..])));

    assert_eq!(probe.borrow().sent, vec![b"first".to_vec()]);
}

#[test]
fn test_endpoint_info_reports_family() {
    let config = config();
    let (mut client, probe) = client_for(&config);
    client.start();
    post_resolved(&probe, Ok(vec![endpoint("[2001:db8::1]:1194")]));
    client.dispatch_pending();

    let info = client.server_endpoint_info();
    assert_eq!(info.proto, "TCPv6");
    assert_eq!(info.ip_addr, "2001:db8::1");
    assert_eq!(info.port, "1194");

    config.endpoint_cache().set_endpoint(endpoint("192.0.2.1:443"));
    let (mut v4, _) = client_for(&config);
    v4.start();
    assert_eq!(v4.server_endpoint_info().proto, "TCPv4");
}

#[test]
fn test_drop_stops_everything() {
    let config = config();
    let (mut client, probe) = client_for(&config);
    client.start();
    post_resolved(&probe, Ok(vec![endpoint("192.0.2.1:1194")]));
    client.dispatch_pending();

    drop(client);
    assert_eq!(probe.borrow().link_stops, 1);
    assert!(probe.borrow().cancels >= 1);
}
