//! Asynchronous server name resolution.

use std::io;

use tokio::net::lookup_host;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use super::dispatch::{ClientInput, Dispatch};
use super::endpoint::Endpoint;

/// Resolves a (host, port) query and posts [`ClientInput::Resolved`].
pub trait Resolver {
    /// Start resolving `host`:`port`. The result is posted to `dispatch`
    /// exactly once, unless the query is cancelled first.
    fn async_resolve(&mut self, host: &str, port: &str, dispatch: Dispatch);

    /// Cancel an outstanding query. No-op if none is pending.
    fn cancel(&mut self);
}

/// Resolver backed by the tokio runtime's system lookup.
#[derive(Debug)]
pub struct TokioResolver {
    handle: Handle,
    /// Lookup in flight, aborted by `cancel`.
    pending: Option<JoinHandle<()>>,
}

impl TokioResolver {
    /// Create a resolver that spawns lookups on `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            pending: None,
        }
    }

    /// Check if a lookup is still running.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Resolver for TokioResolver {
    fn async_resolve(&mut self, host: &str, port: &str, dispatch: Dispatch) {
        self.cancel();
        let host = host.to_owned();
        let port = port.to_owned();
        self.pending = Some(self.handle.spawn(async move {
            let result = resolve(&host, &port).await;
            trace!(host = %host, port = %port, ok = result.is_ok(), "resolve finished");
            dispatch.post(ClientInput::Resolved(result));
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for TokioResolver {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Resolve `host`:`port` into endpoints, in system resolver order.
pub async fn resolve(host: &str, port: &str) -> io::Result<Vec<Endpoint>> {
    let port: u16 = port.parse().map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("invalid port '{port}'"))
    })?;
    let endpoints: Vec<Endpoint> = lookup_host((host, port)).await?.map(Endpoint::from).collect();
    if endpoints.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "resolver returned no addresses",
        ));
    }
    Ok(endpoints)
}
