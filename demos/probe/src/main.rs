//! Transport probe
//!
//! Connects to a tunnel server's stream port, sends each stdin line as one
//! framed packet and prints every packet received.
//!
//! Usage: `tunnel-probe [CONFIG.toml]`
//!
//! Without a config file the target comes from the environment:
//! - PROBE_HOST: Server hostname
//! - PROBE_PORT: Server port
//! - RUST_LOG: log filter (default "info")

use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tunnel_transport::client::{ClientOptions, TransportEvent};
use tunnel_transport::ConfigError;

fn load_options() -> Result<ClientOptions, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Invalid {
                field: "config path",
                reason: format!("{path}: {e}"),
            })?;
            ClientOptions::from_toml_str(&text)
        }
        None => Ok(ClientOptions {
            host: std::env::var("PROBE_HOST").unwrap_or_default(),
            port: std::env::var("PROBE_PORT").unwrap_or_default(),
            ..ClientOptions::default()
        }),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match load_options().and_then(ClientOptions::into_config) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let (events, mut rx) = mpsc::unbounded_channel::<TransportEvent>();
    let mut client = config.new_client(&Handle::current(), events);
    client.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            alive = client.dispatch_next() => {
                if !alive {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if !line.is_empty() => {
                    if !client.transport_send_const(line.as_bytes()) {
                        warn!(len = line.len(), "packet dropped");
                    }
                }
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => stdin_open = false,
            },
        }

        while let Ok(event) = rx.try_recv() {
            match event {
                TransportEvent::PreResolve => {
                    info!(host = config.server_host(), port = config.server_port(), "resolving");
                }
                TransportEvent::Connecting => {
                    let server = client.server_endpoint_info();
                    info!(
                        proto = %server.proto,
                        addr = %server.ip_addr,
                        port = %server.port,
                        "connecting"
                    );
                }
                TransportEvent::Recv(packet) => {
                    println!("{}", String::from_utf8_lossy(&packet));
                }
                TransportEvent::Error(err) => {
                    error!("{err}");
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}
