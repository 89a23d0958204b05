use std::{
    error::Error as StdError,
    io::{self, Read},
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use provision_common::{
    ConfigError, HttpResponse, MacAddress, Node, ResponseBody, RuntimeConfig, Station,
    StationError, Transport, TransportError, WifiCredentials,
};

const DEFAULT_HOST_MAC: &str = "02:00:00:00:00:01";
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const HTTP_CHUNK_SIZE: usize = 512;
const DEFAULT_LOG_FILTER: &str = "info";

/// Stands in for the radio on a desktop host: always associated.
struct HostStation {
    mac: MacAddress,
}

impl Station for HostStation {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), StationError> {
        info!(
            "host build has no radio; pretending to join `{}`",
            credentials.ssid
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn mac_address(&self) -> Result<MacAddress, StationError> {
        Ok(self.mac)
    }
}

struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(HTTP_TIMEOUT).build(),
        }
    }
}

impl Transport for UreqTransport {
    fn post_json(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<HttpResponse, TransportError> {
        let request = headers
            .iter()
            .fold(self.agent.post(url), |request, (name, value)| {
                request.set(name, value)
            });

        let response = match request.send_string(body) {
            Ok(response) => response,
            // 4xx/5xx still count as a completed exchange.
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => return Err(map_transport_error(&err)),
        };

        let status = response.status();
        let mut reader = response.into_reader();
        let mut received = ResponseBody::default();
        let mut chunk = [0_u8; HTTP_CHUNK_SIZE];
        loop {
            let read = reader
                .read(&mut chunk)
                .map_err(|_| TransportError::ConnectionLost)?;
            if read == 0 {
                break;
            }
            received.push(&chunk[..read]);
        }

        Ok(received.into_response(status))
    }
}

fn map_transport_error(err: &ureq::Transport) -> TransportError {
    match err.kind() {
        ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => {
            TransportError::ConnectionRefused
        }
        ureq::ErrorKind::Io => {
            if is_timeout(err) {
                TransportError::ReadTimeout
            } else {
                TransportError::ConnectionLost
            }
        }
        _ => TransportError::Platform {
            code: -100,
            message: err.to_string(),
        },
    }
}

/// Walks the source chain looking for an I/O timeout.
fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// `RUST_LOG` when set, otherwise info so report lines are visible.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn load_runtime_config() -> anyhow::Result<RuntimeConfig> {
    let runtime = RuntimeConfig::from_lookup(|key| std::env::var(key).ok())
        .context("invalid runtime configuration in environment")?;

    match runtime.validate() {
        Ok(()) => {}
        // The host station ignores credentials.
        Err(err @ ConfigError::MissingSsid) => warn!("{err}; continuing with simulated wifi"),
        Err(err) => return Err(err).context("invalid runtime configuration"),
    }

    Ok(runtime)
}

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let runtime = load_runtime_config()?;

    let mac = std::env::var("DEVICE_MAC")
        .unwrap_or_else(|_| DEFAULT_HOST_MAC.to_string())
        .parse::<MacAddress>()
        .context("DEVICE_MAC is not a valid hardware address")?;

    info!(
        "host node starting (mac {mac}, provision {}, ping {})",
        runtime.endpoints.provision_url, runtime.endpoints.ping_url
    );

    let started = Instant::now();
    let loop_delay = Duration::from_millis(runtime.timing.loop_delay_ms);
    let mut node = Node::new(&runtime, HostStation { mac }, UreqTransport::new());

    node.boot(thread::sleep);

    loop {
        let now_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        node.tick(now_ms);
        thread::sleep(loop_delay);
    }
}
