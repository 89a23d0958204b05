use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use embedded_svc::{
    http::{client::Client as HttpClient, Status},
    io::{Read, Write},
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::prelude::Peripherals,
    http::client::{Configuration as HttpClientConfiguration, EspHttpConnection},
    io::EspIOError,
    log::EspLogger,
    nvs::EspDefaultNvsPartition,
    wifi::{BlockingWifi, EspWifi, WifiDeviceId},
};
use log::{debug, error, info};

use provision_common::{
    HttpResponse, MacAddress, Node, ResponseBody, RuntimeConfig, Station, StationError,
    Transport, TransportError, WifiCredentials,
};

const HTTP_CHUNK_SIZE: usize = 512;
const RECONNECT_EVERY_POLLS: u32 = 10;

struct EspStation {
    wifi: BlockingWifi<EspWifi<'static>>,
    polls_since_connect: u32,
}

impl EspStation {
    fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            wifi,
            polls_since_connect: 0,
        }
    }
}

impl Station for EspStation {
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), StationError> {
        let auth_method = if credentials.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };

        let configuration = Configuration::Client(ClientConfiguration {
            ssid: credentials
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| StationError::Credentials("wifi ssid too long"))?,
            password: credentials
                .password
                .as_str()
                .try_into()
                .map_err(|_| StationError::Credentials("wifi password too long"))?,
            auth_method,
            ..Default::default()
        });

        self.wifi
            .set_configuration(&configuration)
            .map_err(driver_error)?;
        self.wifi.start().map_err(driver_error)?;
        self.polls_since_connect = 0;
        self.wifi.wifi_mut().connect().map_err(driver_error)
    }

    fn is_connected(&self) -> bool {
        let associated = self.wifi.is_connected().unwrap_or(false);
        associated && self.wifi.wifi().sta_netif().is_up().unwrap_or(false)
    }

    fn retry(&mut self) -> Result<(), StationError> {
        self.polls_since_connect = self.polls_since_connect.saturating_add(1);
        if self.polls_since_connect < RECONNECT_EVERY_POLLS {
            return Ok(());
        }

        self.polls_since_connect = 0;
        if self.wifi.is_connected().unwrap_or(false) {
            // Associated, still waiting on DHCP.
            return Ok(());
        }
        self.wifi.wifi_mut().connect().map_err(driver_error)
    }

    fn mac_address(&self) -> Result<MacAddress, StationError> {
        self.wifi
            .wifi()
            .get_mac(WifiDeviceId::Sta)
            .map(MacAddress::from)
            .map_err(|err| StationError::MacUnavailable(format!("{err:?}")))
    }
}

fn driver_error(err: esp_idf_svc::sys::EspError) -> StationError {
    StationError::Driver(format!("{err:?}"))
}

/// One `EspHttpConnection` per request, default transport timeouts.
struct EspHttpTransport;

impl Transport for EspHttpTransport {
    fn post_json(
        &mut self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<HttpResponse, TransportError> {
        let http_conf = HttpClientConfiguration {
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let connection = EspHttpConnection::new(&http_conf)
            .map_err(|err| stage_error(TransportError::NotConnected, err.into()))?;
        let mut client = HttpClient::wrap(connection);

        let content_length = body.len().to_string();
        let mut request_headers = headers.to_vec();
        request_headers.push(("Content-Length", content_length.as_str()));

        let mut request = client
            .post(url, &request_headers)
            .map_err(|err| stage_error(TransportError::ConnectionRefused, err))?;
        request
            .write_all(body.as_bytes())
            .map_err(|err| stage_error(TransportError::SendPayloadFailed, err))?;

        let mut response = request
            .submit()
            .map_err(|err| stage_error(TransportError::ReadTimeout, err))?;
        let status = response.status();

        let mut received = ResponseBody::default();
        let mut chunk = [0_u8; HTTP_CHUNK_SIZE];
        loop {
            let read = response
                .read(&mut chunk)
                .map_err(|err| stage_error(TransportError::ConnectionLost, err))?;
            if read == 0 {
                break;
            }
            received.push(&chunk[..read]);
        }

        Ok(received.into_response(status))
    }
}

fn stage_error(stage: TransportError, err: EspIOError) -> TransportError {
    debug!("http {stage}: {err:?}");
    stage
}

fn build_time_env(key: &str) -> Option<String> {
    let value = match key {
        "WIFI_SSID" => option_env!("WIFI_SSID"),
        "WIFI_PASS" => option_env!("WIFI_PASS"),
        "PROVISION_URL" => option_env!("PROVISION_URL"),
        "PING_URL" => option_env!("PING_URL"),
        "PROVISION_API_KEY" => option_env!("PROVISION_API_KEY"),
        "PING_INTERVAL_MS" => option_env!("PING_INTERVAL_MS"),
        "ENDPOINT_PROFILE" => option_env!("ENDPOINT_PROFILE"),
        _ => None,
    };
    value.map(str::to_string)
}

pub fn run() -> anyhow::Result<()> {
    let booted = Instant::now();

    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let runtime = RuntimeConfig::from_lookup(build_time_env)
        .context("invalid build-time configuration")?;
    if let Err(err) = runtime.validate() {
        error!("{err}; rebuild with WIFI_SSID/WIFI_PASS and endpoint URLs set");
        return Err(err).context("build-time configuration is incomplete");
    }

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let Peripherals { modem, .. } = Peripherals::take()?;

    let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs_partition))
        .context("failed to initialize wifi driver")?;
    let wifi = BlockingWifi::wrap(esp_wifi, sys_loop).context("failed to wrap wifi driver")?;

    let loop_delay = Duration::from_millis(runtime.timing.loop_delay_ms);
    let mut node = Node::new(&runtime, EspStation::new(wifi), EspHttpTransport);

    node.boot(thread::sleep);
    info!(
        "provisioning done; pinging `{}` every {}s",
        runtime.endpoints.ping_url,
        runtime.timing.ping_interval_ms / 1000
    );

    loop {
        let uptime_ms = u64::try_from(booted.elapsed().as_millis()).unwrap_or(u64::MAX);
        node.tick(uptime_ms);
        thread::sleep(loop_delay);
    }
}
