use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PLACEHOLDER_SSID: &str = "CHANGE_ME";

pub const LOCAL_PROVISION_URL: &str = "http://192.168.254.76:8080/api/devices/register";
pub const LOCAL_PING_URL: &str = "http://192.168.254.76:8080/api/devices/ping";
pub const PRODUCTION_PROVISION_URL: &str = "https://intelvis.ai/api/provision";
pub const PRODUCTION_PING_URL: &str = "https://intelvis.ai/api/devices/ping";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("wifi ssid is not configured")]
    MissingSsid,
    #[error("{field} must start with http:// or https:// (got `{value}`)")]
    InvalidUrl { field: &'static str, value: String },
    #[error("{field} is not a valid number (got `{value}`)")]
    InvalidNumber { field: &'static str, value: String },
    #[error("ping interval must be greater than zero")]
    ZeroPingInterval,
    #[error("unknown endpoint profile `{0}` (expected `local` or `production`)")]
    UnknownProfile(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: PLACEHOLDER_SSID.to_string(),
            wifi_pass: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub provision_url: String,
    pub ping_url: String,
    /// Sent as `X-API-Key` on the provisioning request only.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            provision_url: LOCAL_PROVISION_URL.to_string(),
            ping_url: LOCAL_PING_URL.to_string(),
            api_key: None,
        }
    }
}

impl EndpointConfig {
    pub fn production(api_key: Option<String>) -> Self {
        Self {
            provision_url: PRODUCTION_PROVISION_URL.to_string(),
            ping_url: PRODUCTION_PING_URL.to_string(),
            api_key,
        }
    }

    /// `local` (default) or `production`.
    pub fn for_profile(profile: &str) -> Result<Self, ConfigError> {
        match profile.trim().to_ascii_lowercase().as_str() {
            "" | "local" => Ok(Self::default()),
            "production" | "prod" => Ok(Self::production(None)),
            _ => Err(ConfigError::UnknownProfile(profile.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    pub wifi_poll_ms: u64,
    pub ping_interval_ms: u64,
    pub loop_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wifi_poll_ms: 500,
            ping_interval_ms: 60_000,
            loop_delay_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub network: NetworkConfig,
    pub endpoints: EndpointConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl RuntimeConfig {
    /// Overlays the defaults with whatever `lookup` knows about.
    ///
    /// Recognised keys: `ENDPOINT_PROFILE`, `WIFI_SSID`, `WIFI_PASS`,
    /// `PROVISION_URL`, `PING_URL`, `PROVISION_API_KEY`, `PING_INTERVAL_MS`.
    /// Explicit URLs win over the profile.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut runtime = Self::default();

        if let Some(profile) = lookup("ENDPOINT_PROFILE") {
            runtime.endpoints = EndpointConfig::for_profile(&profile)?;
        }
        if let Some(ssid) = lookup("WIFI_SSID") {
            runtime.network.wifi_ssid = ssid;
        }
        if let Some(pass) = lookup("WIFI_PASS") {
            runtime.network.wifi_pass = pass;
        }
        if let Some(url) = lookup("PROVISION_URL") {
            runtime.endpoints.provision_url = url;
        }
        if let Some(url) = lookup("PING_URL") {
            runtime.endpoints.ping_url = url;
        }
        if let Some(key) = lookup("PROVISION_API_KEY") {
            runtime.endpoints.api_key = Some(key);
        }
        if let Some(raw) = lookup("PING_INTERVAL_MS") {
            runtime.timing.ping_interval_ms =
                raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                    field: "PING_INTERVAL_MS",
                    value: raw.clone(),
                })?;
        }

        runtime.sanitize();
        Ok(runtime)
    }

    pub fn sanitize(&mut self) {
        self.network.wifi_ssid = self.network.wifi_ssid.trim().to_string();
        self.endpoints.provision_url = self.endpoints.provision_url.trim().to_string();
        self.endpoints.ping_url = self.endpoints.ping_url.trim().to_string();

        self.endpoints.api_key = self
            .endpoints
            .api_key
            .take()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ssid = self.network.wifi_ssid.trim();
        if ssid.is_empty() || ssid == PLACEHOLDER_SSID {
            return Err(ConfigError::MissingSsid);
        }

        validate_url("PROVISION_URL", &self.endpoints.provision_url)?;
        validate_url("PING_URL", &self.endpoints.ping_url)?;

        if self.timing.ping_interval_ms == 0 {
            return Err(ConfigError::ZeroPingInterval);
        }

        Ok(())
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let has_host = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());

    if has_host {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}
