use core::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::{config::NetworkConfig, mac::MacAddress};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StationError {
    #[error("wifi driver error: {0}")]
    Driver(String),
    #[error("credentials rejected by driver: {0}")]
    Credentials(&'static str),
    #[error("mac address unavailable: {0}")]
    MacUnavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

impl From<&NetworkConfig> for WifiCredentials {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            ssid: network.wifi_ssid.clone(),
            password: network.wifi_pass.clone(),
        }
    }
}

/// A WiFi station interface.
pub trait Station {
    /// Starts an association attempt. Must not block until connected.
    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), StationError>;

    fn is_connected(&self) -> bool;

    /// Called after every poll that found the link down. Drivers that do
    /// not reassociate on their own restart the attempt here.
    fn retry(&mut self) -> Result<(), StationError> {
        Ok(())
    }

    fn mac_address(&self) -> Result<MacAddress, StationError>;
}

/// Blocks until `station` reports a connected link, polling every
/// `poll_interval`. There is no timeout: an unreachable network keeps this
/// looping forever. Returns the number of failed polls.
pub fn connect_blocking<S, F>(
    station: &mut S,
    credentials: &WifiCredentials,
    poll_interval: Duration,
    mut sleep: F,
) -> u64
where
    S: Station + ?Sized,
    F: FnMut(Duration),
{
    if let Err(err) = station.begin(credentials) {
        warn!("wifi begin failed: {err}");
    }
    info!("Connecting to WiFi `{}`...", credentials.ssid);

    let mut polls: u64 = 0;
    while !station.is_connected() {
        sleep(poll_interval);
        polls = polls.saturating_add(1);
        info!(".");

        if let Err(err) = station.retry() {
            debug!("wifi retry failed: {err}");
        }
    }

    info!("Connected!");
    polls
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    struct ScriptedStation {
        begun: Vec<WifiCredentials>,
        retries: u32,
        polls_until_up: Cell<u32>,
        fail_begin: bool,
    }

    impl ScriptedStation {
        fn new(polls_until_up: u32) -> Self {
            Self {
                begun: Vec::new(),
                retries: 0,
                polls_until_up: Cell::new(polls_until_up),
                fail_begin: false,
            }
        }
    }

    impl Station for ScriptedStation {
        fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), StationError> {
            self.begun.push(credentials.clone());
            if self.fail_begin {
                Err(StationError::Driver("radio busy".to_string()))
            } else {
                Ok(())
            }
        }

        fn is_connected(&self) -> bool {
            let remaining = self.polls_until_up.get();
            if remaining == 0 {
                true
            } else {
                self.polls_until_up.set(remaining - 1);
                false
            }
        }

        fn retry(&mut self) -> Result<(), StationError> {
            self.retries += 1;
            Ok(())
        }

        fn mac_address(&self) -> Result<MacAddress, StationError> {
            Ok(MacAddress::new([0; 6]))
        }
    }

    fn credentials() -> WifiCredentials {
        WifiCredentials {
            ssid: "home-net".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn sleeps_once_per_failed_poll() {
        let mut station = ScriptedStation::new(4);
        let mut slept = Vec::new();

        let polls = connect_blocking(
            &mut station,
            &credentials(),
            Duration::from_millis(500),
            |d| slept.push(d),
        );

        assert_eq!(polls, 4);
        assert_eq!(slept, vec![Duration::from_millis(500); 4]);
        assert_eq!(station.begun, vec![credentials()]);
        assert_eq!(station.retries, 4);
    }

    #[test]
    fn returns_immediately_when_already_connected() {
        let mut station = ScriptedStation::new(0);
        let polls = connect_blocking(&mut station, &credentials(), Duration::from_secs(1), |_| {
            panic!("should not sleep")
        });
        assert_eq!(polls, 0);
    }

    #[test]
    fn begin_failure_does_not_abort_polling() {
        let mut station = ScriptedStation::new(2);
        station.fail_begin = true;

        let polls = connect_blocking(&mut station, &credentials(), Duration::ZERO, |_| {});
        assert_eq!(polls, 2);
    }

    #[test]
    fn credentials_follow_network_config() {
        let network = NetworkConfig {
            wifi_ssid: "home-net".to_string(),
            wifi_pass: "secret".to_string(),
        };
        assert_eq!(WifiCredentials::from(&network), credentials());
    }
}
