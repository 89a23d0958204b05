use core::time::Duration;

use crate::{
    config::RuntimeConfig,
    reporter::{ReportKind, ReportOutcome, Reporter, Transport},
    schedule::PingSchedule,
    wifi::{connect_blocking, Station, WifiCredentials},
};

/// Boot-then-ping driver shared by every platform.
pub struct Node<S, T> {
    station: S,
    transport: T,
    credentials: WifiCredentials,
    wifi_poll: Duration,
    reporter: Reporter,
    schedule: PingSchedule,
}

impl<S: Station, T: Transport> Node<S, T> {
    pub fn new(runtime: &RuntimeConfig, station: S, transport: T) -> Self {
        Self {
            station,
            transport,
            credentials: WifiCredentials::from(&runtime.network),
            wifi_poll: Duration::from_millis(runtime.timing.wifi_poll_ms),
            reporter: Reporter::new(runtime.endpoints.clone()),
            schedule: PingSchedule::from_millis(runtime.timing.ping_interval_ms),
        }
    }

    /// Joins the network, blocking until associated, then provisions once.
    pub fn boot<F>(&mut self, sleep: F) -> ReportOutcome
    where
        F: FnMut(Duration),
    {
        connect_blocking(&mut self.station, &self.credentials, self.wifi_poll, sleep);
        self.provision()
    }

    pub fn provision(&mut self) -> ReportOutcome {
        self.reporter
            .report(ReportKind::Provision, &self.station, &mut self.transport)
    }

    /// One main-loop iteration: pings when the schedule says so.
    pub fn tick(&mut self, now_ms: u64) -> Option<ReportOutcome> {
        if !self.schedule.due(now_ms) {
            return None;
        }

        Some(
            self.reporter
                .report(ReportKind::Ping, &self.station, &mut self.transport),
        )
    }

    pub fn station(&self) -> &S {
        &self.station
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}
