pub mod config;
pub mod mac;
pub mod node;
pub mod payload;
pub mod reporter;
pub mod schedule;
pub mod wifi;

pub use config::{ConfigError, EndpointConfig, NetworkConfig, RuntimeConfig, TimingConfig};
pub use mac::{MacAddress, MacParseError};
pub use node::Node;
pub use payload::{DevicePayload, ProvisionReply};
pub use reporter::{
    HttpResponse, ReportKind, ReportOutcome, Reporter, ResponseBody, Transport, TransportError,
    MAX_RESPONSE_BODY,
};
pub use schedule::PingSchedule;
pub use wifi::{connect_blocking, Station, StationError, WifiCredentials};
