use serde::{Deserialize, Serialize};

use crate::mac::MacAddress;

/// Body of both the provisioning and the ping request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePayload {
    pub mac: String,
}

impl DevicePayload {
    pub fn new(mac: MacAddress) -> Self {
        Self {
            mac: mac.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Reply shape of the registration endpoint. Only used to enrich logs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProvisionReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "deviceId", default)]
    pub device_id: Option<serde_json::Value>,
}

impl ProvisionReply {
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    pub fn device_id_string(&self) -> Option<String> {
        match self.device_id.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(id) => Some(id.clone()),
            other => Some(other.to_string()),
        }
    }
}
