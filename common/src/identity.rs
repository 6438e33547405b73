use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const DEVICE_ID_PREFIX: &str = "device-";

/// Caller-facing identifier of a device.
///
/// A device id is a pure function of the agent key that admitted it, so the
/// same agent always maps to the same device and the mapping can be inverted
/// without a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn for_agent(agent_key: &str) -> Self {
        Self(format!("{DEVICE_ID_PREFIX}{agent_key}"))
    }

    /// Parse a device id received from a caller. Returns `None` when the
    /// value was not produced by [`DeviceId::for_agent`].
    pub fn parse(s: &str) -> Option<Self> {
        match s.strip_prefix(DEVICE_ID_PREFIX) {
            Some(agent_key) if !agent_key.is_empty() => Some(Self(s.to_string())),
            _ => None,
        }
    }

    /// The agent key this device id was derived from.
    pub fn agent_key(&self) -> &str {
        // Constructors guarantee the prefix is present.
        &self.0[DEVICE_ID_PREFIX.len()..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a device id: {value}"))
    }
}

impl From<DeviceId> for String {
    fn from(value: DeviceId) -> Self {
        value.0
    }
}
