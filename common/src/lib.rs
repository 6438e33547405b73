//! Types shared between the slotd service, its storage layer and the
//! operator tooling.

pub mod identity;
pub mod params;
pub mod views;

use std::collections::BTreeMap;

/// Free-form attributes attached to an activation. Ordered so that the
/// serialized form is stable across calls.
pub type Labels = BTreeMap<String, String>;

/// Scrape port used when a device does not report one.
pub const DEFAULT_SCRAPE_PORT: u16 = 9182;

/// Label keys written at admission and echoed on the discovery feed.
pub mod label_keys {
    pub const PORT: &str = "port";
    pub const JOB: &str = "job";
    pub const AGENT_KEY: &str = "__meta_agent_key";
    pub const DEVICE_ID: &str = "__meta_device_id";
}
