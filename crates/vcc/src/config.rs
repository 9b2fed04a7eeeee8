//! Client configuration.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vcc_protocol::DEFAULT_PORT;
use vcc_transport::DEFAULT_POLL_INTERVAL;

/// The public server the client talks to when no address is given.
pub const DEFAULT_SERVER_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(124, 223, 105, 230));

/// Settings for one client run.
///
/// Every field has a default, so a config can be built from
/// `ClientConfig::default()` and a struct update, or deserialized from a
/// partial document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address. Already resolved; the client does no DNS.
    pub server: IpAddr,

    /// Server port.
    pub port: u16,

    /// Name to log in as.
    pub username: String,

    /// How often a command waiting for its reply re-checks.
    pub poll_interval: Duration,

    /// Plugins to load at start-up, in hook order.
    pub plugins: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER_ADDR,
            port: DEFAULT_PORT,
            username: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            plugins: vec!["ban".to_owned()],
        }
    }
}
