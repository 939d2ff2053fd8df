//! Built-in demo network: three Kano routes, three buses, three tickets.
//!
//! Positions are `[lat, lon]`.

use crate::config::{ConfigError, NetworkConfig};

const KANO_NETWORK: &str = include_str!("../assets/kano-network.json");

pub fn network_config() -> Result<NetworkConfig, ConfigError> {
    NetworkConfig::from_json(KANO_NETWORK)
}
