//! Socket configuration.
//!
//! Everything the socket needs to know before `connect()`: where the
//! gateway listens, who we are, and which wire generation to speak.
//! Loadable from JSON; every field has a default.
//!
//! # Example
//!
//! ```
//! use tws_wire::config::SocketConfig;
//! use tws_wire::protocol::ProtocolMode;
//!
//! let config = SocketConfig::from_json(r#"{ "port": 4002, "client_id": 7 }"#).unwrap();
//! assert_eq!(config.host, "127.0.0.1");
//! assert_eq!(config.port, 4002);
//! assert_eq!(config.mode, ProtocolMode::LengthPrefixed);
//! ```

use serde::Deserialize;

use crate::codec::Message;
use crate::error::{Result, WireError};
use crate::msg;
use crate::protocol::{
    build_negotiation, ProtocolMode, DEFAULT_MAX_PAYLOAD_SIZE, MAX_CLIENT_VERSION,
    MIN_CLIENT_VERSION,
};

/// Default gateway host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default gateway port (TWS live).
pub const DEFAULT_PORT: u16 = 7496;

/// Client version sent in the V100+ start message.
pub const CLIENT_V100_VERSION: u32 = 176;

/// Client version sent first on a legacy connection.
pub const CLIENT_VERSION: u32 = 63;

/// Version field of the V100+ start message.
pub const START_API_VERSION: u32 = 2;

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Gateway host name or address.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Client id announced during the handshake.
    pub client_id: i32,
    /// Optional capabilities string (V100+ only).
    pub optional_capabilities: String,
    /// Wire generation.
    pub mode: ProtocolMode,
    /// Client version sent in the V100+ start message.
    pub client_version: u32,
    /// Client version sent on a legacy connection.
    pub legacy_client_version: u32,
    /// Lowest version offered in the negotiation string.
    pub min_version: u32,
    /// Highest version offered in the negotiation string.
    pub max_version: u32,
    /// Largest inbound payload accepted before the stream is declared corrupt.
    pub max_payload_size: u32,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            client_id: 0,
            optional_capabilities: String::new(),
            mode: ProtocolMode::default(),
            client_version: CLIENT_V100_VERSION,
            legacy_client_version: CLIENT_VERSION,
            min_version: MIN_CLIENT_VERSION,
            max_version: MAX_CLIENT_VERSION,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }
}

impl SocketConfig {
    /// Parse a JSON document and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SocketConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field consistency.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(WireError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(WireError::Config("port must not be 0".to_string()));
        }
        if self.min_version > self.max_version {
            return Err(WireError::Config(format!(
                "min_version {} is above max_version {}",
                self.min_version, self.max_version
            )));
        }
        Ok(())
    }

    /// The V100+ negotiation string for this config.
    pub fn negotiation(&self) -> String {
        build_negotiation(self.min_version, self.max_version)
    }

    /// Messages sent right after the transport is established, in order.
    pub fn handshake_messages(&self) -> Vec<Message> {
        match self.mode {
            ProtocolMode::LengthPrefixed => vec![
                Message::from(self.negotiation()),
                msg![
                    self.client_version,
                    START_API_VERSION,
                    self.client_id,
                    self.optional_capabilities.clone()
                ],
            ],
            ProtocolMode::Legacy => vec![msg![self.legacy_client_version], msg![self.client_id]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SocketConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.mode, ProtocolMode::LengthPrefixed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = SocketConfig::from_json(
            r#"{ "host": "gw", "port": 4001, "mode": "legacy", "client_id": 3 }"#,
        )
        .unwrap();
        assert_eq!(config.host, "gw");
        assert_eq!(config.mode, ProtocolMode::Legacy);
        assert_eq!(config.client_id, 3);
        assert_eq!(config.max_version, MAX_CLIENT_VERSION);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            SocketConfig::from_json(r#"{ "port": 0 }"#),
            Err(WireError::Config(_))
        ));
        assert!(matches!(
            SocketConfig::from_json(r#"{ "min_version": 110, "max_version": 100 }"#),
            Err(WireError::Config(_))
        ));
        assert!(matches!(
            SocketConfig::from_json("{ not json"),
            Err(WireError::Json(_))
        ));
    }

    #[test]
    fn test_length_prefixed_handshake() {
        let config = SocketConfig {
            client_id: 5,
            ..SocketConfig::default()
        };
        let msgs = config.handshake_messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].fields(), vec!["API\0\0\0\0\tv100..106"]);
        assert_eq!(msgs[1].fields(), vec!["176", "2", "5", ""]);
    }

    #[test]
    fn test_legacy_handshake() {
        let config = SocketConfig {
            mode: ProtocolMode::Legacy,
            legacy_client_version: 76,
            client_id: 1,
            ..SocketConfig::default()
        };
        let msgs = config.handshake_messages();
        assert_eq!(msgs[0].fields(), vec!["76"]);
        assert_eq!(msgs[1].fields(), vec!["1"]);
    }
}
