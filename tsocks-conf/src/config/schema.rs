//! Configuration tree types

use crate::netspec::NetworkSpec;
use serde::{Serialize, Serializer};
use std::fmt;

/// Port used for a server with no `server_port`
pub const DEFAULT_SERVER_PORT: u16 = 1080;

/// Protocol version used for a server with no `server_type`
pub const DEFAULT_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::V4;

/// SOCKS protocol version spoken by a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V4,
    V5,
}

impl ProtocolVersion {
    /// Parse a `server_type` value; only exactly `4` or `5` is accepted
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "4" => Some(ProtocolVersion::V4),
            "5" => Some(ProtocolVersion::V5),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            ProtocolVersion::V4 => 4,
            ProtocolVersion::V5 => 5,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

fn redact<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(_) => serializer.serialize_str("********"),
        None => serializer.serialize_none(),
    }
}

/// One upstream proxy server: the default server or a path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerProfile {
    /// Hostname or literal IP, resolved only when a connection is made
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub version: Option<ProtocolVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,
    #[serde(serialize_with = "redact", skip_serializing_if = "Option::is_none")]
    pub default_pass: Option<String>,
    /// Reach rules, most recently declared first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reaches: Vec<NetworkSpec>,
    /// Line of the `path {` that opened this profile; 0 for the default server
    #[serde(skip)]
    pub line: usize,
}

impl ServerProfile {
    /// Create an empty path profile opened on `line`
    pub fn path(line: usize) -> Self {
        Self {
            line,
            ..Default::default()
        }
    }

    /// Effective server port
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Effective protocol version
    pub fn version(&self) -> ProtocolVersion {
        self.version.unwrap_or(DEFAULT_PROTOCOL_VERSION)
    }

    /// Fill in the default port and protocol version where unset
    pub fn apply_defaults(&mut self) {
        self.port = self.port.or(Some(DEFAULT_SERVER_PORT));
        self.version = self.version.or(Some(DEFAULT_PROTOCOL_VERSION));
    }

    /// Add a reach rule ahead of those already declared
    pub fn push_reach(&mut self, net: NetworkSpec) {
        self.reaches.insert(0, net);
    }
}

impl fmt::Display for ServerProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} (SOCKS{})",
            self.address.as_deref().unwrap_or("(no address)"),
            self.port(),
            self.version()
        )
    }
}

/// Parsed routing configuration.
///
/// `paths` and `local_nets` are in evaluation order: the entry declared last
/// in the file comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyConfig {
    pub local_nets: Vec<NetworkSpec>,
    pub default_server: ServerProfile,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<ServerProfile>,
}

impl ProxyConfig {
    /// Add a path ahead of those already declared
    pub fn push_path(&mut self, profile: ServerProfile) {
        self.paths.insert(0, profile);
    }

    /// Add a local network ahead of those already declared
    pub fn push_local(&mut self, net: NetworkSpec) {
        self.local_nets.insert(0, net);
    }

    /// Apply server defaults to the default server and every path
    pub fn apply_defaults(&mut self) {
        self.default_server.apply_defaults();
        for path in &mut self.paths {
            path.apply_defaults();
        }
    }

    /// All server profiles, default server first
    pub fn servers(&self) -> impl Iterator<Item = &ServerProfile> {
        std::iter::once(&self.default_server).chain(self.paths.iter())
    }

    /// Render the tree as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_version_parse() {
        assert_eq!(ProtocolVersion::parse("4"), Some(ProtocolVersion::V4));
        assert_eq!(ProtocolVersion::parse("5"), Some(ProtocolVersion::V5));
        assert_eq!(ProtocolVersion::parse("6"), None);
        assert_eq!(ProtocolVersion::parse("05"), None);
        assert_eq!(ProtocolVersion::parse(""), None);
    }

    #[test]
    fn test_apply_defaults_keeps_explicit_values() {
        let mut profile = ServerProfile {
            port: Some(9050),
            version: Some(ProtocolVersion::V5),
            ..Default::default()
        };
        profile.apply_defaults();
        assert_eq!(profile.port, Some(9050));
        assert_eq!(profile.version, Some(ProtocolVersion::V5));
    }

    #[test]
    fn test_apply_defaults_is_idempotent() {
        let mut config = ProxyConfig::default();
        config.push_path(ServerProfile::path(3));
        config.apply_defaults();
        let once = config.clone();
        config.apply_defaults();
        assert_eq!(config, once);
        assert_eq!(config.default_server.port, Some(DEFAULT_SERVER_PORT));
        assert_eq!(config.paths[0].version, Some(ProtocolVersion::V4));
    }

    #[test]
    fn test_prepend_order() {
        let mut config = ProxyConfig::default();
        config.push_path(ServerProfile::path(1));
        config.push_path(ServerProfile::path(5));
        assert_eq!(config.paths.iter().map(|p| p.line).collect::<Vec<_>>(), vec![5, 1]);

        let mut profile = ServerProfile::default();
        profile.push_reach("10.0.0.0/255.0.0.0".parse().unwrap());
        profile.push_reach("11.0.0.0/255.0.0.0".parse().unwrap());
        assert_eq!(profile.reaches[0].to_string(), "11.0.0.0/255.0.0.0");
    }

    #[test]
    fn test_toml_redacts_password() {
        let mut config = ProxyConfig::default();
        config.default_server.address = Some("proxy.example.net".to_string());
        config.default_server.default_user = Some("alice".to_string());
        config.default_server.default_pass = Some("hunter2".to_string());
        config.push_local(NetworkSpec::loopback());
        config.apply_defaults();

        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("proxy.example.net"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("127.0.0.0/255.0.0.0"));
    }
}
