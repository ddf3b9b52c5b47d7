//! Error types for configuration loading and routing

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config from {path}: {source}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Reasons a network specification (`ADDRESS[:PORT[-PORT]]/MASK`) is rejected.
///
/// Variants are listed in the order the checks are applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetSpecError {
    #[error("network specification is not validly constructed")]
    Malformed,

    #[error("IP address {0:?} is not valid")]
    InvalidAddress(String),

    #[error("subnet mask {0:?} is not valid")]
    InvalidMask(String),

    #[error("IP ({address}) & SUBNET ({mask}) != IP")]
    NotNetworkBase {
        address: std::net::Ipv4Addr,
        mask: std::net::Ipv4Addr,
    },

    #[error("start port {0:?} is not valid")]
    InvalidStartPort(String),

    #[error("end port {0:?} is not valid")]
    InvalidEndPort(String),

    #[error("end port {end} is less than the start port {start}")]
    EndBeforeStart { start: u16, end: u16 },
}

impl NetSpecError {
    /// True when the rejection came from the port section.
    pub fn is_port_error(&self) -> bool {
        matches!(
            self,
            NetSpecError::InvalidStartPort(_)
                | NetSpecError::InvalidEndPort(_)
                | NetSpecError::EndBeforeStart { .. }
        )
    }
}

/// A rejected configuration line. The offending line is skipped and
/// parsing continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("Badly formed path open statement (should look like \"path {{\")")]
    BadPathOpen,

    #[error("Path statements cannot be nested (path begins on line {path_line})")]
    NestedPath { path_line: usize },

    #[error("Badly formed path close statement (should look like \"}}\")")]
    BadPathClose,

    #[error("Malformed configuration pair")]
    MalformedPair,

    #[error("Invalid pair type ({0}) specified")]
    UnknownDirective(String),

    #[error("{directive} may only be specified once for the default server")]
    DuplicateDefault { directive: &'static str },

    #[error("{directive} may only be specified once per path (path begins on line {path_line})")]
    DuplicateInPath {
        directive: &'static str,
        path_line: usize,
    },

    #[error("Invalid server port number ({0})")]
    InvalidPort(String),

    #[error("Invalid server type ({0}), only 4 or 5 may be specified")]
    InvalidServerType(String),

    #[error("Invalid {directive} specification ({value}): {source}")]
    InvalidNetwork {
        directive: &'static str,
        value: String,
        source: NetSpecError,
    },

    #[error("Local networks cannot be specified in path block (path begins on line {path_line})")]
    LocalInPath { path_line: usize },

    #[error("Port specification is not allowed in local network specification ({0})")]
    PortInLocal(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("No server address configured")]
    NoAddress,

    #[error("{0} is not a numeric IPv4 address and name lookups are disabled")]
    NotNumeric(String),

    #[error("Could not resolve {host}: {source}")]
    Lookup {
        host: String,
        source: std::io::Error,
    },

    #[error("{0} has no IPv4 address")]
    NoIpv4(String),
}
