//! Configuration and routing core for a transparent SOCKS client
//!
//! Parses a `tsocks.conf`-style rules file into a [`ProxyConfig`] and answers
//! two questions per connection: does the destination need a proxy at all,
//! and which server should carry it.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod global;
pub mod logging;
pub mod netspec;
pub mod parser;
pub mod resolve;
pub mod route;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidator, LoadStatus, LoadedConfig, ProtocolVersion, ProxyConfig,
    ServerProfile, ValidationWarning,
};
pub use diagnostics::{CollectingSink, DiagnosticSink, Severity, TracingSink};
pub use error::{ConfigError, DirectiveError, NetSpecError, ResolveError, Result};
pub use netspec::{NetworkSpec, PortRange};
pub use parser::{ConfigParser, Diagnostic, ParseOutcome};
pub use resolve::{HostResolver, SystemResolver};
pub use route::RouteDecision;
