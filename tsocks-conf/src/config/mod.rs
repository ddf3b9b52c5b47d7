//! Configuration management for the routing core

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::{ConfigLoader, LoadStatus, LoadedConfig};
pub use schema::{ProtocolVersion, ProxyConfig, ServerProfile};
pub use validator::{ConfigValidator, ValidationWarning};
