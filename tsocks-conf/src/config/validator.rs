//! Semantic checks on a loaded configuration

use super::schema::{ProtocolVersion, ProxyConfig, ServerProfile};
use thiserror::Error;

/// Something legal but probably unintended in a configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationWarning {
    #[error("Path beginning on line {path_line} has no server specified")]
    PathWithoutServer { path_line: usize },

    #[error("Path beginning on line {path_line} has no reaches statements and will never be used")]
    PathWithoutReaches { path_line: usize },

    #[error("No default server specified, connections outside local networks will fail")]
    NoDefaultServer,

    #[error("Default user or password set for SOCKS4 {server}, only SOCKS5 uses a password")]
    CredentialsOnV4 { server: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a loaded configuration
    pub fn validate(config: &ProxyConfig) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        Self::check_default_server(config, &mut warnings);

        // Report in declaration order
        for path in config.paths.iter().rev() {
            if path.address.is_none() {
                warnings.push(ValidationWarning::PathWithoutServer {
                    path_line: path.line,
                });
            }
            if path.reaches.is_empty() {
                warnings.push(ValidationWarning::PathWithoutReaches {
                    path_line: path.line,
                });
            }
        }

        for server in config.servers() {
            Self::check_credentials(server, &mut warnings);
        }

        warnings
    }

    fn check_default_server(config: &ProxyConfig, warnings: &mut Vec<ValidationWarning>) {
        if config.default_server.address.is_some() {
            return;
        }

        // A local network with an all-zero mask keeps every connection direct
        let all_local = config
            .local_nets
            .iter()
            .any(|net| u32::from(net.mask()) == 0);
        if !all_local {
            warnings.push(ValidationWarning::NoDefaultServer);
        }
    }

    fn check_credentials(server: &ServerProfile, warnings: &mut Vec<ValidationWarning>) {
        let has_credentials = server.default_user.is_some() || server.default_pass.is_some();
        if has_credentials && server.version() == ProtocolVersion::V4 {
            let server = if server.line == 0 {
                "default server".to_string()
            } else {
                format!("path beginning on line {}", server.line)
            };
            warnings.push(ValidationWarning::CredentialsOnV4 { server });
        }
    }
}
