//! Configuration file loading

use super::schema::ProxyConfig;
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::error::ConfigError;
use crate::netspec::NetworkSpec;
use crate::parser::{ConfigParser, Diagnostic};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file used when neither a path nor the environment names one
pub const DEFAULT_CONFIG_PATH: &str = "/etc/tsocks.conf";

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "TSOCKS_CONF_FILE";

/// How the configuration was obtained
#[derive(Debug)]
pub enum LoadStatus {
    /// The file was read and parsed
    Parsed,
    /// The file could not be read; every destination is treated as local
    Missing(ConfigError),
}

/// A loaded configuration together with any rejected lines
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: ProxyConfig,
    pub diagnostics: Vec<Diagnostic>,
    pub status: LoadStatus,
}

impl LoadedConfig {
    pub fn is_missing(&self) -> bool {
        matches!(self.status, LoadStatus::Missing(_))
    }

    /// True when the file was missing or any line was rejected
    pub fn has_errors(&self) -> bool {
        self.is_missing() || !self.diagnostics.is_empty()
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        // Priority order:
        // 1. $TSOCKS_CONF_FILE
        // 2. /etc/tsocks.conf

        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    /// Configuration used when no file can be read
    pub fn fallback() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.push_local(NetworkSpec::everything());
        config.apply_defaults();
        config
    }

    /// Load config from a file, falling back to "all networks local" if it
    /// cannot be read
    pub fn load_from_file<P: AsRef<Path>>(path: P, sink: &dyn DiagnosticSink) -> LoadedConfig {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(source) => {
                sink.report(
                    Severity::Warning,
                    &format!(
                        "Could not open socks configuration file ({}), assuming all networks local",
                        path.display()
                    ),
                );
                return LoadedConfig {
                    config: Self::fallback(),
                    diagnostics: Vec::new(),
                    status: LoadStatus::Missing(ConfigError::ConfigLoad {
                        path: path.to_path_buf(),
                        source,
                    }),
                };
            }
        };

        let contents = String::from_utf8_lossy(&bytes);
        let outcome = ConfigParser::new(sink).parse_str(&contents);
        tracing::debug!(
            "Loaded {} with {} path(s), {} local network(s), {} rejected line(s)",
            path.display(),
            outcome.config.paths.len(),
            outcome.config.local_nets.len(),
            outcome.diagnostics.len()
        );

        LoadedConfig {
            config: outcome.config,
            diagnostics: outcome.diagnostics,
            status: LoadStatus::Parsed,
        }
    }

    /// Load config from optional path or the default location
    pub fn load_or_default(path: Option<PathBuf>, sink: &dyn DiagnosticSink) -> LoadedConfig {
        let path = path.unwrap_or_else(Self::default_config_path);
        Self::load_from_file(path, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProtocolVersion;
    use crate::diagnostics::CollectingSink;
    use std::io::Write;
    use std::net::Ipv4Addr;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CollectingSink::new();
        let loaded = ConfigLoader::load_from_file(dir.path().join("nonexistent.conf"), &sink);

        assert!(loaded.is_missing());
        assert!(loaded.diagnostics.is_empty());
        assert_eq!(loaded.config.local_nets, vec![NetworkSpec::everything()]);
        assert_eq!(loaded.config.default_server.port(), 1080);
        assert_eq!(loaded.config.default_server.version(), ProtocolVersion::V4);
        assert!(!loaded.config.requires_proxy(Ipv4Addr::new(8, 8, 8, 8), 443));
        assert_eq!(sink.with_severity(Severity::Warning).len(), 1);
    }

    #[test]
    fn test_load_file() {
        let file = write_config(
            "server = 1.2.3.4\n\
             local = 192.168.0.0/255.255.0.0\n\
             bogus\n\
             path {\n\
                 server = 5.6.7.8\n\
                 reaches = 10.0.0.0/255.0.0.0\n\
             }\n",
        );
        let sink = CollectingSink::new();
        let loaded = ConfigLoader::load_from_file(file.path(), &sink);

        assert!(matches!(loaded.status, LoadStatus::Parsed));
        assert_eq!(loaded.diagnostics.len(), 1);
        assert_eq!(loaded.diagnostics[0].line, 3);
        assert_eq!(loaded.config.paths.len(), 1);
        assert_eq!(loaded.config.local_nets.len(), 2);
        assert_eq!(loaded.config.local_nets.last(), Some(&NetworkSpec::loopback()));
    }

    #[test]
    fn test_has_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CollectingSink::new();
        assert!(ConfigLoader::load_from_file(dir.path().join("absent.conf"), &sink).has_errors());

        let clean = write_config("server = 1.2.3.4\n");
        assert!(!ConfigLoader::load_from_file(clean.path(), &sink).has_errors());

        let rejected = write_config("server = 1.2.3.4\nserver_port = none\n");
        assert!(ConfigLoader::load_from_file(rejected.path(), &sink).has_errors());

        // Validation warnings alone are not errors
        let unclosed = write_config("path {\n");
        assert!(!ConfigLoader::load_from_file(unclosed.path(), &sink).has_errors());
    }

    #[test]
    fn test_empty_file_still_gets_loopback() {
        let file = write_config("");
        let loaded = ConfigLoader::load_from_file(file.path(), &CollectingSink::new());
        assert_eq!(loaded.config.local_nets, vec![NetworkSpec::loopback()]);
        assert_eq!(loaded.config.default_server.port, Some(1080));
    }

    #[test]
    fn test_last_line_without_newline() {
        let file = write_config("server = 1.2.3.4\nserver_port = 1081");
        let loaded = ConfigLoader::load_from_file(file.path(), &CollectingSink::new());
        assert_eq!(loaded.config.default_server.port, Some(1081));
    }

    #[test]
    fn test_load_or_default_explicit_path() {
        let file = write_config("server = 9.9.9.9\n");
        let loaded =
            ConfigLoader::load_or_default(Some(file.path().to_path_buf()), &CollectingSink::new());
        assert_eq!(loaded.config.default_server.address.as_deref(), Some("9.9.9.9"));
    }
}
