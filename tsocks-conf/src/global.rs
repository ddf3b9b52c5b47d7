//! Process-wide configuration, loaded once

use crate::config::loader::ConfigLoader;
use crate::config::schema::ProxyConfig;
use crate::diagnostics::TracingSink;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

static CONFIG: OnceLock<Arc<ProxyConfig>> = OnceLock::new();

/// Load the configuration on first call and return the shared copy.
///
/// Later calls return the already loaded configuration and ignore `path`.
/// Diagnostics go to `tracing`.
pub fn init(path: Option<PathBuf>) -> Arc<ProxyConfig> {
    CONFIG
        .get_or_init(|| {
            let loaded = ConfigLoader::load_or_default(path, &TracingSink);
            Arc::new(loaded.config)
        })
        .clone()
}

/// The shared configuration, if [`init`] has run
pub fn get() -> Option<Arc<ProxyConfig>> {
    CONFIG.get().cloned()
}
