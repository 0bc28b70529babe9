//! Application configuration
//!
//! Bundles the per-crate configs so the composition root can be built from
//! a single value.

use std::path::PathBuf;
use std::time::Duration;

use networking::ClientConfig;
use storage::StoreConfig;

/// Default log filter when `OFFLINE_CLIENT_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Configuration for [`AppServices`](crate::AppServices)
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Persistent store configuration
    pub store: StoreConfig,
    /// HTTP client configuration
    pub client: ClientConfig,
    /// Log filter used when the environment does not provide one
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            client: ClientConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl AppConfig {
    /// Create a config for the given API base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: ClientConfig::new(base_url), ..Self::default() }
    }

    /// Set the store configuration
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Set the HTTP client configuration
    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    /// Keep the store and downloads under one data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.store.path = Some(dir.clone());
        self.client.download_dir = Some(dir.join("downloads"));
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client.timeout = timeout;
        self
    }

    /// Set the default log filter
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}
