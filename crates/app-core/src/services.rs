//! Composition root
//!
//! [`AppServices`] owns one connectivity monitor, one persistent store and
//! one HTTP client. It is built once at startup and handed to whatever needs
//! it; nothing in the workspace reaches for a global.

use std::sync::Arc;

use connectivity::{ConnectivityMonitor, ConnectivitySource, ResumeGate};
use networking::HttpClient;
use storage::{PersistentStore, StoreMode};
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::logging;

/// The data-layer services shared across the app
#[derive(Clone)]
pub struct AppServices {
    monitor: Arc<ConnectivityMonitor>,
    store: Arc<PersistentStore>,
    client: Arc<HttpClient>,
}

impl AppServices {
    /// Install logging, build the services and open the store
    ///
    /// Logging uses `config.log_filter` unless a subscriber is already
    /// installed. The store never fails to open from the caller's point of
    /// view; a broken store comes up in [`StoreMode::DegradedEmpty`].
    pub async fn start(config: AppConfig, source: Arc<dyn ConnectivitySource>) -> Result<Self> {
        logging::init(&config.log_filter);
        let client = HttpClient::new(config.client)?;
        let monitor = ConnectivityMonitor::new(source);
        Self::assemble(config.store, monitor, client).await
    }

    /// Like [`start`](Self::start) with a custom resume gate for the monitor
    pub async fn start_with_gate(
        config: AppConfig,
        source: Arc<dyn ConnectivitySource>,
        gate: Arc<dyn ResumeGate>,
    ) -> Result<Self> {
        logging::init(&config.log_filter);
        let client = HttpClient::new(config.client)?;
        let monitor = ConnectivityMonitor::with_gate(source, gate);
        Self::assemble(config.store, monitor, client).await
    }

    async fn assemble(
        store_config: storage::StoreConfig,
        monitor: ConnectivityMonitor,
        client: HttpClient,
    ) -> Result<Self> {
        let store = PersistentStore::new(store_config);
        let mode = store.init().await;
        info!("Services started (store {:?}, api {})", mode, client.base_url());

        Ok(Self { monitor: Arc::new(monitor), store: Arc::new(store), client: Arc::new(client) })
    }

    /// Connectivity monitor
    pub fn monitor(&self) -> &Arc<ConnectivityMonitor> {
        &self.monitor
    }

    /// Persistent store
    pub fn store(&self) -> &Arc<PersistentStore> {
        &self.store
    }

    /// HTTP client
    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// Mode the store opened in
    pub fn store_mode(&self) -> StoreMode {
        self.store.mode().unwrap_or(StoreMode::DegradedEmpty)
    }

    /// Flush the store and release the HTTP client
    ///
    /// In-flight requests fail with a network error. The monitor keeps
    /// running until the last handle is dropped.
    pub async fn shutdown(&self) {
        self.store.flush().await;
        self.client.dispose();
        info!("Services shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectivity::{ChannelSource, RawConnectivity};
    use networking::ClientConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_start_opens_store_once() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::new("http://127.0.0.1:9").with_data_dir(dir.path());
        let source = Arc::new(ChannelSource::new(RawConnectivity::Wifi));

        let services = AppServices::start(config, source).await.unwrap();

        assert_eq!(services.store_mode(), StoreMode::Ready);
        assert_eq!(services.store().open_attempts(), 1);
        assert!(services.monitor().is_connected().await);
        assert!(!services.client().is_disposed());

        // Startup installed the subscriber
        assert!(!logging::init("debug"));
    }

    #[tokio::test]
    async fn test_clones_share_services() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::new("http://127.0.0.1:9").with_data_dir(dir.path());
        let source = Arc::new(ChannelSource::new(RawConnectivity::None));

        let services = AppServices::start(config, source).await.unwrap();
        let other = services.clone();

        assert!(Arc::ptr_eq(services.store(), other.store()));
        services.shutdown().await;
        assert!(other.client().is_disposed());
    }

    #[tokio::test]
    async fn test_invalid_client_config_fails_start() {
        let dir = TempDir::new().unwrap();
        let client = ClientConfig::new("http://127.0.0.1:9").with_header("bad header", "v");
        let config = AppConfig::default().with_client(client).with_data_dir(dir.path());

        let result = AppServices::start(config, Arc::new(ChannelSource::unknown())).await;
        assert!(result.is_err());
    }
}
