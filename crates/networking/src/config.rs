//! HTTP client configuration

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for [`HttpClient`](crate::HttpClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base endpoint every route is appended to (e.g., "https://api.example.com")
    ///
    /// Empty by default; set it with [`ClientConfig::new`]. Relative routes
    /// fail with an invalid URL error until it is set.
    pub base_url: String,
    /// Timeout for JSON requests
    pub timeout: Duration,
    /// Timeout for file downloads
    pub download_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Custom headers to include in all requests
    pub default_headers: HashMap<String, String>,
    /// Where downloads are written (None resolves a platform directory)
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(300),
            user_agent: format!("offline-client/{}", env!("CARGO_PKG_VERSION")),
            default_headers: HashMap::new(),
            download_dir: None,
        }
    }
}

impl ClientConfig {
    /// Create a new config with a base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Default::default() }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the download timeout
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set the download directory
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Full URL for a route
    pub fn url_for(&self, route: &str) -> String {
        join_route(&self.base_url, route)
    }

    /// Directory downloads are written to
    pub fn resolve_download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }

        dirs::document_dir()
            .or_else(dirs::data_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offline-client")
            .join("downloads")
    }
}

/// Join a base URL and a route with exactly one slash
pub fn join_route(base_url: &str, route: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), route.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert!(config.base_url.is_empty());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("offline-client/"));
        assert!(config.default_headers.is_empty());
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new("https://api.example.com")
            .with_timeout(Duration::from_secs(5))
            .with_download_timeout(Duration::from_secs(60))
            .with_user_agent("TestAgent/1.0")
            .with_header("X-Custom", "value")
            .with_download_dir("/tmp/downloads");

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.download_timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "TestAgent/1.0");
        assert_eq!(config.default_headers.get("X-Custom"), Some(&"value".to_string()));
        assert_eq!(config.resolve_download_dir(), PathBuf::from("/tmp/downloads"));
    }

    #[test]
    fn test_join_route() {
        assert_eq!(join_route("https://h", "posts/1"), "https://h/posts/1");
        assert_eq!(join_route("https://h/", "/posts/1"), "https://h/posts/1");
        assert_eq!(join_route("https://h/api", "/posts"), "https://h/api/posts");
    }
}
