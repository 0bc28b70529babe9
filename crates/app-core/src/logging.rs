//! Logging setup
//!
//! Installs a `tracing-subscriber` formatter once per process. The filter
//! comes from `OFFLINE_CLIENT_LOG` when set, otherwise from the caller.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
pub const LOG_ENV_VAR: &str = "OFFLINE_CLIENT_LOG";

/// Build the filter from the environment, falling back to `default_filter`
pub fn filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber
///
/// Returns `false` if a subscriber was already installed, in which case the
/// existing one stays in place.
pub fn init(default_filter: &str) -> bool {
    match tracing_subscriber::fmt().with_env_filter(filter(default_filter)).try_init() {
        Ok(()) => {
            tracing::debug!("Logging initialized");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("warn");
        assert!(!init("debug"));
    }

    #[test]
    fn test_filter_falls_back_to_default() {
        if std::env::var(LOG_ENV_VAR).is_err() {
            assert_eq!(filter("warn").to_string(), "warn");
        }
    }
}
