//! Platform notification sources
//!
//! A [`ConnectivitySource`] is the seam between the monitor and whatever
//! the platform offers. [`ChannelSource`] is the bridge shipped with the
//! crate: platform glue pushes interface changes into it, and it answers
//! one-shot queries with the last value it was given.

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::status::RawConnectivity;

/// Buffered events per subscriber before older ones are dropped
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Source error types
#[derive(Debug, Error)]
pub enum SourceError {
    /// The platform query failed or returned nothing usable
    #[error("Connectivity query failed: {0}")]
    Query(String),
}

/// Platform reachability notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectivitySource: Send + Sync {
    /// Ask the platform for the current interface
    async fn check(&self) -> Result<RawConnectivity, SourceError>;

    /// Receive interface changes from now on
    fn subscribe(&self) -> broadcast::Receiver<RawConnectivity>;
}

/// Channel-backed source fed by platform glue
pub struct ChannelSource {
    current: Mutex<Option<RawConnectivity>>,
    events: broadcast::Sender<RawConnectivity>,
}

impl ChannelSource {
    /// Create a source that reports `initial` until told otherwise
    pub fn new(initial: RawConnectivity) -> Self {
        Self::with_capacity(Some(initial), DEFAULT_EVENT_CAPACITY)
    }

    /// Create a source whose current state is unknown
    pub fn unknown() -> Self {
        Self::with_capacity(None, DEFAULT_EVENT_CAPACITY)
    }

    /// Create a source with a custom event buffer
    pub fn with_capacity(initial: Option<RawConnectivity>, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { current: Mutex::new(initial), events }
    }

    /// Report an interface change
    pub fn push(&self, raw: RawConnectivity) {
        *self.current.lock() = Some(raw);
        // No subscribers yet is not an error
        let _ = self.events.send(raw);
    }

    /// Change what `check` reports without notifying subscribers
    pub fn set_current(&self, raw: Option<RawConnectivity>) {
        *self.current.lock() = raw;
    }
}

#[async_trait]
impl ConnectivitySource for ChannelSource {
    async fn check(&self) -> Result<RawConnectivity, SourceError> {
        (*self.current.lock())
            .ok_or_else(|| SourceError::Query("platform reported no state".to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<RawConnectivity> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_check_reports_last_push() {
        let source = ChannelSource::new(RawConnectivity::None);
        assert_eq!(source.check().await.unwrap(), RawConnectivity::None);

        source.push(RawConnectivity::Wifi);
        assert_eq!(source.check().await.unwrap(), RawConnectivity::Wifi);
    }

    #[tokio::test]
    async fn test_unknown_check_fails() {
        let source = ChannelSource::unknown();
        assert!(source.check().await.is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_pushes_in_order() {
        let source = ChannelSource::unknown();
        let mut rx = source.subscribe();

        source.push(RawConnectivity::Mobile);
        source.push(RawConnectivity::Wifi);

        assert_eq!(rx.recv().await.unwrap(), RawConnectivity::Mobile);
        assert_eq!(rx.recv().await.unwrap(), RawConnectivity::Wifi);
    }

    #[tokio::test]
    async fn test_set_current_does_not_notify() {
        let source = ChannelSource::unknown();
        let mut rx = source.subscribe();

        source.set_current(Some(RawConnectivity::Ethernet));

        assert_eq!(source.check().await.unwrap(), RawConnectivity::Ethernet);
        assert!(rx.try_recv().is_err());
    }
}
