//! Connectivity monitor
//!
//! Wraps a [`ConnectivitySource`] into a deduplicated, pausable status
//! stream plus an independent one-shot check.
//!
//! The monitor subscribes as soon as it is constructed and forwards source
//! events from a background task. While paused, the most recent event is
//! held and delivered on the next [`ConnectivityMonitor::start`]. A status
//! equal to the last one emitted is never emitted again.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::source::ConnectivitySource;
use crate::status::{ConnectivityStatus, RawConnectivity};

/// Buffered statuses per stream subscriber
pub const STATUS_CHANNEL_CAPACITY: usize = 16;

/// Delivery state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Forwarding events to the stream
    Running,
    /// Holding the latest event until resumed
    Paused,
}

/// Readiness check consulted before a paused monitor resumes
///
/// The default gate always allows resuming. Implementations can hold the
/// stream back, e.g. until the app is in the foreground.
pub trait ResumeGate: Send + Sync {
    /// Whether delivery may resume now
    fn ready(&self) -> bool;
}

/// Gate that never blocks resuming
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl ResumeGate for AlwaysReady {
    fn ready(&self) -> bool {
        true
    }
}

/// State shared between the monitor and its forwarding task
#[derive(Debug)]
struct Delivery {
    state: MonitorState,
    last_emitted: Option<ConnectivityStatus>,
    held: Option<ConnectivityStatus>,
}

impl Delivery {
    fn new() -> Self {
        Self { state: MonitorState::Running, last_emitted: None, held: None }
    }

    /// Route a classified event according to the current state
    fn receive(&mut self, status: ConnectivityStatus, tx: &broadcast::Sender<ConnectivityStatus>) {
        match self.state {
            MonitorState::Running => {
                self.emit(status, tx);
            }
            MonitorState::Paused => self.held = Some(status),
        }
    }

    fn emit(&mut self, status: ConnectivityStatus, tx: &broadcast::Sender<ConnectivityStatus>) -> bool {
        if self.last_emitted == Some(status) {
            return false;
        }

        self.last_emitted = Some(status);
        // A stream with no subscribers still tracks the last status
        let _ = tx.send(status);
        true
    }
}

/// Deduplicated, pausable view of platform connectivity
///
/// Must be created inside a tokio runtime. Construct one at startup and
/// share it by reference or `Arc`.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use connectivity::{ChannelSource, ConnectivityMonitor, RawConnectivity};
///
/// #[tokio::main]
/// async fn main() {
///     let source = Arc::new(ChannelSource::new(RawConnectivity::Wifi));
///     let monitor = ConnectivityMonitor::new(source.clone());
///     let mut statuses = monitor.subscribe();
///
///     source.push(RawConnectivity::Mobile);
///     println!("now {:?}", statuses.next().await);
/// }
/// ```
pub struct ConnectivityMonitor {
    source: Arc<dyn ConnectivitySource>,
    gate: Arc<dyn ResumeGate>,
    delivery: Arc<Mutex<Delivery>>,
    statuses: broadcast::Sender<ConnectivityStatus>,
    task: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// Create a running monitor over `source`
    pub fn new(source: Arc<dyn ConnectivitySource>) -> Self {
        Self::with_gate(source, Arc::new(AlwaysReady))
    }

    /// Create a running monitor with a custom resume gate
    pub fn with_gate(source: Arc<dyn ConnectivitySource>, gate: Arc<dyn ResumeGate>) -> Self {
        let (statuses, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
        let delivery = Arc::new(Mutex::new(Delivery::new()));

        let events = source.subscribe();
        let task = tokio::spawn(forward(
            events,
            Arc::clone(&source),
            Arc::clone(&delivery),
            statuses.clone(),
        ));

        Self { source, gate, delivery, statuses, task }
    }

    /// Query the platform now
    ///
    /// Independent of the stream: does not change what it considers last
    /// emitted.
    pub async fn is_connected(&self) -> bool {
        self.check_status().await.is_connected()
    }

    /// Query the platform now and classify the answer
    pub async fn check_status(&self) -> ConnectivityStatus {
        query(self.source.as_ref()).await
    }

    /// Subscribe to status changes from now on
    pub fn subscribe(&self) -> StatusStream {
        StatusStream { rx: self.statuses.subscribe(), last: None }
    }

    /// Resume delivery
    ///
    /// Consults the resume gate first; if it refuses, the monitor stays
    /// paused. On resume the event held while paused, if any, is delivered
    /// right away.
    pub fn start(&self) -> MonitorState {
        if self.state() == MonitorState::Running {
            return MonitorState::Running;
        }

        if !self.gate.ready() {
            debug!("Resume gate not ready, connectivity monitor stays paused");
            return MonitorState::Paused;
        }

        let mut delivery = self.delivery.lock();
        delivery.state = MonitorState::Running;
        if let Some(status) = delivery.held.take() {
            delivery.emit(status, &self.statuses);
        }
        MonitorState::Running
    }

    /// Pause delivery; events keep arriving and the latest one is held
    pub fn stop(&self) {
        self.delivery.lock().state = MonitorState::Paused;
    }

    /// Current delivery state
    pub fn state(&self) -> MonitorState {
        self.delivery.lock().state
    }

    /// Last status delivered to the stream
    pub fn last_emitted(&self) -> Option<ConnectivityStatus> {
        self.delivery.lock().last_emitted
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn query(source: &dyn ConnectivitySource) -> ConnectivityStatus {
    match source.check().await {
        Ok(raw) => raw.classify(),
        Err(e) => {
            debug!("Treating connectivity as offline: {}", e);
            ConnectivityStatus::Offline
        }
    }
}

async fn forward(
    mut events: broadcast::Receiver<RawConnectivity>,
    source: Arc<dyn ConnectivitySource>,
    delivery: Arc<Mutex<Delivery>>,
    statuses: broadcast::Sender<ConnectivityStatus>,
) {
    loop {
        let status = match events.recv().await {
            Ok(raw) => raw.classify(),
            Err(RecvError::Lagged(skipped)) => {
                debug!("Missed {} connectivity events, re-querying", skipped);
                query(source.as_ref()).await
            }
            Err(RecvError::Closed) => {
                info!("Connectivity source closed");
                return;
            }
        };

        delivery.lock().receive(status, &statuses);
    }
}

/// Stream of deduplicated statuses
///
/// Never yields the same status twice in a row, even after falling behind
/// and missing intermediate values.
pub struct StatusStream {
    rx: broadcast::Receiver<ConnectivityStatus>,
    last: Option<ConnectivityStatus>,
}

impl StatusStream {
    /// Wait for the next status change
    ///
    /// Returns `None` once the monitor has been dropped.
    pub async fn next(&mut self) -> Option<ConnectivityStatus> {
        loop {
            match self.rx.recv().await {
                Ok(status) if self.last == Some(status) => continue,
                Ok(status) => {
                    self.last = Some(status);
                    return Some(status);
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Status stream lagged by {}", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ChannelSource, MockConnectivitySource, SourceError};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Let the forwarding task drain pending events
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn assert_quiet(stream: &mut StatusStream) {
        let next = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(next.is_err(), "unexpected status {:?}", next);
    }

    fn setup() -> (Arc<ChannelSource>, ConnectivityMonitor) {
        let source = Arc::new(ChannelSource::new(RawConnectivity::None));
        let monitor = ConnectivityMonitor::new(source.clone());
        (source, monitor)
    }

    #[tokio::test]
    async fn test_raw_events_are_classified_and_deduplicated() {
        let (source, monitor) = setup();
        let mut stream = monitor.subscribe();

        for raw in [
            RawConnectivity::Mobile,
            RawConnectivity::Mobile,
            RawConnectivity::Wifi,
            RawConnectivity::None,
        ] {
            source.push(raw);
        }

        assert_eq!(stream.next().await, Some(ConnectivityStatus::Cellular));
        assert_eq!(stream.next().await, Some(ConnectivityStatus::WiFi));
        assert_eq!(stream.next().await, Some(ConnectivityStatus::Offline));
        assert_quiet(&mut stream).await;
    }

    #[tokio::test]
    async fn test_interfaces_with_same_status_do_not_emit() {
        let (source, monitor) = setup();
        let mut stream = monitor.subscribe();

        source.push(RawConnectivity::Wifi);
        source.push(RawConnectivity::Ethernet);

        assert_eq!(stream.next().await, Some(ConnectivityStatus::WiFi));
        assert_quiet(&mut stream).await;
    }

    #[tokio::test]
    async fn test_paused_events_are_held_and_delivered_on_start() {
        let (source, monitor) = setup();
        let mut stream = monitor.subscribe();

        source.push(RawConnectivity::Wifi);
        assert_eq!(stream.next().await, Some(ConnectivityStatus::WiFi));

        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Paused);
        source.push(RawConnectivity::None);
        source.push(RawConnectivity::Mobile);
        settle().await;
        assert_quiet(&mut stream).await;

        assert_eq!(monitor.start(), MonitorState::Running);
        assert_eq!(stream.next().await, Some(ConnectivityStatus::Cellular));
        assert_eq!(monitor.last_emitted(), Some(ConnectivityStatus::Cellular));
    }

    #[tokio::test]
    async fn test_start_does_not_repeat_unchanged_status() {
        let (source, monitor) = setup();
        let mut stream = monitor.subscribe();

        source.push(RawConnectivity::Wifi);
        assert_eq!(stream.next().await, Some(ConnectivityStatus::WiFi));

        monitor.stop();
        source.push(RawConnectivity::Mobile);
        source.push(RawConnectivity::Wifi);
        settle().await;

        monitor.start();
        assert_quiet(&mut stream).await;
    }

    #[tokio::test]
    async fn test_start_without_held_event_emits_nothing() {
        let (_source, monitor) = setup();
        let mut stream = monitor.subscribe();

        monitor.stop();
        monitor.start();

        assert_quiet(&mut stream).await;
        assert_eq!(monitor.last_emitted(), None);
    }

    #[tokio::test]
    async fn test_resume_gate_can_hold_monitor_paused() {
        struct Flag(AtomicBool);
        impl ResumeGate for Flag {
            fn ready(&self) -> bool {
                self.0.load(Ordering::SeqCst)
            }
        }

        let source = Arc::new(ChannelSource::new(RawConnectivity::None));
        let gate = Arc::new(Flag(AtomicBool::new(false)));
        let monitor = ConnectivityMonitor::with_gate(source.clone(), gate.clone());
        let mut stream = monitor.subscribe();

        monitor.stop();
        source.push(RawConnectivity::Wifi);
        settle().await;

        assert_eq!(monitor.start(), MonitorState::Paused);
        assert_quiet(&mut stream).await;

        gate.0.store(true, Ordering::SeqCst);
        assert_eq!(monitor.start(), MonitorState::Running);
        assert_eq!(stream.next().await, Some(ConnectivityStatus::WiFi));
    }

    #[tokio::test]
    async fn test_is_connected_queries_platform() {
        let (source, monitor) = setup();
        assert!(!monitor.is_connected().await);

        source.set_current(Some(RawConnectivity::Mobile));
        assert!(monitor.is_connected().await);
        assert_eq!(monitor.check_status().await, ConnectivityStatus::Cellular);

        // One-shot checks leave the stream state alone
        assert_eq!(monitor.last_emitted(), None);
    }

    #[tokio::test]
    async fn test_platform_errors_read_as_offline() {
        let (tx, _) = broadcast::channel(4);
        let mut source = MockConnectivitySource::new();
        source
            .expect_check()
            .returning(|| Err(SourceError::Query("denied".to_string())));
        source.expect_subscribe().returning(move || tx.subscribe());

        let monitor = ConnectivityMonitor::new(Arc::new(source));
        assert!(!monitor.is_connected().await);
        assert_eq!(monitor.check_status().await, ConnectivityStatus::Offline);
    }

    #[tokio::test]
    async fn test_stream_ends_when_monitor_dropped() {
        let (_source, monitor) = setup();
        let mut stream = monitor.subscribe();

        drop(monitor);
        assert_eq!(stream.next().await, None);
    }

    #[test]
    fn test_delivery_never_emits_consecutive_duplicates() {
        let raws = [
            RawConnectivity::Wifi,
            RawConnectivity::Mobile,
            RawConnectivity::Ethernet,
            RawConnectivity::None,
        ];

        // Every sequence of length 5 over the four raw values
        for n in 0..raws.len().pow(5) {
            let (tx, mut rx) = broadcast::channel(8);
            let mut delivery = Delivery::new();
            let mut code = n;
            for _ in 0..5 {
                delivery.receive(raws[code % raws.len()].classify(), &tx);
                code /= raws.len();
            }

            let mut emitted = Vec::new();
            while let Ok(status) = rx.try_recv() {
                emitted.push(status);
            }
            assert!(!emitted.is_empty());
            assert!(emitted.windows(2).all(|pair| pair[0] != pair[1]), "{:?}", emitted);
        }
    }
}
