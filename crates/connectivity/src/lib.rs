//! Connectivity monitoring for the offline client
//!
//! This crate turns platform reachability notifications into a
//! deduplicated, pausable status stream and answers one-shot
//! "are we connected?" queries.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod monitor;
pub mod source;
pub mod status;

pub use monitor::{AlwaysReady, ConnectivityMonitor, MonitorState, ResumeGate, StatusStream};
pub use source::{ChannelSource, ConnectivitySource, SourceError};
pub use status::{ConnectivityStatus, RawConnectivity};
