//! Networking for the offline client
//!
//! This crate provides the HTTP client: JSON requests against a fixed base
//! endpoint, multipart uploads, streamed downloads with progress, and a
//! single error kind for every transport failure.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod multipart;
pub mod progress;

pub use client::HttpClient;
pub use config::ClientConfig;
pub use download::DownloadedFile;
pub use error::{NetworkError, NetworkErrorCause, Result, GENERAL_NETWORK_MESSAGE};
pub use multipart::FormFile;
pub use progress::{Progress, ProgressCallback, TransferPhase};
