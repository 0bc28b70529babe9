//! Transfer progress reporting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;

/// Chunk size used when streaming request bodies
pub const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Request body going out
    Send,
    /// Response body coming in
    Receive,
}

/// A progress sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Direction of the transfer
    pub phase: TransferPhase,
    /// Bytes moved so far
    pub transferred: u64,
    /// Total bytes, if known
    pub total: Option<u64>,
}

impl Progress {
    /// A send-phase sample
    pub fn send(transferred: u64, total: Option<u64>) -> Self {
        Self { phase: TransferPhase::Send, transferred, total }
    }

    /// A receive-phase sample
    pub fn receive(transferred: u64, total: Option<u64>) -> Self {
        Self { phase: TransferPhase::Receive, transferred, total }
    }

    /// Fraction complete in `0.0..=1.0`, if the total is known
    pub fn fraction(&self) -> Option<f64> {
        self.total.map(|total| {
            if total > 0 {
                (self.transferred as f64 / total as f64).min(1.0)
            } else {
                1.0
            }
        })
    }
}

/// Advisory progress callback; must not block
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

pub(crate) fn report(callback: Option<&ProgressCallback>, progress: Progress) {
    if let Some(callback) = callback {
        callback(progress);
    }
}

/// Send-phase counter shared by every piece of one request body
///
/// Multipart requests send each file part as its own body; sharing the
/// counter keeps `transferred` monotonic across parts.
#[derive(Clone)]
pub(crate) struct SendCounter {
    sent: Arc<AtomicU64>,
    total: u64,
    callback: ProgressCallback,
}

impl SendCounter {
    pub(crate) fn new(total: u64, callback: ProgressCallback) -> Self {
        Self { sent: Arc::new(AtomicU64::new(0)), total, callback }
    }

    /// Body that reports each chunk as it is consumed
    pub(crate) fn body(&self, body: Vec<u8>) -> reqwest::Body {
        let counter = self.clone();
        let body = Bytes::from(body);
        let chunks: Vec<Bytes> = (0..body.len())
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(|start| body.slice(start..(start + UPLOAD_CHUNK_SIZE).min(body.len())))
            .collect();

        let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            let len = chunk.len() as u64;
            let sent = counter.sent.fetch_add(len, Ordering::SeqCst) + len;
            (counter.callback)(Progress::send(sent, Some(counter.total)));
            Ok::<_, std::io::Error>(chunk)
        }));

        reqwest::Body::wrap_stream(stream)
    }
}

/// Request body that reports send progress as it is consumed
pub(crate) fn upload_body(body: Vec<u8>, callback: Option<ProgressCallback>) -> reqwest::Body {
    match callback {
        Some(callback) => SendCounter::new(body.len() as u64, callback).body(body),
        None => reqwest::Body::from(body),
    }
}
