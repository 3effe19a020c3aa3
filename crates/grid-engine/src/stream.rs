//! Lazy, cancellable stream of covering URIs.
//!
//! A covering is produced on a dedicated worker thread and handed over
//! through a bounded channel, so a slow consumer applies backpressure and a
//! consumer that drops the stream stops the producer at its next send.

use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{GridError, Result};

/// One element of a covering: a cell URI, or the error that ends the stream.
pub type StreamedUri = Result<String>;

/// Capacity of the producer/consumer channel.
pub const COVER_CHANNEL_CAPACITY: usize = 256;

/// Producer side handed to covering workers.
pub struct CoverSender {
    tx: mpsc::Sender<StreamedUri>,
    token: CancellationToken,
}

impl CoverSender {
    /// Send a URI, blocking while the channel is full.
    ///
    /// Returns `false` once the consumer is gone.
    pub fn send(&self, uri: String) -> bool {
        self.tx.blocking_send(Ok(uri)).is_ok()
    }

    /// Fail with `Cancelled` if the token has fired.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(GridError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Consumer side of a covering.
///
/// Every element must be checked: an `Err` element is the last one.
#[derive(Debug)]
pub struct CoverStream {
    rx: mpsc::Receiver<StreamedUri>,
}

impl CoverStream {
    /// Run `producer` on a named worker thread.
    ///
    /// An error returned by the producer, or a panic, becomes the final element.
    pub fn spawn<F>(name: &str, token: CancellationToken, producer: F) -> Self
    where
        F: FnOnce(&CoverSender) -> Result<()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(COVER_CHANNEL_CAPACITY);
        let sender = CoverSender { tx, token };

        let worker = thread::Builder::new()
            .name(format!("covers-{}", name))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| producer(&sender)))
                    .unwrap_or_else(|_| {
                        error!("Covering worker panicked");
                        Err(GridError::Worker("covering worker panicked".to_string()))
                    });

                if let Err(e) = outcome {
                    debug!(error = %e, "Covering ended with an error");
                    // The consumer may already be gone; nothing left to tell.
                    let _ = sender.tx.blocking_send(Err(e));
                }
            });

        match worker {
            Ok(_) => Self { rx },
            Err(e) => Self::ready(vec![Err(GridError::Worker(format!(
                "failed to spawn covering worker: {}",
                e
            )))]),
        }
    }

    /// A stream over already computed elements.
    pub fn ready(items: Vec<StreamedUri>) -> Self {
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // Capacity covers every item.
            let _ = tx.try_send(item);
        }
        Self { rx }
    }

    /// A stream holding a single error.
    pub fn failed(error: GridError) -> Self {
        Self::ready(vec![Err(error)])
    }

    /// Next element for synchronous consumers.
    ///
    /// Must not be called from within an async runtime.
    pub fn blocking_next(&mut self) -> Option<StreamedUri> {
        self.rx.blocking_recv()
    }

    /// Drain the stream synchronously, stopping at the first error.
    pub fn collect_uris(mut self) -> Result<Vec<String>> {
        let mut uris = Vec::new();
        while let Some(item) = self.blocking_next() {
            uris.push(item?);
        }
        Ok(uris)
    }
}

impl Stream for CoverStream {
    type Item = StreamedUri;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
