use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{Cursor, PollError, PollResult, RetryPolicy, UpdateEvent, UpdateSource};

/// Configuration for an update stream
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Backoff for transient poll failures
    pub retry: RetryPolicy,

    /// Pause after an empty batch; zero re-polls immediately
    pub min_poll_interval: Duration,
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }
}

/// Ordered, single-consumer feed of updates driven by a background poll task.
///
/// The stream ends when the cancellation token fires (after the current batch
/// is delivered) or when polling fails for good. [`UpdateStream::finish`]
/// tells the two apart.
pub struct UpdateStream<P> {
    rx: mpsc::Receiver<UpdateEvent<P>>,
    handle: JoinHandle<PollResult<()>>,
    cancel: CancellationToken,
}

impl<P: Send + 'static> UpdateStream<P> {
    /// Start polling `source` from `start_offset` on a new task
    pub fn subscribe<S>(
        source: S,
        start_offset: i64,
        cancel: CancellationToken,
        config: StreamConfig,
    ) -> Self
    where
        S: UpdateSource<Payload = P> + 'static,
    {
        // Capacity 1: a slow consumer stalls polling
        let (tx, rx) = mpsc::channel(1);

        let poll_loop = PollLoop {
            source,
            cursor: Cursor::new(start_offset),
            tx,
            cancel: cancel.clone(),
            config,
        };
        let handle = tokio::spawn(poll_loop.run());

        Self { rx, handle, cancel }
    }
}

impl<P> UpdateStream<P> {
    /// Next update, or `None` once the poll task has stopped
    pub async fn recv(&mut self) -> Option<UpdateEvent<P>> {
        self.rx.recv().await
    }

    /// Token observed by the poll task
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop consuming and wait for the poll task's termination status
    pub async fn finish(self) -> PollResult<()> {
        let Self { rx, handle, .. } = self;
        drop(rx);

        match handle.await {
            Ok(result) => result,
            Err(e) => Err(PollError::fatal(format!("poll task failed: {}", e))),
        }
    }
}

impl<P> Stream for UpdateStream<P> {
    type Item = UpdateEvent<P>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// Background task owning the cursor
struct PollLoop<S: UpdateSource> {
    source: S,
    cursor: Cursor,
    tx: mpsc::Sender<UpdateEvent<S::Payload>>,
    cancel: CancellationToken,
    config: StreamConfig,
}

enum Cycle<T> {
    Batch(T),
    Cancelled,
}

impl<S: UpdateSource> PollLoop<S> {
    async fn run(self) -> PollResult<()> {
        let result = self.poll_forever().await;
        match &result {
            Ok(()) => info!("Update stream stopped"),
            Err(e) => error!("Update stream terminated: {}", e),
        }
        result
    }

    #[instrument(skip(self), fields(start = self.cursor.next()))]
    async fn poll_forever(mut self) -> PollResult<()> {
        info!("Update stream started");

        loop {
            if self.tx.is_closed() {
                debug!("Consumer dropped the stream");
                return Ok(());
            }

            let batch = match self.poll_with_retry().await? {
                Cycle::Batch(batch) => batch,
                Cycle::Cancelled => return Ok(()),
            };
            let empty = batch.is_empty();

            if !self.deliver(batch).await {
                debug!("Consumer dropped the stream mid-batch");
                return Ok(());
            }

            // Only between batches, never inside one
            if self.cancel.is_cancelled() {
                info!(next = self.cursor.next(), "Cancellation observed");
                return Ok(());
            }

            if empty && !self.config.min_poll_interval.is_zero() {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(self.config.min_poll_interval) => {}
                }
            }
        }
    }

    async fn poll_with_retry(&self) -> PollResult<Cycle<Vec<UpdateEvent<S::Payload>>>> {
        let policy = &self.config.retry;
        let mut attempt = 0u32;

        loop {
            let offset = self.cursor.offset();
            debug!(?offset, "Polling for updates");

            let err = match self.source.poll(offset).await {
                Ok(batch) => return Ok(Cycle::Batch(batch)),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => err,
            };

            attempt += 1;
            if attempt > policy.max_retries {
                if policy.max_retries == 0 {
                    return Err(err);
                }
                return Err(PollError::RetriesExhausted {
                    attempts: policy.max_retries,
                    last: err.to_string(),
                });
            }

            let delay = policy.backoff(attempt);
            warn!(attempt, ?delay, "Poll failed, will retry: {}", err);

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Cancelled during poll backoff");
                    return Ok(Cycle::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Hand the batch over in order, then advance the cursor past it.
    /// Returns false when the consumer is gone.
    async fn deliver(&mut self, batch: Vec<UpdateEvent<S::Payload>>) -> bool {
        let mut high_water: Option<i64> = None;

        for event in batch {
            let id = event.id;
            let fresh = self.cursor.admits(id) && high_water.map_or(true, |hw| id > hw);
            if !fresh {
                warn!(id, next = self.cursor.next(), "Skipping stale or out-of-order update");
                continue;
            }

            if self.tx.send(event).await.is_err() {
                return false;
            }
            high_water = Some(id);
        }

        if let Some(hw) = high_water {
            self.cursor.advance(hw);
            debug!(next = self.cursor.next(), "Cursor advanced");
        }
        true
    }
}
