// Copyright 2025-Present the newrelic-trace-sink authors
// SPDX-License-Identifier: Apache-2.0

//! The queue and batching window between producers and delivery.
//!
//! Producers push records through a [`BatcherHandle`] onto an unbounded
//! channel; a single [`BatcherService`] task owns the window state and emits a
//! batch whenever the configured interval elapses or the count bound is
//! reached, whichever comes first. Dispatch to the uploader is spawned, so a
//! slow upload never stalls the next window and in-flight uploads may overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error};

use crate::record::TraceRecord;
use crate::uploader::Uploader;

/// Commands accepted by the batching service.
#[derive(Debug)]
pub enum BatcherCommand {
    Record(TraceRecord),
    Flush(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Producer-side handle. `record` is a non-blocking unbounded send, so
/// emitting threads are never coupled to delivery.
#[derive(Clone)]
pub struct BatcherHandle {
    tx: mpsc::UnboundedSender<BatcherCommand>,
}

impl BatcherHandle {
    pub fn record(
        &self,
        record: TraceRecord,
    ) -> Result<(), mpsc::error::SendError<BatcherCommand>> {
        self.tx.send(BatcherCommand::Record(record))
    }

    /// Closes the current window early and dispatches whatever it holds.
    pub async fn flush(&self) -> Result<(), String> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(BatcherCommand::Flush(ack_tx))
            .map_err(|e| format!("failed to send flush command: {e}"))?;
        ack_rx
            .await
            .map_err(|e| format!("failed to receive flush ack: {e}"))
    }

    /// Stops intake and drains every queued record into final count-bounded
    /// batches. Returns once the service has dispatched them; in-flight
    /// uploads are not awaited.
    pub async fn shutdown(&self) -> Result<(), String> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(BatcherCommand::Shutdown(ack_tx))
            .map_err(|e| format!("failed to send shutdown command: {e}"))?;
        ack_rx
            .await
            .map_err(|e| format!("failed to receive shutdown ack: {e}"))
    }
}

/// Single consumer of the record queue; owns all window state.
pub struct BatcherService {
    rx: mpsc::UnboundedReceiver<BatcherCommand>,
    uploader: Arc<dyn Uploader>,
    flush_interval: Duration,
    max_batch_size: usize,
    window: Vec<TraceRecord>,
    deadline: Option<Instant>,
}

impl BatcherService {
    pub fn new(
        uploader: Arc<dyn Uploader>,
        flush_interval: Duration,
        max_batch_size: usize,
    ) -> (Self, BatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = BatcherService {
            rx,
            uploader,
            flush_interval,
            max_batch_size: max_batch_size.max(1),
            window: Vec::new(),
            deadline: None,
        };
        (service, BatcherHandle { tx })
    }

    /// Runs until a shutdown command arrives or every handle is dropped.
    pub async fn run(mut self) {
        debug!("batcher service started");
        loop {
            let command = match self.deadline {
                // A window is open: wake on the next command or its age bound.
                Some(deadline) => tokio::select! {
                    command = self.rx.recv() => command,
                    () = tokio::time::sleep_until(deadline) => {
                        self.close_window();
                        continue;
                    }
                },
                None => self.rx.recv().await,
            };

            match command {
                Some(BatcherCommand::Record(record)) => self.push(record),
                Some(BatcherCommand::Flush(ack)) => {
                    self.close_window();
                    let _ = ack.send(());
                }
                Some(BatcherCommand::Shutdown(ack)) => {
                    self.drain();
                    let _ = ack.send(());
                    break;
                }
                None => {
                    self.drain();
                    break;
                }
            }
        }
        debug!("batcher service stopped");
    }

    fn push(&mut self, record: TraceRecord) {
        if self.window.is_empty() {
            self.deadline = Some(Instant::now() + self.flush_interval);
        }
        self.window.push(record);
        if self.window.len() >= self.max_batch_size {
            self.close_window();
        }
    }

    /// Emits the open window, if any. An empty window produces no batch.
    fn close_window(&mut self) {
        self.deadline = None;
        if self.window.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.window);
        self.dispatch(batch);
    }

    /// Flushes the open window, then folds every record still queued into
    /// final count-bounded batches. New records are no longer accepted.
    fn drain(&mut self) {
        self.rx.close();
        while let Ok(command) = self.rx.try_recv() {
            match command {
                BatcherCommand::Record(record) => self.push(record),
                BatcherCommand::Flush(ack) | BatcherCommand::Shutdown(ack) => {
                    let _ = ack.send(());
                }
            }
        }
        self.close_window();
    }

    fn dispatch(&self, batch: Vec<TraceRecord>) {
        let uploader = Arc::clone(&self.uploader);
        tokio::spawn(async move {
            let count = batch.len();
            match uploader.upload(batch).await {
                Ok(()) => debug!("delivered batch of {count} records"),
                Err(err) => error!("dropping batch of {count} records: {err}"),
            }
        });
    }
}
