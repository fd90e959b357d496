//! Check scheduler: a periodic timer and on-demand requests feeding one
//! worker.
//!
//! ```text
//! interval timer ──┐
//!                  ├──► mpsc queue ──► worker ──► AvailabilityMonitor::check_once
//! /status command ─┘
//! ```
//!
//! The worker runs one check at a time, so two checks never interleave
//! inside this process. A manual request queued while a timer check is in
//! flight runs right after it. The first timer tick fires immediately.
//! A stalled fetch holds the worker for at most the monitor's fetch
//! deadline.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::service::{AvailabilityMonitor, CheckOutcome, CheckTrigger};

/// Capacity of the check queue.
pub const QUEUE_CAPACITY: usize = 16;

/// A queued check.
#[derive(Debug)]
struct CheckRequest {
    trigger: CheckTrigger,
    reply: Option<oneshot::Sender<CheckOutcome>>,
}

/// Error returned when the scheduler is no longer running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("scheduler is shut down")]
pub struct SchedulerClosed;

/// Cloneable handle for queueing on-demand checks.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<CheckRequest>,
}

impl SchedulerHandle {
    /// Queues a manual check and waits for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerClosed`] if the worker has stopped.
    pub async fn request_manual_check(&self) -> Result<CheckOutcome, SchedulerClosed> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CheckRequest {
                trigger: CheckTrigger::Manual,
                reply: Some(reply),
            })
            .await
            .map_err(|_| SchedulerClosed)?;
        rx.await.map_err(|_| SchedulerClosed)
    }
}

/// Running scheduler tasks.
#[derive(Debug)]
pub struct Scheduler {
    handle: SchedulerHandle,
    timer: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl Scheduler {
    /// Spawns the timer and the worker. Both stop when `cancel` fires.
    #[must_use]
    pub fn spawn(monitor: AvailabilityMonitor, interval: Duration, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker = tokio::spawn(run_worker(monitor, rx, cancel.clone()));
        let timer = tokio::spawn(run_timer(tx.clone(), interval, cancel));
        Self {
            handle: SchedulerHandle { tx },
            timer,
            worker,
        }
    }

    /// Returns a handle for on-demand checks.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Waits for both tasks to exit after cancellation.
    pub async fn join(self) {
        drop(self.handle);
        if let Err(e) = self.timer.await {
            tracing::error!(error = %e, "scheduler timer task panicked");
        }
        if let Err(e) = self.worker.await {
            tracing::error!(error = %e, "scheduler worker task panicked");
        }
    }
}

async fn run_timer(tx: mpsc::Sender<CheckRequest>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let request = CheckRequest { trigger: CheckTrigger::Timer, reply: None };
                match tx.try_send(request) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::warn!("check queue full, skipping timer tick");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        }
    }
    tracing::debug!("scheduler timer stopped");
}

async fn run_worker(
    monitor: AvailabilityMonitor,
    mut rx: mpsc::Receiver<CheckRequest>,
    cancel: CancellationToken,
) {
    loop {
        let request = tokio::select! {
            () = cancel.cancelled() => break,
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };
        let outcome = monitor.check_once(request.trigger).await;
        if let Some(reply) = request.reply {
            let _ = reply.send(outcome);
        }
    }
    tracing::debug!("scheduler worker stopped");
}
