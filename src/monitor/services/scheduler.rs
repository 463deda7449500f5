//! Periodic monitor sweeps publishing the latest report.

use super::{DispatchCanceller, MonitorDispatcher};
use crate::connection::ports::AgentRegistry;
use crate::monitor::domain::MonitorReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

/// Runs the dispatcher against a registry on a fixed interval.
pub struct MonitorScheduler<R>
where
    R: AgentRegistry + 'static,
{
    dispatcher: Arc<MonitorDispatcher>,
    registry: Arc<R>,
    period: Duration,
}

impl<R> MonitorScheduler<R>
where
    R: AgentRegistry + 'static,
{
    /// Creates a scheduler sweeping every `period`.
    #[must_use]
    pub const fn new(dispatcher: Arc<MonitorDispatcher>, registry: Arc<R>, period: Duration) -> Self {
        Self {
            dispatcher,
            registry,
            period,
        }
    }

    /// Starts sweeping in a background task. The first sweep runs at once.
    ///
    /// A zero period is raised to one millisecond.
    #[must_use]
    pub fn start(self) -> MonitorSchedulerHandle {
        let (reports_tx, reports_rx) = watch::channel(None);
        let canceller = DispatchCanceller::new();
        let stop = canceller.token();

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match self
                    .dispatcher
                    .run_all_with_cancel(self.registry.as_ref(), &stop)
                    .await
                {
                    Ok(report) if report.is_cancelled() => break,
                    Ok(report) => {
                        info!(
                            cells = report.len(),
                            failures = report.failures().len(),
                            ignored = report.ignored().len(),
                            "monitor sweep complete"
                        );
                        reports_tx.send_replace(Some(Arc::new(report)));
                    }
                    Err(err) => warn!(error = %err, "monitor sweep could not start"),
                }
            }
            info!("monitor scheduler stopped");
        });

        MonitorSchedulerHandle {
            reports: reports_rx,
            canceller,
            task,
        }
    }
}

/// Control handle of a running [`MonitorScheduler`].
#[derive(Debug)]
pub struct MonitorSchedulerHandle {
    reports: watch::Receiver<Option<Arc<MonitorReport>>>,
    canceller: DispatchCanceller,
    task: JoinHandle<()>,
}

impl MonitorSchedulerHandle {
    /// Returns the most recent complete report.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<MonitorReport>> {
        self.reports.borrow().clone()
    }

    /// Waits for the next report.
    ///
    /// Returns `None` once the scheduler has stopped.
    pub async fn next_report(&mut self) -> Option<Arc<MonitorReport>> {
        self.reports.changed().await.ok()?;
        self.reports.borrow_and_update().clone()
    }

    /// Returns a receiver observing published reports.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<MonitorReport>>> {
        self.reports.clone()
    }

    /// Stops sweeping, cancelling any in-flight sweep, and waits for the
    /// task to finish.
    ///
    /// # Errors
    ///
    /// Returns the [`JoinError`] when the scheduler task panicked.
    pub async fn stop(self) -> Result<(), JoinError> {
        self.canceller.cancel();
        self.task.await
    }
}
