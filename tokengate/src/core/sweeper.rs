//! Background eviction of idle buckets
//!
//! The sweep is a tokio task ticking at a fixed period. It holds only a weak
//! reference to the store and exits once the store is gone.

use super::{AdmissionError, BucketStore};
use parking_lot::Mutex;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Stopped/running state of the cleanup task
pub(crate) struct Sweeper {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    pub(crate) fn new() -> Self {
        Sweeper {
            task: Mutex::new(None),
        }
    }

    /// Spawn the sweep task unless one is already running
    pub(crate) fn start(
        &self,
        store: Weak<BucketStore>,
        idle_timeout: Duration,
        period: Duration,
    ) -> Result<bool, AdmissionError> {
        if period.is_zero() {
            return Err(AdmissionError::InvalidConfig(
                "cleanup period must be greater than zero".into(),
            ));
        }

        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(false);
        }

        let runtime = Handle::try_current().map_err(|_| AdmissionError::NoRuntime)?;
        *task = Some(runtime.spawn(run_sweep(store, idle_timeout, period)));

        tracing::info!(
            period_ms = period.as_millis() as u64,
            idle_timeout_secs = idle_timeout.as_secs(),
            "Cleanup sweep started"
        );
        Ok(true)
    }

    pub(crate) fn stop(&self) -> bool {
        match self.task.lock().take() {
            Some(handle) => {
                handle.abort();
                tracing::info!("Cleanup sweep stopped");
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

async fn run_sweep(store: Weak<BucketStore>, idle_timeout: Duration, period: Duration) {
    let start = tokio::time::Instant::now() + period;
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(live) = store.upgrade() else {
            break;
        };
        let removed = live.sweep(tokio::time::Instant::now().into_std(), idle_timeout);
        tracing::debug!(removed, remaining = live.len(), "Cleanup sweep pass");
    }

    tracing::debug!("Cleanup sweep exiting, store dropped");
}
