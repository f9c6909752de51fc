//! Fixed-cadence background task with catch-up.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Work run once per tick.
pub trait Task: Send + 'static {
    type Error: Display + Send;

    fn run(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// The deadline after `previous`, which was the target of the run that
/// just finished.
///
/// Deadlines stay on the grid `previous + n * interval`. When a run
/// overran, whole intervals are skipped so the next deadline is the first
/// grid point after `now`; missed ticks are never run back to back.
pub fn next_deadline(previous: Instant, interval: Duration, now: Instant) -> Instant {
    let next = previous + interval;
    if next > now || interval.is_zero() {
        return next;
    }
    let behind = now.duration_since(next);
    let skip = behind.as_nanos() / interval.as_nanos() + 1;
    let skip = u32::try_from(skip).unwrap_or(u32::MAX);
    next + interval.saturating_mul(skip)
}

/// A [`Task`] running on its own tokio task until stopped.
pub struct PeriodicTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Run `task` now and then every `interval`.
    ///
    /// A failing or panicking run is logged; the next one still happens on
    /// schedule.
    pub fn spawn<T: Task>(mut task: T, interval: Duration) -> Self {
        let (shutdown, mut stopped) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut target = Instant::now();
            loop {
                run_once(&mut task).await;

                let now = Instant::now();
                let next = next_deadline(target, interval, now);
                let missed = next.duration_since(target).as_nanos() / interval.as_nanos().max(1);
                if missed > 1 {
                    warn!(
                        missed_ticks = missed - 1,
                        "refresh overran its interval; skipping ahead"
                    );
                }
                target = next;

                // Shutdown is only observed between runs
                tokio::select! {
                    _ = tokio::time::sleep_until(target) => {}
                    _ = stopped.changed() => break,
                }
            }
            debug!("periodic task stopped");
        });

        Self { shutdown, handle }
    }

    /// Signal shutdown and wait for the current run to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "periodic task did not stop cleanly");
        }
    }
}

async fn run_once<T: Task>(task: &mut T) {
    match AssertUnwindSafe(task.run()).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "refresh cycle failed"),
        Err(panic) => error!(panic = panic_message(&*panic), "refresh cycle panicked"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
