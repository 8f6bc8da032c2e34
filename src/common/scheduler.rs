use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The body of a timer-driven loop.
#[async_trait]
pub trait Tick: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn tick(&self) -> anyhow::Result<()>;
}

/// A periodic task with explicit start, stop and on-demand ticks.
///
/// Ticks of the same task never overlap: the timer loop and `tick_now`
/// take the same lock, and a tick that outlives the period delays the next
/// one instead of bunching them up.
pub struct ScheduledTask {
    job: Arc<dyn Tick>,
    period: Duration,
    running: Arc<Mutex<()>>,
    cancel: CancellationToken,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ScheduledTask {
    pub fn new(job: Arc<dyn Tick>, period: Duration) -> Self {
        Self {
            job,
            period,
            running: Arc::new(Mutex::new(())),
            cancel: CancellationToken::new(),
            handle: std::sync::Mutex::new(None),
        }
    }

    /// Spawns the timer loop. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut slot = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_some() {
            return;
        }

        let job = self.job.clone();
        let running = self.running.clone();
        let cancel = self.cancel.clone();
        let period = self.period;

        info!("⏱️ Starting {} (every {:?})", job.name(), period);
        *slot = Some(tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let _guard = running.lock().await;
                        if let Err(e) = job.tick().await {
                            error!("❌ {} tick failed: {:#}", job.name(), e);
                        }
                    }
                }
            }

            info!("⏹️ {} stopped", job.name());
        }));
    }

    /// Runs one tick immediately, waiting for any in-flight tick to finish first.
    #[cfg(test)]
    pub async fn tick_now(&self) -> anyhow::Result<()> {
        let _guard = self.running.lock().await;
        self.job.tick().await
    }

    /// Signals the loop to stop and waits for the current tick to complete.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("{} task ended abnormally: {}", self.job.name(), e);
            }
        }
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .map(|h| h.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        ticks: AtomicUsize,
    }

    #[async_trait]
    impl Tick for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        async fn tick(&self) -> anyhow::Result<()> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn tick_now_runs_without_the_timer() {
        let counter = Arc::new(Counter { ticks: AtomicUsize::new(0) });
        let task = ScheduledTask::new(counter.clone(), Duration::from_secs(3600));

        task.tick_now().await.expect("tick");
        task.tick_now().await.expect("tick");

        assert_eq!(counter.ticks.load(Ordering::SeqCst), 2);
        assert!(!task.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_until_stopped() {
        let counter = Arc::new(Counter { ticks: AtomicUsize::new(0) });
        let task = ScheduledTask::new(counter.clone(), Duration::from_secs(30));

        task.start();
        // The first interval tick completes immediately, then one every 30s.
        time::sleep(Duration::from_secs(65)).await;
        task.stop().await;

        let seen = counter.ticks.load(Ordering::SeqCst);
        assert_eq!(seen, 3);

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(counter.ticks.load(Ordering::SeqCst), seen);
        assert!(!task.is_running());
    }
}
