//! Background GPS poller.
//!
//! One long-lived task per process. Each tick asks the location source for a
//! fix and overwrites the live state with the result. Ticks never end the
//! loop: failures, including panics inside the source, are logged and
//! recorded as an unavailable tick.

use crate::location::LocationReading;
use crate::prelude::LocationSource;
use crate::state::live::LiveStateCache;
use crate::telemetry::{PollMetrics, PollSnapshot};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct GpsPoller<S> {
    source: Arc<S>,
    cache: LiveStateCache,
    interval: Duration,
    metrics: Arc<PollMetrics>,
}

impl<S: LocationSource> GpsPoller<S> {
    pub fn new(source: S, cache: LiveStateCache) -> Self {
        Self {
            source: Arc::new(source),
            cache,
            interval: DEFAULT_POLL_INTERVAL,
            metrics: Arc::new(PollMetrics::new()),
        }
    }

    /// Pause between the end of one tick and the start of the next.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs one acquisition and publishes it. Returns whether a fix was found.
    pub async fn tick(&self) -> bool {
        let source = Arc::clone(&self.source);
        let reading: Option<LocationReading> =
            match tokio::spawn(async move { source.acquire().await }).await {
                Ok(Some(reading)) => {
                    self.metrics.record_fresh();
                    Some(reading)
                }
                Ok(None) => {
                    self.metrics.record_unavailable();
                    None
                }
                Err(err) => {
                    error!("GPS tick failed: {}", err);
                    self.metrics.record_fault();
                    None
                }
            };
        let available = reading.is_some();
        self.cache.write(reading);
        available
    }

    /// Spawns the loop onto the current tokio runtime.
    ///
    /// Dropping the returned handle detaches the loop; it then runs until the
    /// process exits.
    pub fn start(self) -> PollerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let metrics = Arc::clone(&self.metrics);
        let task = tokio::spawn(self.run(stop_rx));
        PollerHandle {
            stop: stop_tx,
            task,
            metrics,
        }
    }

    async fn run(self, mut stop: watch::Receiver<bool>) {
        info!("GPS poller started (interval: {:?})", self.interval);
        let mut was_available = false;
        let mut detached = false;

        loop {
            let available = self.tick().await;
            if available && !was_available {
                info!("GPS fix acquired");
            } else if !available && was_available {
                warn!("GPS fix lost");
            }
            was_available = available;

            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = stop.changed(), if !detached => match changed {
                    Ok(()) if *stop.borrow() => break,
                    Ok(()) => {}
                    Err(_) => detached = true,
                },
            }
        }

        info!("GPS poller stopped");
    }
}

/// Handle to a running poller.
pub struct PollerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    metrics: Arc<PollMetrics>,
}

impl PollerHandle {
    pub fn metrics(&self) -> PollSnapshot {
        self.metrics.snapshot()
    }

    /// Signals the loop to stop after the current tick and waits for it.
    pub async fn shutdown(self) -> PollSnapshot {
        // A send error means the loop already exited.
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await {
            error!("GPS poller task ended abnormally: {}", err);
        }
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::timeout;

    fn fix(latitude: f64) -> LocationReading {
        LocationReading {
            latitude,
            longitude: 19.0,
            accuracy: 5.0,
            speed: 0.0,
            altitude: 100.0,
            bearing: None,
            provider: "gps".into(),
            captured_at: Local::now(),
        }
    }

    struct ScriptedSource {
        script: Mutex<VecDeque<Option<LocationReading>>>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<LocationReading>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    impl LocationSource for ScriptedSource {
        async fn acquire(&self) -> Option<LocationReading> {
            self.script.lock().unwrap().pop_front().flatten()
        }
    }

    struct FlakySource {
        calls: AtomicUsize,
    }

    impl LocationSource for FlakySource {
        async fn acquire(&self) -> Option<LocationReading> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call % 2 == 0 {
                panic!("provider blew up on call {}", call);
            }
            Some(fix(47.0))
        }
    }

    async fn wait_for_ticks(handle: &PollerHandle, ticks: usize) {
        timeout(Duration::from_secs(5), async {
            while handle.metrics().ticks() < ticks {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("poller did not reach the expected tick count");
    }

    #[tokio::test]
    async fn tick_publishes_fix_then_clears_on_failure() {
        let cache = LiveStateCache::new();
        let poller = GpsPoller::new(
            ScriptedSource::new(vec![Some(fix(47.5)), None]),
            cache.clone(),
        );

        assert!(poller.tick().await);
        let state = cache.read();
        assert!(state.available);
        assert_eq!(state.reading.unwrap().latitude, 47.5);

        assert!(!poller.tick().await);
        let state = cache.read();
        assert!(!state.available);
        assert!(state.reading.is_none());
    }

    #[tokio::test]
    async fn panicking_tick_is_absorbed_and_loop_continues() {
        let cache = LiveStateCache::new();
        let handle = GpsPoller::new(
            FlakySource {
                calls: AtomicUsize::new(0),
            },
            cache.clone(),
        )
        .with_interval(Duration::from_millis(5))
        .start();

        wait_for_ticks(&handle, 4).await;
        let snapshot = handle.shutdown().await;
        assert!(snapshot.faulted >= 2);
        assert!(snapshot.fresh >= 2);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let cache = LiveStateCache::new();
        let handle = GpsPoller::new(
            ScriptedSource::new(vec![Some(fix(10.0))]),
            cache.clone(),
        )
        .with_interval(Duration::from_millis(5))
        .start();

        wait_for_ticks(&handle, 3).await;
        let stopped = handle.shutdown().await;
        assert_eq!(stopped.fresh, 1);
        assert!(stopped.unavailable >= 2);
        assert!(!cache.read().available);
    }

    #[tokio::test]
    async fn detached_poller_keeps_running() {
        let cache = LiveStateCache::new();
        let poller = GpsPoller::new(
            ScriptedSource::new(vec![None, None, Some(fix(33.0))]),
            cache.clone(),
        )
        .with_interval(Duration::from_millis(5));
        let metrics = Arc::clone(&poller.metrics);
        drop(poller.start());

        timeout(Duration::from_secs(5), async {
            while metrics.snapshot().ticks() < 5 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("detached poller stalled");
        assert_eq!(metrics.snapshot().fresh, 1);
    }
}
