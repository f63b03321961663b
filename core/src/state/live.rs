use crate::location::LocationReading;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Last-write-wins view of the current position.
///
/// A failed tick clears `reading` as well as `available`, so clients never see
/// coordinates next to `available: false`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveState {
    pub reading: Option<LocationReading>,
    pub available: bool,
}

impl LiveState {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn from_tick(reading: Option<LocationReading>) -> Self {
        let available = reading.is_some();
        Self { reading, available }
    }
}

/// Single-slot cache shared by the poller (writer) and request handlers
/// (readers). One mutex guards the whole value; the critical section is a
/// wholesale replace or a clone, never I/O.
#[derive(Debug, Clone, Default)]
pub struct LiveStateCache {
    inner: Arc<Mutex<LiveState>>,
}

impl LiveStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, reading: Option<LocationReading>) {
        let next = LiveState::from_tick(reading);
        *self.lock() = next;
    }

    pub fn read(&self) -> LiveState {
        self.lock().clone()
    }

    // The slot is only ever replaced whole, so a poisoned guard still holds a
    // complete value.
    fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn reading(seq: u32) -> LocationReading {
        let base = f64::from(seq);
        LocationReading {
            latitude: base,
            longitude: base * 2.0,
            accuracy: base * 3.0,
            speed: base * 0.5,
            altitude: base + 100.0,
            bearing: Some(base % 360.0),
            provider: format!("tick-{}", seq),
            captured_at: Local::now(),
        }
    }

    fn assert_consistent(state: &LiveState) {
        match &state.reading {
            None => assert!(!state.available),
            Some(r) => {
                assert!(state.available);
                assert_eq!(r.longitude, r.latitude * 2.0);
                assert_eq!(r.accuracy, r.latitude * 3.0);
                assert_eq!(r.altitude, r.latitude + 100.0);
                assert_eq!(r.provider, format!("tick-{}", r.latitude as u32));
            }
        }
    }

    #[test]
    fn cache_starts_unavailable() {
        let cache = LiveStateCache::new();
        assert_eq!(cache.read(), LiveState::unavailable());
    }

    #[test]
    fn write_then_read_returns_reading_unchanged() {
        let cache = LiveStateCache::new();
        let written = reading(42);
        cache.write(Some(written.clone()));
        let state = cache.read();
        assert!(state.available);
        assert_eq!(state.reading, Some(written));
    }

    #[test]
    fn failed_tick_clears_previous_reading() {
        let cache = LiveStateCache::new();
        cache.write(Some(reading(7)));
        cache.write(None);
        let state = cache.read();
        assert!(!state.available);
        assert!(state.reading.is_none());
    }

    #[test]
    fn clones_share_the_same_slot() {
        let cache = LiveStateCache::new();
        let handle = cache.clone();
        handle.write(Some(reading(3)));
        assert_eq!(cache.read().reading.map(|r| r.latitude), Some(3.0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        /// Readers racing 1000 writes only ever see whole readings.
        #[test]
        fn prop_concurrent_reads_never_tear(
            readers in 2usize..12,
            seed in any::<u64>(),
            failure_every in 3u32..50,
        ) {
            let cache = LiveStateCache::new();
            let done = Arc::new(AtomicBool::new(false));

            let handles: Vec<_> = (0..readers)
                .map(|index| {
                    let cache = cache.clone();
                    let done = done.clone();
                    thread::spawn(move || {
                        let mut rng = StdRng::seed_from_u64(seed ^ index as u64);
                        let mut observed = 0usize;
                        while !done.load(Ordering::Acquire) {
                            assert_consistent(&cache.read());
                            observed += 1;
                            if rng.gen_bool(0.3) {
                                thread::yield_now();
                            }
                        }
                        observed
                    })
                })
                .collect();

            let mut rng = StdRng::seed_from_u64(seed);
            for seq in 1..=1000u32 {
                if seq % failure_every == 0 {
                    cache.write(None);
                } else {
                    cache.write(Some(reading(seq)));
                }
                if rng.gen_bool(0.2) {
                    thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);

            for handle in handles {
                prop_assert!(handle.join().is_ok());
            }
            assert_consistent(&cache.read());
        }
    }
}
