use std::sync::Mutex;

/// Tick outcome counters kept by the background poller.
pub struct PollMetrics {
    inner: Mutex<Counters>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSnapshot {
    pub fresh: usize,
    pub unavailable: usize,
    pub faulted: usize,
}

impl PollSnapshot {
    pub fn ticks(&self) -> usize {
        self.fresh + self.unavailable + self.faulted
    }
}

#[derive(Default)]
struct Counters {
    fresh: usize,
    unavailable: usize,
    faulted: usize,
}

impl PollMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
        }
    }

    pub fn record_fresh(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.fresh += 1;
        }
    }

    pub fn record_unavailable(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.unavailable += 1;
        }
    }

    /// A tick whose task panicked; it is also reported as unavailable.
    pub fn record_fault(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.faulted += 1;
        }
    }

    pub fn snapshot(&self) -> PollSnapshot {
        if let Ok(counters) = self.inner.lock() {
            PollSnapshot {
                fresh: counters.fresh,
                unavailable: counters.unavailable,
                faulted: counters.faulted,
            }
        } else {
            PollSnapshot::default()
        }
    }
}

impl Default for PollMetrics {
    fn default() -> Self {
        Self::new()
    }
}
