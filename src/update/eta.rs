//! Remaining-time prediction for update runs.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Estimates are withheld until the run has been going this long.
pub const WARMUP: Duration = Duration::from_secs(30);

pub const DEFAULT_WINDOW: usize = 1000;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Sliding window over the last `window` completion instants.
pub struct EtaPredictor {
    window: usize,
    instants: VecDeque<Instant>,
    clock: Arc<dyn Clock>,
}

impl EtaPredictor {
    pub fn new(window: usize) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: usize, clock: Arc<dyn Clock>) -> Self {
        let window = window.max(1);
        EtaPredictor {
            window,
            instants: VecDeque::with_capacity(window),
            clock,
        }
    }

    /// Record one completed unit of work.
    pub fn trigger(&mut self) {
        if self.instants.len() == self.window {
            self.instants.pop_front();
        }
        self.instants.push_back(self.clock.now());
    }

    /// Time the last `window` completions took, once the window is full.
    pub fn get(&self) -> Option<Duration> {
        if self.instants.len() < self.window {
            return None;
        }
        let oldest = self.instants.front()?;
        Some(self.clock.now().saturating_duration_since(*oldest))
    }

    /// Remaining time for `remaining` units.
    ///
    /// Takes the larger of the recent-window rate and the whole-run rate.
    /// Returns `None` while discovery is still running or before [`WARMUP`].
    pub fn estimate(
        &self,
        started: Instant,
        processed: u64,
        remaining: u64,
        scan_finished: bool,
    ) -> Option<Duration> {
        let elapsed = self.clock.now().saturating_duration_since(started);
        if !scan_finished || elapsed < WARMUP {
            return None;
        }

        let overall = elapsed.mul_f64(remaining as f64 / processed.max(1) as f64);
        let recent = self
            .get()
            .map(|span| span.mul_f64(remaining as f64 / self.window as f64))
            .unwrap_or_default();
        Some(overall.max(recent))
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}
