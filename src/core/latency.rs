//! Per-turn latency instrumentation.
//!
//! A [`LatencyTracker`] records three monotonic timestamps for a single turn:
//!
//! - `t0` when the upstream request starts
//! - `t1` when the first fragment arrives
//! - `t2` when the stream completes (successfully or not)
//!
//! Time-to-first-token is `t1 - t0` and is undefined when no fragment ever
//! arrived. Total duration is `t2 - t0`.

use std::time::{Duration, Instant};

use serde::Serialize;

/// Latency figures attached to a completed turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyMeasurement {
    /// Time from request start to the first fragment, if one arrived
    pub time_to_first_token: Option<Duration>,
    /// Time from request start to stream completion
    pub total_duration: Duration,
}

impl LatencyMeasurement {
    /// TTFT in fractional milliseconds
    pub fn ttft_ms(&self) -> Option<f64> {
        self.time_to_first_token.map(duration_ms)
    }

    /// Total duration in fractional milliseconds
    pub fn total_ms(&self) -> f64 {
        duration_ms(self.total_duration)
    }
}

/// Wire representation used inside `done` events
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatencyMillis {
    pub ttft_ms: Option<f64>,
    pub total_ms: f64,
}

impl From<LatencyMeasurement> for LatencyMillis {
    fn from(m: LatencyMeasurement) -> Self {
        Self {
            ttft_ms: m.ttft_ms(),
            total_ms: m.total_ms(),
        }
    }
}

#[inline]
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Records start, first-token and finish instants for one turn.
#[derive(Debug, Clone, Default)]
pub struct LatencyTracker {
    started_at: Option<Instant>,
    first_token_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker that has already been started.
    pub fn started() -> Self {
        let mut tracker = Self::new();
        tracker.start();
        tracker
    }

    /// Record `t0` and clear any marks from a previous turn.
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
        self.first_token_at = None;
        self.finished_at = None;
    }

    /// Record `t1`. Only the first call within a turn has any effect.
    pub fn mark_first_token(&mut self) {
        if self.first_token_at.is_none() {
            self.first_token_at = Some(Instant::now());
        }
    }

    /// Record `t2`.
    pub fn finish(&mut self) {
        self.finished_at = Some(Instant::now());
    }

    /// Record `t2` and return the measurement.
    ///
    /// A tracker that was never started is treated as started at `t2`, so a
    /// completed turn always has a measurement.
    pub fn complete(&mut self) -> LatencyMeasurement {
        let now = Instant::now();
        let start = *self.started_at.get_or_insert(now);
        self.finished_at = Some(now);
        LatencyMeasurement {
            time_to_first_token: self.ttft(),
            total_duration: now.saturating_duration_since(start),
        }
    }

    pub fn has_first_token(&self) -> bool {
        self.first_token_at.is_some()
    }

    /// `t1 - t0`, or `None` if no fragment arrived.
    pub fn ttft(&self) -> Option<Duration> {
        let start = self.started_at?;
        let first = self.first_token_at?;
        Some(first.saturating_duration_since(start))
    }

    /// `t2 - t0`. Falls back to "now" while the turn is still running.
    pub fn total(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.finished_at.unwrap_or_else(Instant::now);
        Some(end.saturating_duration_since(start))
    }

    /// Snapshot the measurement. Returns `None` if the tracker was never started.
    pub fn measurement(&self) -> Option<LatencyMeasurement> {
        Some(LatencyMeasurement {
            time_to_first_token: self.ttft(),
            total_duration: self.total()?,
        })
    }
}
