use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

/// Estimate reported while no download has been measured yet.
pub const DEFAULT_ESTIMATE_BPS: f64 = 1_000_000.0;

/// Throughput of one completed download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandwidthSample {
    pub bits_per_second: f64,
    pub elapsed_seconds: f64,
}

impl BandwidthSample {
    /// Records the number of bytes downloaded and the time taken.
    /// A zero elapsed time yields a zero rate.
    pub fn from_transfer(bytes: usize, elapsed: Duration) -> Self {
        let elapsed_seconds = elapsed.as_secs_f64();
        let bits_per_second = if elapsed_seconds > 0.0 {
            (bytes as f64 * 8.0) / elapsed_seconds
        } else {
            0.0
        };
        Self { bits_per_second, elapsed_seconds }
    }
}

/// The most recent `capacity` samples, oldest first.
#[derive(Debug, Clone)]
pub struct BandwidthHistory {
    samples: VecDeque<BandwidthSample>,
    capacity: usize,
}

impl BandwidthHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { samples: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn push(&mut self, sample: BandwidthSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BandwidthSample> {
        self.samples.iter()
    }

    pub fn mean_bps(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(|s| s.bits_per_second).sum();
        Some(total / self.samples.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkCondition {
    Poor,
    Moderate,
    Good,
}

/// Boundaries between the three network conditions, in bits per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConditionThresholds {
    /// Estimates below this are `Poor`.
    pub poor_below_bps: f64,
    /// Estimates below this (and not `Poor`) are `Moderate`.
    pub moderate_below_bps: f64,
}

impl Default for ConditionThresholds {
    fn default() -> Self {
        Self { poor_below_bps: 500_000.0, moderate_below_bps: 2_000_000.0 }
    }
}

impl ConditionThresholds {
    pub fn classify(&self, bps: f64) -> NetworkCondition {
        if bps < self.poor_below_bps {
            NetworkCondition::Poor
        } else if bps < self.moderate_below_bps {
            NetworkCondition::Moderate
        } else {
            NetworkCondition::Good
        }
    }
}

/// Sliding-window mean of recent download rates. One per session.
#[derive(Debug, Clone)]
pub struct BandwidthEstimator {
    history: BandwidthHistory,
    thresholds: ConditionThresholds,
}

impl BandwidthEstimator {
    pub fn new(window: usize, thresholds: ConditionThresholds) -> Self {
        Self { history: BandwidthHistory::new(window), thresholds }
    }

    pub fn record(&mut self, sample: BandwidthSample) {
        self.history.push(sample);
    }

    /// Returns the estimated bandwidth in bits per second.
    /// If no samples are recorded, returns [`DEFAULT_ESTIMATE_BPS`].
    pub fn estimate(&self) -> f64 {
        self.history.mean_bps().unwrap_or(DEFAULT_ESTIMATE_BPS)
    }

    pub fn condition(&self) -> NetworkCondition {
        self.thresholds.classify(self.estimate())
    }

    pub fn history(&self) -> &BandwidthHistory {
        &self.history
    }

    pub fn thresholds(&self) -> ConditionThresholds {
        self.thresholds
    }
}

impl Default for BandwidthEstimator {
    fn default() -> Self {
        Self::new(3, ConditionThresholds::default())
    }
}
