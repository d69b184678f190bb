use std::time::Duration;

use crate::abr::ConditionThresholds;

/// When a session stops downloading. The caller picks exactly one ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Segments(u64),
    Bytes(u64),
    /// Wall-clock time spent in the download loop.
    Duration(Duration),
}

impl Default for Termination {
    fn default() -> Self {
        Termination::Duration(Duration::from_secs(30))
    }
}

/// Settings for one download session.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub manifest_url: String,
    /// Number of recent samples the bandwidth estimate averages over.
    pub history_window: usize,
    pub thresholds: ConditionThresholds,
    /// Re-run quality selection every this many written segments. 0 disables it.
    pub reevaluation_interval: u64,
    /// Abort once this many fetches in a row have failed.
    pub max_consecutive_failures: u32,
    pub termination: Termination,
    /// Time budget for a single fetch.
    pub fetch_timeout: Duration,
    /// Optional wait between two segments.
    pub segment_pacing: Option<Duration>,
    /// Number of the first segment requested.
    pub start_number: u64,
}

impl PlayerConfig {
    pub fn new(manifest_url: &str) -> Self {
        Self {
            manifest_url: manifest_url.to_string(),
            history_window: 3,
            thresholds: ConditionThresholds::default(),
            reevaluation_interval: 3,
            max_consecutive_failures: 3,
            termination: Termination::default(),
            fetch_timeout: Duration::from_secs(10),
            segment_pacing: None,
            start_number: 1,
        }
    }

    pub fn history_window(mut self, samples: usize) -> Self {
        self.history_window = samples;
        self
    }

    pub fn thresholds(mut self, poor_below_bps: f64, moderate_below_bps: f64) -> Self {
        self.thresholds = ConditionThresholds { poor_below_bps, moderate_below_bps };
        self
    }

    pub fn reevaluate_every(mut self, segments: u64) -> Self {
        self.reevaluation_interval = segments;
        self
    }

    pub fn max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures.max(1);
        self
    }

    pub fn terminate_after(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn segment_pacing(mut self, delay: Duration) -> Self {
        self.segment_pacing = (!delay.is_zero()).then_some(delay);
        self
    }

    pub fn start_number(mut self, number: u64) -> Self {
        self.start_number = number.max(1);
        self
    }
}
