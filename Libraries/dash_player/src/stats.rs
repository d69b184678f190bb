use std::time::Duration;

use serde::Serialize;

/// Latency and throughput over the successful segment fetches of a session.
#[derive(Debug, Clone, Default)]
pub struct TransferStats {
    fetches: u64,
    bytes: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
    // Running mean and sum of squared deviations, in seconds.
    mean_secs: f64,
    m2: f64,
}

/// Serializable summary of [`TransferStats`]. Latencies are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReport {
    pub fetches: u64,
    pub mean_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    /// Sample standard deviation of the fetch latencies, 0 with a single fetch.
    pub jitter_ms: f64,
    /// Bytes received over the time spent fetching them.
    pub throughput_bps: f64,
}

impl TransferStats {
    pub fn record(&mut self, bytes: u64, elapsed: Duration) {
        self.fetches += 1;
        self.bytes += bytes;
        self.total = self.total.saturating_add(elapsed);
        self.min = Some(self.min.map_or(elapsed, |min| min.min(elapsed)));
        self.max = self.max.max(elapsed);

        let secs = elapsed.as_secs_f64();
        let delta = secs - self.mean_secs;
        self.mean_secs += delta / self.fetches as f64;
        self.m2 += delta * (secs - self.mean_secs);
    }

    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    pub fn report(&self) -> Option<TransferReport> {
        if self.fetches == 0 {
            return None;
        }
        let jitter = if self.fetches > 1 { (self.m2 / (self.fetches - 1) as f64).sqrt() } else { 0.0 };
        let total = self.total.as_secs_f64();
        Some(TransferReport {
            fetches: self.fetches,
            mean_latency_ms: self.mean_secs * 1000.0,
            min_latency_ms: self.min.unwrap_or_default().as_secs_f64() * 1000.0,
            max_latency_ms: self.max.as_secs_f64() * 1000.0,
            jitter_ms: jitter * 1000.0,
            throughput_bps: if total > 0.0 { (self.bytes * 8) as f64 / total } else { 0.0 },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_no_report() {
        assert_eq!(TransferStats::default().report(), None);
    }

    #[test]
    fn summarizes_latencies_and_throughput() {
        let mut stats = TransferStats::default();
        stats.record(1000, Duration::from_secs(1));
        stats.record(2000, Duration::from_secs(2));
        stats.record(3000, Duration::from_secs(3));

        let report = stats.report().unwrap();
        assert_eq!(report.fetches, 3);
        assert!((report.mean_latency_ms - 2000.0).abs() < 1e-6);
        assert!((report.min_latency_ms - 1000.0).abs() < 1e-6);
        assert!((report.max_latency_ms - 3000.0).abs() < 1e-6);
        assert!((report.jitter_ms - 1000.0).abs() < 1e-6);
        // 48000 bits over 6 seconds.
        assert!((report.throughput_bps - 8000.0).abs() < 1e-6);
    }

    #[test]
    fn single_fetch_has_no_jitter() {
        let mut stats = TransferStats::default();
        stats.record(500, Duration::from_millis(250));
        let report = stats.report().unwrap();
        assert_eq!(report.jitter_ms, 0.0);
        assert!((report.throughput_bps - 16000.0).abs() < 1e-6);
    }

    #[test]
    fn instant_fetches_report_zero_throughput() {
        let mut stats = TransferStats::default();
        stats.record(500, Duration::ZERO);
        assert_eq!(stats.report().unwrap().throughput_bps, 0.0);
    }
}
