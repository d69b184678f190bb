// File: args.rs
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Parser, ValueEnum};
use dash_player::{PlayerConfig, Termination};
use tracing::level_filters::LevelFilter;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum LogLevel {
    Trace = 0, // Designates very fine-grained informational events, extremely verbose.
    Debug = 1, // Designates fine-grained informational events.
    Info = 2, // Designates informational messages.
    Warn = 3, // Designates hazardous situations.
    Error = 4, // Designates very serious errors.
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = "Downloads a DASH video stream, adapting quality to the measured bandwidth.")]
#[command(group(ArgGroup::new("ceiling").args(["segments", "bytes", "duration"])))]
pub struct Args {
    #[arg(short, long, default_value = "http://10.0.0.2:8080/manifest.mpd")]
    pub manifest_url: String,
    #[arg(short, long, default_value = "dash_output.mp4")]
    pub output: PathBuf,
    /// Stop after this many segments
    #[arg(long)]
    pub segments: Option<u64>,
    /// Stop after this many bytes
    #[arg(long)]
    pub bytes: Option<u64>,
    /// Stop after this many seconds of downloading (default when no ceiling is given)
    #[arg(short, long, value_parser = parse_seconds)]
    pub duration: Option<Duration>,
    #[arg(long, default_value = "3")]
    pub history_window: usize,
    #[arg(long, default_value = "500000")]
    pub poor_below_bps: f64,
    #[arg(long, default_value = "2000000")]
    pub moderate_below_bps: f64,
    /// Re-select quality every N segments, 0 to disable
    #[arg(long, default_value = "3")]
    pub reevaluate_every: u64,
    #[arg(long, default_value = "3")]
    pub max_failures: u32,
    #[arg(long, default_value = "10", value_parser = parse_seconds)]
    pub timeout_secs: Duration,
    #[arg(long, default_value = "0")]
    pub pacing_ms: u64,
    #[arg(long, default_value = "1")]
    pub start_number: u64,
    /// Print the session report as JSON on stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

pub fn parse_args() -> Args {
    Args::parse()
}

impl Args {
    pub fn termination(&self) -> Termination {
        match (self.segments, self.bytes, self.duration) {
            (Some(segments), _, _) => Termination::Segments(segments),
            (_, Some(bytes), _) => Termination::Bytes(bytes),
            (_, _, Some(duration)) => Termination::Duration(duration),
            _ => Termination::default(),
        }
    }

    pub fn player_config(&self) -> PlayerConfig {
        PlayerConfig::new(&self.manifest_url)
            .history_window(self.history_window)
            .thresholds(self.poor_below_bps, self.moderate_below_bps)
            .reevaluate_every(self.reevaluate_every)
            .max_consecutive_failures(self.max_failures)
            .terminate_after(self.termination())
            .fetch_timeout(self.timeout_secs)
            .segment_pacing(Duration::from_millis(self.pacing_ms))
            .start_number(self.start_number)
    }
}

/// Parses a positive, finite number of seconds such as `2.5`.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.parse().map_err(|_| format!("'{}' is not a number of seconds", value))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("'{}' must be a positive number of seconds", value));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

pub fn get_log_level_filter(args: &Args) -> LevelFilter {
    // Map the LogLevel enum to the LevelFilter enum
    match args.log_level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_thirty_second_session() {
        let args = Args::parse_from(["dash-client"]);
        assert_eq!(args.termination(), Termination::Duration(Duration::from_secs(30)));
        let config = args.player_config();
        assert_eq!(config.manifest_url, "http://10.0.0.2:8080/manifest.mpd");
        assert_eq!(config.reevaluation_interval, 3);
        assert!(config.segment_pacing.is_none());
    }

    #[test]
    fn picks_requested_ceiling() {
        let args = Args::parse_from(["dash-client", "--segments", "5"]);
        assert_eq!(args.termination(), Termination::Segments(5));
        let args = Args::parse_from(["dash-client", "--bytes", "2048"]);
        assert_eq!(args.termination(), Termination::Bytes(2048));
    }

    #[test]
    fn ceilings_are_mutually_exclusive() {
        assert!(Args::try_parse_from(["dash-client", "--segments", "5", "--bytes", "10"]).is_err());
    }

    #[test]
    fn parses_fractional_seconds() {
        let args = Args::parse_from(["dash-client", "--duration", "1.5", "--timeout-secs", "0.25"]);
        assert_eq!(args.termination(), Termination::Duration(Duration::from_millis(1500)));
        assert_eq!(args.player_config().fetch_timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_non_positive_or_invalid_seconds() {
        for value in ["-1", "0", "NaN", "inf", "soon"] {
            assert!(Args::try_parse_from(["dash-client", "--timeout-secs", value]).is_err(), "{}", value);
            assert!(Args::try_parse_from(["dash-client", "--duration", value]).is_err(), "{}", value);
        }
    }

    #[test]
    fn maps_tuning_flags() {
        let args = Args::parse_from([
            "dash-client",
            "--history-window",
            "5",
            "--poor-below-bps",
            "250000",
            "--max-failures",
            "4",
            "--pacing-ms",
            "200",
        ]);
        let config = args.player_config();
        assert_eq!(config.history_window, 5);
        assert_eq!(config.thresholds.poor_below_bps, 250_000.0);
        assert_eq!(config.max_consecutive_failures, 4);
        assert_eq!(config.segment_pacing, Some(Duration::from_millis(200)));
    }
}
