pub mod abr;
pub mod config;
pub mod error;
pub mod mpd;
pub mod segment;
pub mod player;
pub mod stats;

use crate::player::SessionState;

/// Events emitted by the player
#[derive(Debug, Clone)]
pub enum DashEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    Segment {
        segment_number: u64,
        quality_index: usize,
        representation_id: String,
        size: usize,
        bits_per_second: f64,
        url: String,
    },
    QualityChanged {
        from: usize,
        to: usize,
        representation_id: String,
        bandwidth: u64,
    },
    DownloadError {
        url: String,
        reason: String,
        consecutive_failures: u32,
    },
}

pub use config::{PlayerConfig, Termination};
pub use error::{DownloadError, DownloadErrorKind, ManifestParseError, SessionError};
pub use player::{DashPlayer, SessionReport, SessionSummary};
pub use stats::{TransferReport, TransferStats};
