use std::error::Error as _;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::abr::{BandwidthEstimator, RepresentationSelector};
use crate::config::{PlayerConfig, Termination};
use crate::error::SessionError;
use crate::mpd::{parse_mpd, QualityLadder};
use crate::segment::{Fetcher, HttpFetcher, NumberedSegmentResolver, SegmentDownloader, SegmentUrlResolver};
use crate::stats::{TransferReport, TransferStats};
use crate::DashEvent;

pub type EventCallback = Arc<dyn Fn(DashEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Init,
    ManifestLoaded,
    Downloading,
    Complete,
    Aborted,
}

/// What a finished session did. Output written before an abort is kept.
#[derive(Debug)]
pub struct SessionSummary {
    pub state: SessionState,
    pub segments_written: u64,
    pub bytes_written: u64,
    /// Quality index in use when the session ended, if a ladder was built.
    pub final_quality_index: Option<usize>,
    /// Latency and throughput of the successful segment fetches.
    pub transfers: TransferStats,
    pub error: Option<SessionError>,
}

impl SessionSummary {
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            state: self.state,
            segments_written: self.segments_written,
            bytes_written: self.bytes_written,
            final_quality_index: self.final_quality_index,
            transfers: self.transfers.report(),
            error: self.error.as_ref().map(error_chain),
        }
    }
}

/// Serializable form of [`SessionSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub state: SessionState,
    pub segments_written: u64,
    pub bytes_written: u64,
    pub final_quality_index: Option<usize>,
    /// Absent when no segment was fetched.
    pub transfers: Option<TransferReport>,
    pub error: Option<String>,
}

async fn until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn error_chain(err: &SessionError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

struct Session {
    state: SessionState,
    current_quality: Option<usize>,
    segment_number: u64,
    segments_written: u64,
    bytes_written: u64,
    consecutive_failures: u32,
    transfers: TransferStats,
}

impl Session {
    fn new(start_number: u64) -> Self {
        Self {
            state: SessionState::Init,
            current_quality: None,
            segment_number: start_number,
            segments_written: 0,
            bytes_written: 0,
            consecutive_failures: 0,
            transfers: TransferStats::default(),
        }
    }
}

/// Downloads one video stream segment by segment, adapting quality to the measured bandwidth.
pub struct DashPlayer<F = HttpFetcher, R = NumberedSegmentResolver> {
    config: PlayerConfig,
    downloader: SegmentDownloader<F>,
    resolver: R,
    selector: RepresentationSelector,
    callback: Option<EventCallback>,
    cancellation_token: CancellationToken,
}

impl DashPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        let fetcher = HttpFetcher::new(config.fetch_timeout);
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: Fetcher> DashPlayer<F> {
    pub fn with_fetcher(config: PlayerConfig, fetcher: F) -> Self {
        Self {
            config,
            downloader: SegmentDownloader::new(fetcher),
            resolver: NumberedSegmentResolver,
            selector: RepresentationSelector::new(),
            callback: None,
            cancellation_token: CancellationToken::new(),
        }
    }
}

impl<F: Fetcher, R: SegmentUrlResolver> DashPlayer<F, R> {
    /// Swaps the segment addressing strategy.
    pub fn with_resolver<R2: SegmentUrlResolver>(self, resolver: R2) -> DashPlayer<F, R2> {
        DashPlayer {
            config: self.config,
            downloader: self.downloader,
            resolver,
            selector: self.selector,
            callback: self.callback,
            cancellation_token: self.cancellation_token,
        }
    }

    pub fn on_event(mut self, callback: EventCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Token observed by the termination check; cancelling it completes the session.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn stop(&self) {
        self.cancellation_token.cancel();
    }

    /// Runs one session to completion. The sink is shut down exactly once, whatever the outcome.
    #[instrument(skip_all, fields(manifest = %self.config.manifest_url))]
    pub async fn run<W: AsyncWrite + Unpin>(&self, mut sink: W) -> SessionSummary {
        let mut session = Session::new(self.config.start_number);
        let outcome = self.drive(&mut session, &mut sink).await;
        let closed = sink.shutdown().await;

        let error = match (outcome, closed) {
            (Ok(()), Ok(())) => None,
            (Ok(()), Err(e)) => {
                error!("Failed to close output sink: {}", e);
                Some(SessionError::Write(e))
            }
            (Err(err), closed) => {
                if let Err(e) = closed {
                    warn!("Failed to close output sink after abort: {}", e);
                }
                error!("Session aborted: {}", error_chain(&err));
                Some(err)
            }
        };

        let final_state = if error.is_some() { SessionState::Aborted } else { SessionState::Complete };
        self.transition(&mut session, final_state);
        info!(
            "Session finished as {:?}: {} segments, {} bytes",
            session.state, session.segments_written, session.bytes_written
        );

        SessionSummary {
            state: session.state,
            segments_written: session.segments_written,
            bytes_written: session.bytes_written,
            final_quality_index: session.current_quality,
            transfers: session.transfers,
            error,
        }
    }

    async fn drive<W: AsyncWrite + Unpin>(&self, session: &mut Session, sink: &mut W) -> Result<(), SessionError> {
        let manifest_url = &self.config.manifest_url;
        info!("Fetching manifest {}", manifest_url);
        let document = self
            .downloader
            .fetcher()
            .fetch(manifest_url)
            .await
            .map_err(|source| SessionError::ManifestFetch { url: manifest_url.clone(), source })?;
        let manifest = parse_mpd(&document, manifest_url)
            .map_err(|source| SessionError::ManifestParse { url: manifest_url.clone(), source })?;
        self.transition(session, SessionState::ManifestLoaded);

        let ladder = manifest.video_ladder();
        if ladder.is_empty() {
            return Err(SessionError::NoRepresentations { url: manifest_url.clone() });
        }
        let locations = ladder.resolve_locations(&manifest.location);
        info!("Quality ladder (bps): {:?}", ladder.bandwidths());

        let mut estimator = BandwidthEstimator::new(self.config.history_window, self.config.thresholds);
        let mut current = self.selector.select(&ladder, &estimator);
        session.current_quality = Some(current);
        self.transition(session, SessionState::Downloading);

        let started = Instant::now();
        let deadline = match self.config.termination {
            Termination::Duration(max) => Some(started + max),
            _ => None,
        };
        loop {
            if let Some(reason) = self.stop_reason(session, started) {
                info!("Stopping download loop: {}", reason);
                return Ok(());
            }

            let url = self.resolver.resolve(&locations[current], session.segment_number);
            match self.downloader.download(&url).await {
                Ok(download) => {
                    sink.write_all(&download.data).await?;
                    let size = download.data.len();
                    let sample = download.sample();
                    session.segments_written += 1;
                    session.bytes_written += size as u64;
                    session.consecutive_failures = 0;
                    session.transfers.record(size as u64, download.elapsed);
                    estimator.record(sample);
                    debug!(
                        "Segment {} ({} bytes) at quality {} measured {:.0} bps",
                        session.segment_number, size, current, sample.bits_per_second
                    );
                    self.emit(DashEvent::Segment {
                        segment_number: session.segment_number,
                        quality_index: current,
                        representation_id: ladder[current].id.clone(),
                        size,
                        bits_per_second: sample.bits_per_second,
                        url,
                    });
                    session.segment_number += 1;

                    let interval = self.config.reevaluation_interval;
                    if interval > 0 && session.segments_written % interval == 0 {
                        let next = self.selector.select(&ladder, &estimator);
                        if next != current {
                            info!(
                                "Switching to quality {} with bitrate {} ({:?}, estimate {:.0} bps)",
                                ladder[next].id,
                                ladder[next].bandwidth,
                                estimator.condition(),
                                estimator.estimate()
                            );
                            self.switch_quality(&ladder, session, &mut current, next);
                        }
                    }

                    if let Some(delay) = self.config.segment_pacing {
                        tokio::select! {
                            _ = self.cancellation_token.cancelled() => {}
                            _ = until_deadline(deadline) => {}
                            _ = sleep(delay) => {}
                        }
                    }
                }
                Err(err) => {
                    session.consecutive_failures += 1;
                    warn!(
                        "Error downloading segment {} ({} in a row): {}",
                        session.segment_number, session.consecutive_failures, err
                    );
                    self.emit(DashEvent::DownloadError {
                        url: url.clone(),
                        reason: err.to_string(),
                        consecutive_failures: session.consecutive_failures,
                    });

                    let lower = self.selector.downgrade(current);
                    if lower != current {
                        info!("Downgrading to quality {} due to error", ladder[lower].id);
                        self.switch_quality(&ladder, session, &mut current, lower);
                    }

                    if session.consecutive_failures >= self.config.max_consecutive_failures {
                        return Err(SessionError::SegmentDownload {
                            segment_number: session.segment_number,
                            attempts: session.consecutive_failures,
                            source: err,
                        });
                    }
                }
            }
        }
    }

    fn stop_reason(&self, session: &Session, started: Instant) -> Option<&'static str> {
        if self.cancellation_token.is_cancelled() {
            return Some("cancelled");
        }
        match self.config.termination {
            Termination::Segments(max) if session.segments_written >= max => Some("segment ceiling reached"),
            Termination::Bytes(max) if session.bytes_written >= max => Some("byte ceiling reached"),
            Termination::Duration(max) if started.elapsed() >= max => Some("duration ceiling reached"),
            _ => None,
        }
    }

    fn switch_quality(&self, ladder: &QualityLadder, session: &mut Session, current: &mut usize, next: usize) {
        self.emit(DashEvent::QualityChanged {
            from: *current,
            to: next,
            representation_id: ladder[next].id.clone(),
            bandwidth: ladder[next].bandwidth,
        });
        *current = next;
        session.current_quality = Some(next);
    }

    fn transition(&self, session: &mut Session, to: SessionState) {
        let from = session.state;
        if from == to {
            return;
        }
        debug!("Session state {:?} -> {:?}", from, to);
        session.state = to;
        self.emit(DashEvent::StateChanged { from, to });
    }

    fn emit(&self, event: DashEvent) {
        if let Some(callback) = &self.callback {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn report_flattens_error_chain() {
        let summary = SessionSummary {
            state: SessionState::Aborted,
            segments_written: 2,
            bytes_written: 10,
            final_quality_index: Some(0),
            transfers: TransferStats::default(),
            error: Some(SessionError::Write(io::Error::other("disk full"))),
        };
        let report = summary.report();
        assert_eq!(report.error.as_deref(), Some("failed to write to output sink: disk full"));
        assert!(!summary.is_complete());
    }

    #[test]
    fn report_serializes_state_in_snake_case() {
        let summary = SessionSummary {
            state: SessionState::Complete,
            segments_written: 5,
            bytes_written: 500,
            final_quality_index: Some(1),
            transfers: TransferStats::default(),
            error: None,
        };
        let json = serde_json::to_value(summary.report()).unwrap();
        assert_eq!(json["state"], "complete");
        assert_eq!(json["segments_written"], 5);
        assert!(json["error"].is_null());
        assert!(json["transfers"].is_null());
    }
}
