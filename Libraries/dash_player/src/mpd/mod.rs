//! DASH manifest data structures (MPD and related types).
//! These represent parsed MPEG-DASH metadata for on-demand presentations.

pub mod parser;

use std::time::Duration;

use tracing::debug;
use url::Url;

pub use parser::parse_mpd;

/// `MPD@type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PresentationType {
    #[default]
    Static,
    Dynamic,
}

/// Inclusive byte range hint, as written in `indexRange="862-1045"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn parse(value: &str) -> Option<Self> {
        let (start, end) = value.trim().split_once('-')?;
        let start = start.trim().parse::<u64>().ok()?;
        let end = end.trim().parse::<u64>().ok()?;
        (start <= end).then_some(Self { start, end })
    }

    pub fn byte_count(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value for an HTTP `Range` header.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// `SegmentBase` byte-range hints. Parsed, not acted upon by the heuristic resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentBase {
    pub index_range: Option<ByteRange>,
    pub initialization_range: Option<ByteRange>,
}

/// A single encoded quality tier within an adaptation set.
#[derive(Debug, Clone, Default)]
pub struct Representation {
    /// Unique identifier for the representation.
    pub id: String,
    pub mime_type: String,
    pub codecs: String,
    /// Average bandwidth in bits per second (bps).
    pub bandwidth: u64,
    pub width: u32,
    pub height: u32,
    /// Raw `frameRate` text, e.g. `30` or `30000/1001`.
    pub frame_rate: String,
    /// `BaseURL` as written in the manifest, possibly relative.
    pub base_url: String,
    pub segment_base: Option<SegmentBase>,
}

impl Representation {
    pub fn frame_rate_hz(&self) -> Option<f64> {
        let raw = self.frame_rate.trim();
        match raw.split_once('/') {
            Some((num, den)) => {
                let num = num.trim().parse::<f64>().ok()?;
                let den = den.trim().parse::<f64>().ok()?;
                (den != 0.0).then(|| num / den)
            }
            None => raw.parse::<f64>().ok(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentComponent {
    pub id: String,
    pub content_type: String,
}

/// An adaptation set groups interchangeable representations of one content component.
#[derive(Debug, Clone, Default)]
pub struct AdaptationSet {
    pub id: String,
    /// Resolved content type; empty means unknown.
    pub content_type: String,
    pub mime_type: String,
    pub base_url: Option<String>,
    pub content_components: Vec<ContentComponent>,
    pub representations: Vec<Representation>,
}

impl AdaptationSet {
    pub fn is_video(&self) -> bool {
        self.content_type == "video"
    }
}

#[derive(Debug, Clone, Default)]
pub struct Period {
    pub id: String,
    pub start: Option<Duration>,
    pub duration: Option<Duration>,
    pub base_url: Option<String>,
    pub adaptation_sets: Vec<AdaptationSet>,
}

/// Top-level metadata parsed from an MPD file.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    /// URL the manifest was fetched from; the root of relative `BaseURL` resolution.
    pub location: String,
    /// `mediaPresentationDuration`.
    pub total_duration: Option<Duration>,
    pub min_buffer_time: Option<Duration>,
    pub presentation_type: PresentationType,
    pub profiles: String,
    pub base_url: Option<String>,
    pub periods: Vec<Period>,
}

impl Manifest {
    /// Builds the ladder from the first video adaptation set that has representations.
    pub fn video_ladder(&self) -> QualityLadder {
        for period in &self.periods {
            for adaptation in &period.adaptation_sets {
                if !adaptation.is_video() || adaptation.representations.is_empty() {
                    continue;
                }
                debug!(
                    "Using adaptation set '{}' of period '{}' with {} representations",
                    adaptation.id,
                    period.id,
                    adaptation.representations.len()
                );
                let base_chain = [&self.base_url, &period.base_url, &adaptation.base_url]
                    .into_iter()
                    .flatten()
                    .cloned()
                    .collect();
                return QualityLadder::new(
                    adaptation.id.clone(),
                    base_chain,
                    adaptation.representations.clone(),
                );
            }
        }
        QualityLadder::default()
    }
}

/// Video representations of one adaptation set, lowest bandwidth first.
#[derive(Debug, Clone, Default)]
pub struct QualityLadder {
    adaptation_set_id: String,
    base_chain: Vec<String>,
    representations: Vec<Representation>,
}

impl QualityLadder {
    pub fn new(
        adaptation_set_id: String,
        base_chain: Vec<String>,
        mut representations: Vec<Representation>,
    ) -> Self {
        // `sort_by_key` is stable, so equal bandwidths keep manifest order.
        representations.sort_by_key(|r| r.bandwidth);
        Self { adaptation_set_id, base_chain, representations }
    }

    pub fn adaptation_set_id(&self) -> &str {
        &self.adaptation_set_id
    }

    pub fn len(&self) -> usize {
        self.representations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Representation> {
        self.representations.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Representation> {
        self.representations.iter()
    }

    pub fn bandwidths(&self) -> Vec<u64> {
        self.representations.iter().map(|r| r.bandwidth).collect()
    }

    /// Absolute location of every rung, in ladder order.
    pub fn resolve_locations(&self, manifest_url: &str) -> Vec<String> {
        self.representations
            .iter()
            .map(|rep| {
                let mut location = manifest_url.to_string();
                for base in self.base_chain.iter().chain(std::iter::once(&rep.base_url)) {
                    location = join_url(&location, base);
                }
                location
            })
            .collect()
    }
}

impl std::ops::Index<usize> for QualityLadder {
    type Output = Representation;

    fn index(&self, index: usize) -> &Representation {
        &self.representations[index]
    }
}

/// Resolves `reference` against `base` the way a browser resolves a relative link.
pub fn join_url(base: &str, reference: &str) -> String {
    let reference = reference.trim();
    if reference.is_empty() {
        return base.to_string();
    }
    if Url::parse(reference).is_ok() {
        return reference.to_string();
    }
    match Url::parse(base).and_then(|b| b.join(reference)) {
        Ok(joined) => joined.to_string(),
        Err(_) => {
            let dir = base.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            format!("{}/{}", dir, reference.trim_start_matches('/'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(id: &str, bandwidth: u64) -> Representation {
        Representation { id: id.to_string(), bandwidth, ..Default::default() }
    }

    #[test]
    fn ladder_sorts_ascending_and_keeps_tie_order() {
        let ladder = QualityLadder::new(
            "v".into(),
            vec![],
            vec![rep("high", 2_400_000), rep("a", 600_000), rep("mid", 1_200_000), rep("b", 600_000)],
        );
        let ids: Vec<_> = ladder.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "mid", "high"]);
    }

    #[test]
    fn relative_locations_resolve_against_manifest_directory() {
        let ladder = QualityLadder::new(
            "v".into(),
            vec![],
            vec![rep("low", 1), Representation { base_url: "v_high.mp4".into(), ..rep("high", 2) }],
        );
        let locations = ladder.resolve_locations("http://media.test/content/manifest.mpd");
        assert_eq!(locations[0], "http://media.test/content/manifest.mpd");
        assert_eq!(locations[1], "http://media.test/content/v_high.mp4");
    }

    #[test]
    fn base_chain_applies_each_level() {
        let ladder = QualityLadder::new(
            "v".into(),
            vec!["cdn/".into(), "video/".into()],
            vec![Representation { base_url: "v.mp4".into(), ..rep("r", 1) }],
        );
        assert_eq!(
            ladder.resolve_locations("http://h/a/manifest.mpd"),
            ["http://h/a/cdn/video/v.mp4"]
        );
    }

    #[test]
    fn absolute_base_url_replaces_manifest_location() {
        assert_eq!(join_url("http://h/a/m.mpd", "https://cdn.test/v.mp4"), "https://cdn.test/v.mp4");
    }

    #[test]
    fn unparseable_manifest_url_falls_back_to_directory_join() {
        assert_eq!(join_url("media/manifest.mpd", "v.mp4"), "media/v.mp4");
    }

    #[test]
    fn byte_ranges() {
        assert_eq!(ByteRange::parse("862-1045"), Some(ByteRange { start: 862, end: 1045 }));
        assert_eq!(ByteRange::parse("0-0").map(|r| r.byte_count()), Some(1));
        assert_eq!(ByteRange::parse("10-2"), None);
        assert_eq!(ByteRange::parse("junk"), None);
        assert_eq!(ByteRange { start: 0, end: 861 }.header_value(), "bytes=0-861");
    }

    #[test]
    fn frame_rates() {
        let mut r = rep("r", 1);
        r.frame_rate = "30000/1001".into();
        assert!((r.frame_rate_hz().unwrap() - 29.97).abs() < 0.01);
        r.frame_rate = "25".into();
        assert_eq!(r.frame_rate_hz(), Some(25.0));
        r.frame_rate = "1/0".into();
        assert_eq!(r.frame_rate_hz(), None);
    }
}
