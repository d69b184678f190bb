use std::time::Duration;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::ManifestParseError;
use crate::mpd::{
    AdaptationSet, ByteRange, ContentComponent, Manifest, Period, PresentationType, Representation,
    SegmentBase,
};

/// Which element a `BaseURL` text node belongs to.
#[derive(Clone, Copy)]
enum BaseUrlOwner {
    Mpd,
    Period,
    AdaptationSet,
    Representation,
}

#[derive(Default)]
struct ParseState {
    manifest: Manifest,
    seen_root: bool,
    depth: usize,
    period: Option<Period>,
    adaptation: Option<AdaptationSet>,
    representation: Option<Representation>,
    base_url: Option<(BaseUrlOwner, String)>,
    in_segment_base: bool,
}

/// Parses an MPD document. `manifest_url` is recorded as the manifest location;
/// relative `BaseURL`s are kept verbatim and resolved later.
pub fn parse_mpd(document: &[u8], manifest_url: &str) -> Result<Manifest, ManifestParseError> {
    let mut reader = Reader::from_reader(document);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = true;

    let mut state = ParseState::default();
    state.manifest.location = manifest_url.to_string();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                state.enter(e)?;
                state.depth += 1;
                state.open(e)?;
            }
            Event::Empty(ref e) => {
                state.enter(e)?;
                state.open(e)?;
                state.close(e.local_name().as_ref());
            }
            Event::End(ref e) => {
                state.depth = state.depth.saturating_sub(1);
                state.close(e.local_name().as_ref());
            }
            Event::Text(ref t) => {
                if state.depth == 0 {
                    if !is_blank(t) {
                        return Err(ManifestParseError::OutsideRoot);
                    }
                } else if let Some((_, text)) = state.base_url.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref c) => {
                if state.depth == 0 {
                    return Err(ManifestParseError::OutsideRoot);
                }
                if let Some((_, text)) = state.base_url.as_mut() {
                    text.push_str(&String::from_utf8_lossy(c));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if state.depth > 0 {
        return Err(ManifestParseError::Unclosed(state.depth));
    }
    if !state.seen_root {
        return Err(ManifestParseError::MissingRoot);
    }
    Ok(state.manifest)
}

/// Whitespace, optionally behind a UTF-8 byte order mark.
fn is_blank(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    bytes.iter().all(u8::is_ascii_whitespace)
}

impl ParseState {
    /// The document holds exactly one top-level element, and it is `MPD`.
    fn enter(&self, e: &BytesStart) -> Result<(), ManifestParseError> {
        let is_mpd = e.local_name().as_ref() == b"MPD";
        if self.depth > 0 {
            return if is_mpd { Err(ManifestParseError::NestedRoot) } else { Ok(()) };
        }
        if self.seen_root {
            return Err(ManifestParseError::OutsideRoot);
        }
        if !is_mpd {
            let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
            return Err(ManifestParseError::UnexpectedRoot(name));
        }
        Ok(())
    }

    fn open(&mut self, e: &BytesStart) -> Result<(), ManifestParseError> {
        match e.local_name().as_ref() {
            b"MPD" => {
                self.seen_root = true;
                for (key, value) in attributes(e)? {
                    match key.as_str() {
                        "mediaPresentationDuration" => self.manifest.total_duration = parse_duration(&value),
                        "minBufferTime" => self.manifest.min_buffer_time = parse_duration(&value),
                        "type" => {
                            self.manifest.presentation_type = if value == "dynamic" {
                                PresentationType::Dynamic
                            } else {
                                PresentationType::Static
                            }
                        }
                        "profiles" => self.manifest.profiles = value,
                        _ => {}
                    }
                }
            }
            b"Period" => {
                let mut period = Period::default();
                for (key, value) in attributes(e)? {
                    match key.as_str() {
                        "id" => period.id = value,
                        "start" => period.start = parse_duration(&value),
                        "duration" => period.duration = parse_duration(&value),
                        _ => {}
                    }
                }
                self.period = Some(period);
            }
            b"AdaptationSet" => {
                let mut adaptation = AdaptationSet::default();
                for (key, value) in attributes(e)? {
                    match key.as_str() {
                        "id" => adaptation.id = value,
                        "contentType" => adaptation.content_type = value,
                        "mimeType" => adaptation.mime_type = value,
                        _ => {}
                    }
                }
                self.adaptation = Some(adaptation);
            }
            b"ContentComponent" => {
                let mut component = ContentComponent::default();
                for (key, value) in attributes(e)? {
                    match key.as_str() {
                        "id" => component.id = value,
                        "contentType" => component.content_type = value,
                        _ => {}
                    }
                }
                if let Some(adaptation) = self.adaptation.as_mut() {
                    adaptation.content_components.push(component);
                }
            }
            b"Representation" => {
                let mut rep = Representation::default();
                for (key, value) in attributes(e)? {
                    match key.as_str() {
                        "id" => rep.id = value,
                        "mimeType" => rep.mime_type = value,
                        "codecs" => rep.codecs = value,
                        "bandwidth" => rep.bandwidth = parse_number(&key, &value),
                        "width" => rep.width = parse_number(&key, &value),
                        "height" => rep.height = parse_number(&key, &value),
                        "frameRate" => rep.frame_rate = value,
                        _ => {}
                    }
                }
                // Representations inherit the adaptation set's mimeType when they omit one.
                if rep.mime_type.is_empty() {
                    if let Some(adaptation) = self.adaptation.as_ref() {
                        rep.mime_type = adaptation.mime_type.clone();
                    }
                }
                self.representation = Some(rep);
            }
            b"BaseURL" => {
                let owner = if self.representation.is_some() {
                    BaseUrlOwner::Representation
                } else if self.adaptation.is_some() {
                    BaseUrlOwner::AdaptationSet
                } else if self.period.is_some() {
                    BaseUrlOwner::Period
                } else {
                    BaseUrlOwner::Mpd
                };
                self.base_url = Some((owner, String::new()));
            }
            b"SegmentBase" => {
                self.in_segment_base = true;
                let index_range = attributes(e)?
                    .into_iter()
                    .find(|(key, _)| key == "indexRange")
                    .and_then(|(_, value)| ByteRange::parse(&value));
                if let Some(rep) = self.representation.as_mut() {
                    rep.segment_base.get_or_insert_with(SegmentBase::default).index_range = index_range;
                }
            }
            b"Initialization" if self.in_segment_base => {
                let range = attributes(e)?
                    .into_iter()
                    .find(|(key, _)| key == "range")
                    .and_then(|(_, value)| ByteRange::parse(&value));
                if let Some(rep) = self.representation.as_mut() {
                    rep.segment_base
                        .get_or_insert_with(SegmentBase::default)
                        .initialization_range = range;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"BaseURL" => {
                if let Some((owner, text)) = self.base_url.take() {
                    let text = text.trim().to_string();
                    match owner {
                        BaseUrlOwner::Mpd => self.manifest.base_url = Some(text),
                        BaseUrlOwner::Period => {
                            if let Some(period) = self.period.as_mut() {
                                period.base_url = Some(text);
                            }
                        }
                        BaseUrlOwner::AdaptationSet => {
                            if let Some(adaptation) = self.adaptation.as_mut() {
                                adaptation.base_url = Some(text);
                            }
                        }
                        BaseUrlOwner::Representation => {
                            if let Some(rep) = self.representation.as_mut() {
                                rep.base_url = text;
                            }
                        }
                    }
                }
            }
            b"SegmentBase" => self.in_segment_base = false,
            b"Representation" => {
                if let Some(rep) = self.representation.take() {
                    if let Some(adaptation) = self.adaptation.as_mut() {
                        adaptation.representations.push(rep);
                    } else {
                        debug!("Ignoring representation '{}' outside an adaptation set", rep.id);
                    }
                }
            }
            b"AdaptationSet" => {
                if let Some(mut adaptation) = self.adaptation.take() {
                    if adaptation.content_type.is_empty() {
                        if let Some(first) = adaptation.content_components.first() {
                            adaptation.content_type = first.content_type.clone();
                        }
                    }
                    if let Some(period) = self.period.as_mut() {
                        period.adaptation_sets.push(adaptation);
                    } else {
                        debug!("Ignoring adaptation set '{}' outside a period", adaptation.id);
                    }
                }
            }
            b"Period" => {
                if let Some(period) = self.period.take() {
                    self.manifest.periods.push(period);
                }
            }
            _ => {}
        }
    }
}

fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>, ManifestParseError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

fn parse_number<T: std::str::FromStr + Default>(key: &str, value: &str) -> T {
    value.trim().parse::<T>().unwrap_or_else(|_| {
        debug!("Unparseable {} value '{}', defaulting to 0", key, value);
        T::default()
    })
}

/// Parses an ISO-8601 duration such as `PT1M30.5S`.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let iso = iso8601_duration::Duration::parse(value.trim()).ok()?;
    iso.to_std()
}
