use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static NUMBER_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$Number(?:%0(\d+)d)?\$").expect("valid $Number$ pattern"));

/// Longest digit run treated as a segment index in a file name. Longer runs are ids or timestamps.
const MAX_INDEX_DIGITS: usize = 6;

/// Computes the URL of segment `n` of a representation from its base URL.
pub trait SegmentUrlResolver: Send + Sync {
    fn resolve(&self, base_url: &str, segment_number: u64) -> String;
}

/// Heuristic addressing for on-demand content without segment templates.
///
/// Rules, first match wins:
/// 1. `$Number$` (or `$Number%05d$`) is substituted.
/// 2. A `_<n>` run in the file name followed by `_`, `.` or the end of the
///    name (as in `segment_3_.m4s`) has its last such number replaced.
/// 3. Otherwise `.{n}` is appended.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberedSegmentResolver;

impl SegmentUrlResolver for NumberedSegmentResolver {
    fn resolve(&self, base_url: &str, segment_number: u64) -> String {
        if let Some(url) = substitute_number_token(base_url, segment_number) {
            return url;
        }
        if let Some(url) = replace_numbered_name(base_url, segment_number) {
            return url;
        }
        format!("{}.{}", base_url, segment_number)
    }
}

fn substitute_number_token(template: &str, segment_number: u64) -> Option<String> {
    if !NUMBER_TOKEN.is_match(template) {
        return None;
    }
    let replaced = NUMBER_TOKEN.replace_all(template, |caps: &Captures| match caps.get(1) {
        Some(width) => {
            let width = width.as_str().parse::<usize>().unwrap_or(1);
            format!("{:0width$}", segment_number, width = width)
        }
        None => segment_number.to_string(),
    });
    Some(replaced.into_owned())
}

fn replace_numbered_name(url: &str, segment_number: u64) -> Option<String> {
    let path_end = url.find(['?', '#']).unwrap_or(url.len());
    let name_start = url[..path_end].rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &url.as_bytes()[name_start..path_end];

    let mut found = None;
    for (i, &byte) in name.iter().enumerate() {
        if byte != b'_' {
            continue;
        }
        let digits = name[i + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 || digits > MAX_INDEX_DIGITS {
            continue;
        }
        let after = i + 1 + digits;
        if matches!(name.get(after), None | Some(b'_') | Some(b'.')) {
            found = Some((name_start + i + 1, name_start + after));
        }
    }

    let (start, end) = found?;
    Some(format!("{}{}{}", &url[..start], segment_number, &url[end..]))
}
