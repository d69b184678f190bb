use std::time::Duration;

use thiserror::Error;

/// Which way a single fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadErrorKind {
    Network,
    HttpStatus,
    Timeout,
}

/// Failure of one GET, either for the manifest or for a media segment.
#[derive(Debug, Clone, Error)]
pub enum DownloadError {
    #[error("network error while fetching {url}: {reason}")]
    Network { url: String, reason: String },
    #[error("HTTP {status} for URL: {url}")]
    HttpStatus { url: String, status: u16 },
    #[error("fetch of {url} exceeded {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

impl DownloadError {
    pub fn network<S: Into<String>>(url: &str, reason: S) -> Self {
        Self::Network { url: url.to_string(), reason: reason.into() }
    }

    pub fn http_status(url: &str, status: u16) -> Self {
        Self::HttpStatus { url: url.to_string(), status }
    }

    pub fn timeout(url: &str, timeout: Duration) -> Self {
        Self::Timeout { url: url.to_string(), timeout }
    }

    /// Maps a reqwest error, keeping timeouts apart from other transport failures.
    pub fn from_reqwest(url: &str, error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::timeout(url, timeout)
        } else if let Some(status) = error.status() {
            Self::http_status(url, status.as_u16())
        } else {
            Self::network(url, error.to_string())
        }
    }

    pub fn kind(&self) -> DownloadErrorKind {
        match self {
            DownloadError::Network { .. } => DownloadErrorKind::Network,
            DownloadError::HttpStatus { .. } => DownloadErrorKind::HttpStatus,
            DownloadError::Timeout { .. } => DownloadErrorKind::Timeout,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            DownloadError::Network { url, .. }
            | DownloadError::HttpStatus { url, .. }
            | DownloadError::Timeout { url, .. } => url,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            DownloadError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The manifest document could not be read as markup.
#[derive(Debug, Error)]
pub enum ManifestParseError {
    #[error("malformed manifest markup: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),
    #[error("document has no MPD root element")]
    MissingRoot,
    #[error("root element is <{0}>, expected <MPD>")]
    UnexpectedRoot(String),
    #[error("MPD element nested inside the document")]
    NestedRoot,
    #[error("content outside the MPD root element")]
    OutsideRoot,
    #[error("document ended with {0} unclosed element(s)")]
    Unclosed(usize),
}

/// Fatal reasons for a session to end in `Aborted`.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to fetch manifest {url}")]
    ManifestFetch {
        url: String,
        #[source]
        source: DownloadError,
    },
    #[error("failed to parse manifest {url}")]
    ManifestParse {
        url: String,
        #[source]
        source: ManifestParseError,
    },
    #[error("manifest {url} has no usable video representations")]
    NoRepresentations { url: String },
    #[error("segment {segment_number} failed {attempts} time(s) in a row")]
    SegmentDownload {
        segment_number: u64,
        attempts: u32,
        #[source]
        source: DownloadError,
    },
    #[error("failed to write to output sink")]
    Write(#[from] std::io::Error),
}

pub type DownloadResult<T> = Result<T, DownloadError>;
