//! Segment addressing and transport.

pub mod fetcher;
pub mod resolver;

pub use fetcher::{Fetcher, HttpFetcher, SegmentDownloader, TimedDownload};
pub use resolver::{NumberedSegmentResolver, SegmentUrlResolver};
