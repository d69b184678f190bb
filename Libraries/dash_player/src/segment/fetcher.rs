use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::abr::BandwidthSample;
use crate::error::{DownloadError, DownloadResult};

/// Transport used for both the manifest and media segments.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Get all bytes from a URL. Any 2xx response is a success.
    async fn fetch(&self, url: &str) -> DownloadResult<Bytes>;
}

/// Plain HTTP GET with a per-request time budget.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(Client::new(), timeout)
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn get(&self, url: &str) -> DownloadResult<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Received {} from {}", status, url);
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|e| DownloadError::from_reqwest(url, e, self.timeout))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> DownloadResult<Bytes> {
        match tokio::time::timeout(self.timeout, self.get(url)).await {
            Ok(result) => result,
            Err(_) => Err(DownloadError::timeout(url, self.timeout)),
        }
    }
}

/// Bytes of one segment together with how long the transfer took.
#[derive(Debug, Clone)]
pub struct TimedDownload {
    pub data: Bytes,
    pub elapsed: Duration,
}

impl TimedDownload {
    pub fn sample(&self) -> BandwidthSample {
        BandwidthSample::from_transfer(self.data.len(), self.elapsed)
    }
}

/// Times fetches. Knows nothing about the estimator; the caller feeds samples to it.
#[derive(Debug, Clone)]
pub struct SegmentDownloader<F> {
    fetcher: F,
}

impl<F: Fetcher> SegmentDownloader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Downloads a segment and returns (bytes, download_duration).
    pub async fn download(&self, url: &str) -> DownloadResult<TimedDownload> {
        let start = Instant::now();
        let data = self.fetcher.fetch(url).await?;
        let elapsed = start.elapsed();
        debug!("Fetched {} bytes from {} in {:?}", data.len(), url, elapsed);
        Ok(TimedDownload { data, elapsed })
    }
}
