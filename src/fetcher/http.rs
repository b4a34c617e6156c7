use super::version::{extract_version, VersionToken};
use super::SourceFetcher;
use crate::config::SourceConfig;
use crate::error::{SyncError, SyncResult};
use crate::USER_AGENT;
use futures::TryStreamExt;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::io::StreamReader;
use tracing::{info, warn};

/// Bytes read when probing a blocklist header.
pub const HEADER_PROBE_BYTES: u64 = 2048;

/// Fetches blocklists over HTTP(S), primary URL first, then the backup.
pub struct HttpSourceFetcher {
    client: Client,
}

impl HttpSourceFetcher {
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// First [`HEADER_PROBE_BYTES`] of the body, or `None` on a non-200 status.
    async fn fetch_head(&self, url: &str) -> SyncResult<Option<String>> {
        let resp = self.client.get(url).send().await?;
        if resp.status() != StatusCode::OK {
            warn!("  Header probe of {} returned {}", url, resp.status());
            return Ok(None);
        }

        let stream = resp.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(stream).take(HEADER_PROBE_BYTES);
        let mut buf = Vec::with_capacity(HEADER_PROBE_BYTES as usize);
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| SyncError::Transient(e.to_string()))?;

        drop_partial_line(&mut buf, HEADER_PROBE_BYTES as usize);
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    async fn fetch_body(&self, url: &str) -> SyncResult<Option<String>> {
        let resp = self.client.get(url).send().await?;
        if resp.status() != StatusCode::OK {
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }

    async fn version_from(&self, url: &str, name: &str) -> SyncResult<Option<VersionToken>> {
        let Some(head) = self.fetch_head(url).await? else {
            return Ok(None);
        };
        if let Some(version) = extract_version(&head) {
            info!("  Found version for {}: {}", name, version);
            return Ok(Some(version));
        }

        info!("  No version in header of {}, fetching full content...", url);
        let version = self
            .fetch_body(url)
            .await?
            .and_then(|body| extract_version(&body));
        if let Some(version) = &version {
            info!("  Found version for {}: {}", name, version);
        }
        Ok(version)
    }
}

/// A probe that hit `limit` may end inside a line; keep only complete lines
/// so a cut-off marker is never read as a shorter version.
fn drop_partial_line(buf: &mut Vec<u8>, limit: usize) {
    if buf.len() < limit || buf.last() == Some(&b'\n') {
        return;
    }
    let keep = buf.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    buf.truncate(keep);
}

#[async_trait::async_trait]
impl SourceFetcher for HttpSourceFetcher {
    async fn fetch_version(&self, source: &SourceConfig) -> Option<VersionToken> {
        for url in source.urls() {
            match self.version_from(url, &source.name).await {
                Ok(Some(version)) => return Some(version),
                Ok(None) => {}
                Err(e) => warn!("  Error fetching version from {}: {}", url, e),
            }
        }
        warn!("  No version info found for {}", source.name);
        None
    }

    async fn fetch_full(&self, source: &SourceConfig) -> SyncResult<String> {
        let mut attempts = Vec::new();
        for url in source.urls() {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status() == StatusCode::OK => match resp.text().await {
                    Ok(text) => {
                        info!("Successfully fetched {} from {}", source.name, url);
                        return Ok(text);
                    }
                    Err(e) => {
                        warn!("Error reading body from {}: {}", url, e);
                        attempts.push(format!("{}: {}", url, e));
                    }
                },
                Ok(resp) => {
                    warn!("Failed to fetch from {}: {}", url, resp.status());
                    attempts.push(format!("{}: {}", url, resp.status()));
                }
                Err(e) => {
                    warn!("Error fetching from {}: {}", url, e);
                    attempts.push(format!("{}: {}", url, e));
                }
            }
        }
        Err(SyncError::Fetch {
            name: source.name.clone(),
            attempts,
        })
    }
}
