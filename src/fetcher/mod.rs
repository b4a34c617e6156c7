mod http;
mod version;

pub use http::{HttpSourceFetcher, HEADER_PROBE_BYTES};
pub use version::{extract_version, VersionToken, HEADER_LINES};

use crate::config::SourceConfig;
use crate::error::SyncResult;

/// Access to the hosted blocklists.
#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Version marker of the source, or `None` when no URL yields one.
    /// Network errors are logged, never returned.
    async fn fetch_version(&self, source: &SourceConfig) -> Option<VersionToken>;

    /// Full body from the first URL answering 200.
    async fn fetch_full(&self, source: &SourceConfig) -> SyncResult<String>;
}
