use super::types::{NewList, NewPolicy, RemoteList, RemotePolicy};
use crate::error::SyncResult;
use std::time::Duration;

/// The gateway operations the reconciler and cleanup job need.
#[async_trait::async_trait]
pub trait GatewayApi: Send + Sync {
    async fn list_lists(&self) -> SyncResult<Vec<RemoteList>>;
    async fn list_policies(&self) -> SyncResult<Vec<RemotePolicy>>;
    /// Returns the id of the created list.
    async fn create_list(&self, list: &NewList) -> SyncResult<String>;
    async fn delete_list(&self, id: &str) -> SyncResult<()>;
    /// Returns the id of the created policy.
    async fn create_policy(&self, policy: &NewPolicy) -> SyncResult<String>;
    async fn delete_policy(&self, id: &str) -> SyncResult<()>;
}

/// Clock seam for backoff and rate-limit pauses.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
