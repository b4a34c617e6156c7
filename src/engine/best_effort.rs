use crate::error::SyncResult;
use std::fmt::Display;
use std::future::Future;
use tracing::{info, warn};

/// Result of a best-effort sweep. Failures are recorded, never raised.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BestEffortReport {
    pub succeeded: usize,
    /// `(item, error)` for every failed attempt.
    pub failures: Vec<(String, String)>,
}

impl BestEffortReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs `op` on every item in order, logging and collecting failures
/// instead of stopping. A not-found error counts as done.
pub async fn best_effort<'a, T, F, Fut>(action: &str, items: &'a [T], mut op: F) -> BestEffortReport
where
    T: Display,
    F: FnMut(&'a T) -> Fut,
    Fut: Future<Output = SyncResult<()>>,
{
    let mut report = BestEffortReport::default();
    for item in items {
        match op(item).await {
            Ok(()) => {
                info!("{} {}", action, item);
                report.succeeded += 1;
            }
            Err(e) if e.is_not_found() => {
                info!("{} {}: already gone", action, item);
                report.succeeded += 1;
            }
            Err(e) => {
                warn!("Could not complete '{}' for {}: {}", action, item, e);
                report.failures.push((item.to_string(), e.to_string()));
            }
        }
    }
    report
}
