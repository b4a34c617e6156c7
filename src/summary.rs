use crate::engine::{BestEffortReport, SourceOutcome, SourceState};
use tracing::{info, warn};

/// Aggregate of one reconciliation run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub sources_checked: usize,
    pub sources_needing_update: usize,
    pub sources_updated: usize,
    pub failed: Vec<String>,
    pub total_domains: usize,
    pub lists_created: usize,
    pub policies_created: usize,
    /// Lists in the account after the last snapshot refresh, when one was taken.
    pub lists_in_account: Option<usize>,
    pub outcomes: Vec<SourceOutcome>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: SourceOutcome) {
        self.sources_checked += 1;
        match outcome.state {
            SourceState::Succeeded => {
                self.sources_needing_update += 1;
                self.sources_updated += 1;
                self.total_domains += outcome.domain_count;
                self.lists_created += outcome.list_count;
                self.policies_created += 1;
            }
            SourceState::Failed => {
                self.sources_needing_update += 1;
                self.failed.push(outcome.name.clone());
            }
            _ => {}
        }
        self.outcomes.push(outcome);
    }

    /// A source that needs an update but was not processed (dry run).
    pub fn record_planned(&mut self, name: &str) {
        self.sources_checked += 1;
        self.sources_needing_update += 1;
        self.outcomes.push(SourceOutcome {
            name: name.to_string(),
            state: SourceState::NeedsUpdate,
            domain_count: 0,
            list_count: 0,
            version: None,
            error: None,
        });
    }

    pub fn sources_skipped(&self) -> usize {
        self.sources_checked - self.sources_needing_update
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// 0 when no source failed, including runs where nothing needed updating.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn log(&self) {
        info!("{}", "=".repeat(60));
        info!("SUMMARY");
        info!("{}", "=".repeat(60));
        info!("Sources checked: {}", self.sources_checked);
        info!(
            "Sources updated: {}/{}",
            self.sources_updated, self.sources_needing_update
        );
        info!("Sources skipped: {}", self.sources_skipped());
        info!("Total domains: {}", self.total_domains);
        info!("Lists created: {}", self.lists_created);
        info!("Policies created: {}", self.policies_created);
        if let Some(total) = self.lists_in_account {
            info!("Total lists in account: {}", total);
        }

        if self.failed.is_empty() {
            info!("All sources up to date.");
        } else {
            for outcome in self.outcomes.iter().filter(|o| !o.is_success()) {
                warn!(
                    source = %outcome.name,
                    "Failed: {}",
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
            warn!(
                "Failed sources ({}): {}",
                self.failed.len(),
                self.failed.join(", ")
            );
        }
    }
}

/// Aggregate of one cleanup run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupSummary {
    pub policies_deleted: usize,
    pub lists_deleted: usize,
    pub failures: Vec<(String, String)>,
}

impl CleanupSummary {
    pub fn record_policies(&mut self, report: BestEffortReport) {
        self.policies_deleted += report.succeeded;
        self.failures.extend(report.failures);
    }

    pub fn record_lists(&mut self, report: BestEffortReport) {
        self.lists_deleted += report.succeeded;
        self.failures.extend(report.failures);
    }

    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() {
            0
        } else {
            1
        }
    }

    pub fn log(&self) {
        info!(
            "Cleanup deleted {} policies and {} lists",
            self.policies_deleted, self.lists_deleted
        );
        for (item, error) in &self.failures {
            warn!("Could not delete {}: {}", item, error);
        }
    }
}
