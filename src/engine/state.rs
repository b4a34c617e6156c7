use crate::fetcher::VersionToken;
use std::fmt;

/// Lifecycle of one source within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    Checking,
    UpToDate,
    NeedsUpdate,
    Updating,
    Succeeded,
    Failed,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceState::Checking => "CHECKING",
            SourceState::UpToDate => "UP_TO_DATE",
            SourceState::NeedsUpdate => "NEEDS_UPDATE",
            SourceState::Updating => "UPDATING",
            SourceState::Succeeded => "SUCCEEDED",
            SourceState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Why a source was (or was not) scheduled for update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    ForceUpdate,
    VersionCheckDisabled,
    VersionUnknown,
    FirstRun,
    VersionChanged { cached: VersionToken },
    VersionUnchanged,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::ForceUpdate => f.write_str("force update enabled"),
            DecisionReason::VersionCheckDisabled => f.write_str("version checking disabled"),
            DecisionReason::VersionUnknown => f.write_str("version unknown"),
            DecisionReason::FirstRun => f.write_str("first run"),
            DecisionReason::VersionChanged { cached } => {
                write!(f, "version changed from {}", cached)
            }
            DecisionReason::VersionUnchanged => f.write_str("version unchanged"),
        }
    }
}

/// Outcome of the CHECKING step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// `UpToDate` or `NeedsUpdate`.
    pub state: SourceState,
    /// Version observed this run, if any.
    pub version: Option<VersionToken>,
    pub reason: DecisionReason,
}

impl Decision {
    pub fn needs_update(&self) -> bool {
        self.state == SourceState::NeedsUpdate
    }

    /// Pure version gate: an absent current version always forces an update.
    pub fn from_versions(current: Option<VersionToken>, cached: Option<&VersionToken>) -> Self {
        let (state, reason) = match (&current, cached) {
            (None, _) => (SourceState::NeedsUpdate, DecisionReason::VersionUnknown),
            (Some(_), None) => (SourceState::NeedsUpdate, DecisionReason::FirstRun),
            (Some(now), Some(before)) if now != before => (
                SourceState::NeedsUpdate,
                DecisionReason::VersionChanged {
                    cached: before.clone(),
                },
            ),
            (Some(_), Some(_)) => (SourceState::UpToDate, DecisionReason::VersionUnchanged),
        };
        Self {
            state,
            version: current,
            reason,
        }
    }

    pub fn forced(reason: DecisionReason) -> Self {
        Self {
            state: SourceState::NeedsUpdate,
            version: None,
            reason,
        }
    }
}

/// Per-source result handed to the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub name: String,
    pub state: SourceState,
    pub domain_count: usize,
    pub list_count: usize,
    /// Version marker found in the content that was applied.
    pub version: Option<VersionToken>,
    pub error: Option<String>,
}

impl SourceOutcome {
    pub fn up_to_date(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: SourceState::UpToDate,
            domain_count: 0,
            list_count: 0,
            version: None,
            error: None,
        }
    }

    pub fn succeeded(name: &str, domain_count: usize, list_count: usize) -> Self {
        Self {
            name: name.to_string(),
            state: SourceState::Succeeded,
            domain_count,
            list_count,
            version: None,
            error: None,
        }
    }

    pub fn failed(name: &str, error: impl fmt::Display) -> Self {
        Self {
            name: name.to_string(),
            state: SourceState::Failed,
            domain_count: 0,
            list_count: 0,
            version: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state != SourceState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionToken {
        VersionToken::new(s)
    }

    #[test]
    fn test_version_gate() {
        let same = Decision::from_versions(Some(v("1")), Some(&v("1")));
        assert_eq!(same.state, SourceState::UpToDate);
        assert_eq!(same.version, Some(v("1")));

        let changed = Decision::from_versions(Some(v("1")), Some(&v("0")));
        assert!(changed.needs_update());
        assert_eq!(changed.reason, DecisionReason::VersionChanged { cached: v("0") });

        let first = Decision::from_versions(Some(v("1")), None);
        assert_eq!(first.reason, DecisionReason::FirstRun);

        // Unknown never matches anything, including a missing cache entry.
        assert!(Decision::from_versions(None, Some(&v("1"))).needs_update());
        assert!(Decision::from_versions(None, None).needs_update());
    }
}
