use super::best_effort::best_effort;
use super::chunk::{
    build_traffic_expression, chunk_domains, SourceNaming, CHUNK_SIZE, MAX_EXPRESSION_LEN,
    MAX_LISTS_WARNING,
};
use super::extract::extract_domains;
use super::state::{Decision, DecisionReason, SourceOutcome, SourceState};
use crate::config::{Config, SourceConfig};
use crate::error::{SyncError, SyncResult};
use crate::fetcher::{extract_version, SourceFetcher, VersionToken};
use crate::remote::{GatewayApi, NewList, NewPolicy, RemoteList, RemotePolicy};
use crate::summary::RunSummary;
use crate::versions::VersionStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Run-wide switches of the reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub force_update_all: bool,
    pub check_versions: bool,
    /// Decide only; mutate nothing and persist nothing.
    pub dry_run: bool,
}

impl ReconcileOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            force_update_all: config.updates.force_update_all,
            check_versions: config.updates.check_versions,
            dry_run: false,
        }
    }
}

/// All remote lists and policies, fetched in one paginated pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub lists: Vec<RemoteList>,
    pub policies: Vec<RemotePolicy>,
}

impl Snapshot {
    pub async fn fetch(api: &dyn GatewayApi) -> SyncResult<Self> {
        let policies = api.list_policies().await?;
        let lists = api.list_lists().await?;
        info!(
            "Cached {} policies and {} lists",
            policies.len(),
            lists.len()
        );
        Ok(Self { lists, policies })
    }

    pub fn policies_named(&self, name: &str) -> Vec<RemotePolicy> {
        self.policies
            .iter()
            .filter(|p| p.name == name)
            .cloned()
            .collect()
    }

    pub fn lists_owned_by(&self, naming: &SourceNaming) -> Vec<RemoteList> {
        self.lists
            .iter()
            .filter(|l| naming.owns_list(&l.name))
            .cloned()
            .collect()
    }
}

/// Brings the gateway's lists and policies in line with the configured sources.
pub struct Reconciler {
    api: Arc<dyn GatewayApi>,
    fetcher: Arc<dyn SourceFetcher>,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(
        api: Arc<dyn GatewayApi>,
        fetcher: Arc<dyn SourceFetcher>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            api,
            fetcher,
            options,
        }
    }

    /// CHECKING -> UP_TO_DATE | NEEDS_UPDATE.
    pub async fn decide(&self, source: &SourceConfig, versions: &VersionStore) -> Decision {
        debug!(source = %source.name, state = %SourceState::Checking);
        if self.options.force_update_all {
            return Decision::forced(DecisionReason::ForceUpdate);
        }
        if !self.options.check_versions {
            return Decision::forced(DecisionReason::VersionCheckDisabled);
        }

        let current = self.fetcher.fetch_version(source).await;
        let decision = Decision::from_versions(current, versions.get(&source.name));
        match &decision.reason {
            DecisionReason::VersionUnknown => {
                warn!("  Could not determine version, will update to be safe")
            }
            DecisionReason::FirstRun => {
                info!("  No cached version found, first run for {}", source.name)
            }
            DecisionReason::VersionChanged { cached } => info!(
                "  Version changed: {} -> {}",
                cached,
                decision
                    .version
                    .as_ref()
                    .map(VersionToken::as_str)
                    .unwrap_or_default()
            ),
            _ => {}
        }
        decision
    }

    /// NEEDS_UPDATE -> SUCCEEDED, or an error meaning FAILED.
    ///
    /// Replaces the source's policy and lists. `snapshot` must reflect the
    /// remote state before this call.
    pub async fn update_source(
        &self,
        source: &SourceConfig,
        snapshot: &Snapshot,
    ) -> SyncResult<SourceOutcome> {
        let naming = SourceNaming::new(&source.name);
        debug!(source = %source.name, state = %SourceState::Updating);
        info!("{}", "=".repeat(60));
        info!("Processing source: {}", source.name);
        info!("{}", "=".repeat(60));

        // 1. Fetch
        let content = self.fetcher.fetch_full(source).await?;
        let fetched_version = extract_version(&content);

        // 2. Extract
        let domains = extract_domains(&content);
        if domains.is_empty() {
            return Err(SyncError::Validation {
                name: source.name.clone(),
            });
        }
        info!("Processed {} unique valid domains", domains.len());

        // 3. Chunk
        let chunks = chunk_domains(&domains, CHUNK_SIZE);
        info!("Split into {} chunk(s)", chunks.len());
        if chunks.len() > MAX_LISTS_WARNING {
            warn!(
                "{} chunks is close to the account's 1000 list limit",
                chunks.len()
            );
        }

        // 4. Old policy. A failed delete stops here: creating a second
        // policy with the same name is not well defined remotely.
        for policy in snapshot.policies_named(naming.policy_name()) {
            match self.api.delete_policy(&policy.id).await {
                Ok(()) => info!("Deleted old {}", policy),
                Err(e) if e.is_not_found() => info!("Old {} already gone", policy),
                Err(e) => {
                    error!("Could not delete {}: {}", policy, e);
                    return Err(e);
                }
            }
        }

        // 5. Old lists
        let stale = snapshot.lists_owned_by(&naming);
        let report = best_effort("Deleted old", &stale, |list| {
            self.api.delete_list(&list.id)
        })
        .await;
        if !report.is_clean() {
            warn!(
                "{} old list(s) of {} could not be deleted",
                report.failures.len(),
                source.name
            );
        }

        // 6. New lists
        let mut list_ids: Vec<String> = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let list_name = naming.list_name(chunk.index);
            let payload = NewList::domains(
                list_name.clone(),
                naming.list_description(chunk.index, chunks.len()),
                &chunk.domains,
            );
            match self.api.create_list(&payload).await {
                Ok(id) => {
                    info!(
                        "Created list {}/{}: {} ({} domains)",
                        chunk.index,
                        chunks.len(),
                        list_name,
                        chunk.domains.len()
                    );
                    list_ids.push(id);
                }
                Err(e) => {
                    error!("Failed to create list {}: {}", list_name, e);
                    info!("Cleaning up partially created lists...");
                    best_effort("Cleaned up list", &list_ids, |id| {
                        self.api.delete_list(id)
                    })
                    .await;
                    return Err(e);
                }
            }
        }

        // 7. Expression
        let expression = build_traffic_expression(&list_ids);
        if expression.len() > MAX_EXPRESSION_LEN {
            warn!(
                "Expression length ({}) may exceed the service's limits",
                expression.len()
            );
        }

        // 8. Policy. Lists stay in place if this fails; the next run replaces them.
        let policy = NewPolicy::dns_block(
            naming.policy_name().to_string(),
            naming.policy_description(list_ids.len(), domains.len()),
            expression,
        );
        if let Err(e) = self.api.create_policy(&policy).await {
            error!(
                "Failed to create policy {} ({} lists left without a policy): {}",
                policy.name,
                list_ids.len(),
                e
            );
            return Err(e);
        }
        info!("Created policy: {}", policy.name);

        let mut outcome = SourceOutcome::succeeded(&source.name, domains.len(), list_ids.len());
        outcome.version = fetched_version;
        Ok(outcome)
    }

    /// Checks every source, updates those that changed and saves the version
    /// cache once at the end.
    ///
    /// Returns `Err` only for run-fatal failures (remote snapshot unavailable).
    /// The partial summary is logged before such an error is returned.
    pub async fn run(
        &self,
        sources: &[SourceConfig],
        versions: &mut VersionStore,
    ) -> SyncResult<RunSummary> {
        let mut summary = RunSummary::default();

        info!("Checking blocklist versions...");
        let mut pending = Vec::new();
        for source in sources {
            info!("Checking {}", source.name);
            let decision = self.decide(source, versions).await;
            if decision.needs_update() {
                info!("{}: WILL UPDATE ({})", source.name, decision.reason);
                pending.push((source, decision));
            } else {
                info!("{}: SKIP ({})", source.name, decision.reason);
                if let Some(version) = decision.version {
                    versions.set(&source.name, version);
                }
                summary.record(SourceOutcome::up_to_date(&source.name));
            }
        }

        info!("{}", "=".repeat(60));
        info!("Sources to update: {}/{}", pending.len(), sources.len());
        info!("{}", "=".repeat(60));

        if self.options.dry_run {
            for (source, _) in &pending {
                info!("Dry run: would update {}", source.name);
                summary.record_planned(&source.name);
            }
            return Ok(summary);
        }

        let result = if pending.is_empty() {
            info!("All sources are up to date. No updates needed.");
            Ok(())
        } else {
            self.update_pending(pending, versions, &mut summary).await
        };

        if let Err(e) = versions.save().await {
            warn!("Could not save version cache: {}", e);
        }
        if let Err(e) = &result {
            error!("Run aborted after {} source(s): {}", summary.sources_checked, e);
            summary.log();
        }
        result.map(|()| summary)
    }

    async fn update_pending(
        &self,
        pending: Vec<(&SourceConfig, Decision)>,
        versions: &mut VersionStore,
        summary: &mut RunSummary,
    ) -> SyncResult<()> {
        info!("Caching current policies and lists...");
        let mut snapshot = Snapshot::fetch(self.api.as_ref()).await.map_err(|e| {
            error!("Failed to cache policies/lists: {}", e);
            e
        })?;

        for (source, decision) in pending {
            match self.update_source(source, &snapshot).await {
                Ok(outcome) => {
                    if let Some(version) = outcome.version.clone().or(decision.version) {
                        versions.set(&source.name, version);
                    }
                    summary.record(outcome);
                    // Ids and names changed; later sources need the fresh view.
                    snapshot = Snapshot::fetch(self.api.as_ref()).await?;
                }
                Err(e) => {
                    error!("Failed to process {}: {}", source.name, e);
                    summary.record(SourceOutcome::failed(&source.name, e));
                }
            }
        }

        summary.lists_in_account = Some(snapshot.lists.len());
        Ok(())
    }
}
