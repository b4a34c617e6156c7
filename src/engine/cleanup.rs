use super::best_effort::best_effort;
use super::chunk::SourceNaming;
use super::reconciler::Snapshot;
use crate::config::SourceConfig;
use crate::error::SyncResult;
use crate::remote::GatewayApi;
use crate::summary::CleanupSummary;
use tracing::info;

/// Deletes every policy and list owned by the configured sources.
///
/// Objects outside the sources' naming scheme are left alone. Fails only
/// when the initial snapshot cannot be fetched.
pub async fn cleanup_sources(
    api: &dyn GatewayApi,
    sources: &[SourceConfig],
) -> SyncResult<CleanupSummary> {
    info!("Targeting {} sources from configuration", sources.len());
    let snapshot = Snapshot::fetch(api).await?;
    let mut summary = CleanupSummary::default();

    for source in sources {
        let naming = SourceNaming::new(&source.name);
        info!("Processing cleanup for: {}", source.name);

        let policies = snapshot.policies_named(naming.policy_name());
        if policies.is_empty() {
            info!("  Policy '{}' not found", naming.policy_name());
        }
        let report = best_effort("Deleted", &policies, |policy| api.delete_policy(&policy.id)).await;
        summary.record_policies(report);

        let lists = snapshot.lists_owned_by(&naming);
        if lists.is_empty() {
            info!("  No lists found matching prefix '{}'", naming.list_prefix());
        } else {
            info!(
                "  Found {} lists matching prefix '{}'",
                lists.len(),
                naming.list_prefix()
            );
        }
        let report = best_effort("Deleted", &lists, |list| api.delete_list(&list.id)).await;
        summary.record_lists(report);
    }

    Ok(summary)
}
