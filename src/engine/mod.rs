mod best_effort;
mod chunk;
mod cleanup;
mod extract;
mod reconciler;
pub mod state;

pub use best_effort::{best_effort, BestEffortReport};
pub use chunk::{
    build_traffic_expression, chunk_domains, Chunk, SourceNaming, CHUNK_SIZE, MAX_EXPRESSION_LEN,
    MAX_LISTS_WARNING,
};
pub use cleanup::cleanup_sources;
pub use extract::{extract_domains, is_valid_domain, DomainSet};
pub use reconciler::{ReconcileOptions, Reconciler, Snapshot};
pub use state::{Decision, DecisionReason, SourceOutcome, SourceState};
