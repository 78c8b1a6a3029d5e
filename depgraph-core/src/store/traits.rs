use std::collections::BTreeSet;

use crate::types::{
    Component, ComponentRecord, ComponentStats, DependencyEdgeRecord, EdgeView, StoreStats,
    SyncRun,
};

/// Maximum rows returned by [`GraphStore::search_nodes`].
pub const SEARCH_LIMIT: usize = 50;

/// The graph store abstraction. It is the only writer of component and
/// dependency rows; every write method runs in one transaction and either
/// commits the whole batch or none of it.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    // ── Writes ─────────────────────────────────────────────────────

    /// Insert components that are not stored yet. Existing rows are left
    /// untouched (first writer wins on name/type). Records with an empty id
    /// are skipped. Returns the number of rows inserted.
    async fn upsert_nodes(&self, records: &[ComponentRecord]) -> crate::error::Result<u64>;

    /// Coalesce size/coverage onto existing rows: a `None` keeps the stored
    /// value. Unknown ids are ignored. Returns the number of rows touched.
    async fn update_stats(&self, records: &[ComponentStats]) -> crate::error::Result<u64>;

    /// Insert edges not stored yet; both ids must be non-empty. Returns the
    /// number of rows inserted.
    async fn upsert_edges(&self, records: &[DependencyEdgeRecord]) -> crate::error::Result<u64>;

    /// Delete every component and dependency.
    async fn clear(&self) -> crate::error::Result<()>;

    // ── Reads ──────────────────────────────────────────────────────

    async fn get_node(&self, id: &str) -> crate::error::Result<Option<Component>>;

    /// All components in storage order.
    async fn list_nodes(&self) -> crate::error::Result<Vec<Component>>;

    /// Case-insensitive substring match on name or id, at most [`SEARCH_LIMIT`] rows.
    async fn search_nodes(&self, term: &str) -> crate::error::Result<Vec<Component>>;

    /// Every edge with `id` as source or target, joined with endpoint rows.
    /// Dangling endpoints keep the row with null stats.
    async fn edges_touching(&self, id: &str) -> crate::error::Result<Vec<EdgeView>>;

    /// Every edge, joined like [`GraphStore::edges_touching`].
    async fn list_edges(&self) -> crate::error::Result<Vec<EdgeView>>;

    /// Ids named by an edge endpoint that have no component row.
    async fn dangling_ids(&self) -> crate::error::Result<BTreeSet<String>>;

    // ── Metadata ───────────────────────────────────────────────────

    /// Remember the most recent sync.
    async fn record_sync(&self, run: &SyncRun) -> crate::error::Result<()>;

    async fn last_sync(&self) -> crate::error::Result<Option<SyncRun>>;

    /// Summary statistics about the store.
    async fn stats(&self) -> crate::error::Result<StoreStats>;
}
