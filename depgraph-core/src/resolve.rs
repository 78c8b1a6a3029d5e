// Per-component dependency lookup, from the store or straight from the remote.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::error::ConfigError;
use crate::harvest::Harvester;
use crate::store::GraphStore;
use crate::types::{Component, EdgeScope, EdgeView, ResolveMode};

/// Serves the edges touching one component.
#[derive(Clone, Copy)]
pub struct DependencyResolver<'a> {
    store: &'a dyn GraphStore,
    remote: Option<&'a Harvester>,
    include_self_loops: bool,
}

impl std::fmt::Debug for DependencyResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyResolver")
            .field("remote", &self.remote.is_some())
            .field("include_self_loops", &self.include_self_loops)
            .finish_non_exhaustive()
    }
}

impl<'a> DependencyResolver<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            remote: None,
            include_self_loops: true,
        }
    }

    /// Enable [`ResolveMode::Live`] through this harvester.
    #[must_use]
    pub fn with_remote(mut self, harvester: &'a Harvester) -> Self {
        self.remote = Some(harvester);
        self
    }

    #[must_use]
    pub fn include_self_loops(mut self, include: bool) -> Self {
        self.include_self_loops = include;
        self
    }

    /// Edges with `id` as source or target.
    ///
    /// `Local` reads persisted edges with stats joined in. `Live` asks the
    /// remote and never writes to the store; a remote failure comes back as
    /// an error instead of an empty list.
    #[instrument(skip(self), fields(self_loops = self.include_self_loops))]
    pub async fn resolve(&self, id: &str, mode: ResolveMode) -> crate::error::Result<Vec<EdgeView>> {
        if id.is_empty() {
            return Ok(Vec::new());
        }
        let mut edges = match mode {
            ResolveMode::Local => self.store.edges_touching(id).await?,
            ResolveMode::Live => self.resolve_live(id).await?,
        };
        if !self.include_self_loops {
            edges.retain(|e| !e.is_self_loop());
        }
        debug!(edges = edges.len(), "Resolved dependencies");
        Ok(edges)
    }

    async fn resolve_live(&self, id: &str) -> crate::error::Result<Vec<EdgeView>> {
        let harvester = self.remote.ok_or_else(|| {
            ConfigError::Invalid("live resolution needs a remote source".into())
        })?;
        let records = harvester
            .query_edges(&EdgeScope::ById(vec![id.to_string()]))
            .await?;

        let mut known: HashMap<String, Option<Component>> = HashMap::new();
        let mut views = Vec::with_capacity(records.len());
        for record in records
            .iter()
            .filter(|r| r.source_id == id || r.target_id == id)
        {
            let mut view = EdgeView::from_record(record);
            for endpoint_id in [&record.source_id, &record.target_id] {
                if !known.contains_key(endpoint_id) {
                    let node = self.store.get_node(endpoint_id).await?;
                    known.insert(endpoint_id.clone(), node);
                }
            }
            if let Some(Some(node)) = known.get(&record.source_id) {
                view.source_name = view.source_name.or_else(|| node.name.clone());
                view.source_type = view.source_type.or_else(|| node.kind.clone());
                view.source_size = node.size;
                view.source_coverage = node.coverage;
            }
            if let Some(Some(node)) = known.get(&record.target_id) {
                view.target_name = view.target_name.or_else(|| node.name.clone());
                view.target_type = view.target_type.or_else(|| node.kind.clone());
                view.target_size = node.size;
                view.target_coverage = node.coverage;
            }
            views.push(view);
        }
        Ok(views)
    }
}
