// Read-side helpers shared by the CLI `search`, `deps` and `graph` commands.

use serde::{Deserialize, Serialize};

use crate::store::GraphStore;
use crate::types::{Component, EdgeView};

/// The whole persisted graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<Component>,
    pub edges: Vec<EdgeView>,
}

impl GraphView {
    #[must_use]
    pub fn without_self_loops(mut self) -> Self {
        self.edges.retain(|e| !e.is_self_loop());
        self
    }
}

/// Every node and edge in storage order.
pub async fn load_graph(store: &dyn GraphStore) -> crate::error::Result<GraphView> {
    Ok(GraphView {
        nodes: store.list_nodes().await?,
        edges: store.list_edges().await?,
    })
}

/// Look a component up by exact id, falling back to the first search hit.
pub async fn find_component(
    store: &dyn GraphStore,
    term: &str,
) -> crate::error::Result<Option<Component>> {
    if let Some(node) = store.get_node(term).await? {
        return Ok(Some(node));
    }
    Ok(store.search_nodes(term).await?.into_iter().next())
}

/// Name if known, else the id.
pub fn display_name(component: &Component) -> &str {
    component.name.as_deref().unwrap_or(&component.id)
}
