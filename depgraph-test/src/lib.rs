// Integration test fixtures for depgraph: in-memory orgs wired to a store.

use std::path::PathBuf;
use std::sync::Arc;

use depgraph_core::catalog::TypeCatalog;
use depgraph_core::config::{HarvestSection, RepairSection};
use depgraph_core::harvest::Harvester;
use depgraph_core::pipeline::{SyncOptions, SyncPipeline};
use depgraph_core::repair::ConsistencyRepairer;
use depgraph_core::source::{MemorySource, RemoteSource};
use depgraph_core::store::{GraphStore, SqliteStore};
use depgraph_core::types::{RepairReport, SyncReport};

/// A fake org and an empty in-memory store.
#[derive(Debug)]
pub struct TestOrg {
    pub source: Arc<MemorySource>,
    pub store: SqliteStore,
    pub harvest: HarvestSection,
}

impl TestOrg {
    pub fn new(source: MemorySource) -> Self {
        Self {
            source: Arc::new(source),
            store: SqliteStore::in_memory().expect("open in-memory store"),
            harvest: HarvestSection::default(),
        }
    }

    /// Types A (a1, a2) and B (b1), one edge a1 → b1.
    pub fn minimal() -> Self {
        Self::new(
            MemorySource::new()
                .with_type("A", &[("a1", "Alpha One"), ("a2", "Alpha Two")])
                .with_type("B", &[("b1", "Beta One")])
                .with_edge("a1", "b1"),
        )
    }

    /// Twelve types with two components each; every component uses the next
    /// type's first component.
    pub fn twelve_types() -> Self {
        let mut source = MemorySource::new();
        for t in 0..12 {
            let a = format!("t{t}-a");
            let b = format!("t{t}-b");
            source = source.with_type(&format!("Type{t}"), &[(a.as_str(), "First"), (b.as_str(), "Second")]);
        }
        for t in 0..12 {
            let next = format!("t{}-a", (t + 1) % 12);
            source = source
                .with_edge(&format!("t{t}-a"), &next)
                .with_edge(&format!("t{t}-b"), &next);
        }
        Self::new(source)
    }

    /// An org whose edges point at `count` components that no inventory lists
    /// but that by-id lookups can describe. Pair with [`TestOrg::seed_edges_only`].
    pub fn with_hidden_components(count: usize) -> Self {
        let mut source = MemorySource::new().with_type("ApexClass", &[("root", "Root")]);
        for i in 0..count {
            let edge = depgraph_core::types::DependencyEdgeRecord {
                source_id: "root".into(),
                source_name: Some("Root".into()),
                source_type: Some("Hidden".into()),
                target_id: format!("h{i:03}"),
                target_name: Some(format!("Hidden{i}")),
                target_type: Some("StaticResource".into()),
            };
            source = source.with_edge_record(edge);
        }
        Self::new(source)
    }

    /// Store every remote edge without any node rows, leaving all endpoints dangling.
    pub async fn seed_edges_only(&self) {
        self.store
            .upsert_edges(&self.source.snapshot().edges)
            .await
            .expect("seed edges");
    }

    #[must_use]
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.harvest.concurrency = limit;
        self
    }

    pub fn harvester(&self) -> Harvester {
        Harvester::new(
            Arc::clone(&self.source) as Arc<dyn RemoteSource>,
            &self.harvest,
        )
    }

    pub async fn sync(&self, options: SyncOptions) -> SyncReport {
        SyncPipeline::new(&self.store, self.harvester(), TypeCatalog::default())
            .run(options)
            .await
            .expect("sync")
    }

    pub async fn repair(&self, batch_size: usize) -> RepairReport {
        ConsistencyRepairer::new(&self.store, &RepairSection { batch_size })
            .repair(&self.harvester())
            .await
            .expect("repair")
    }

    /// Write the org as a JSON snapshot the CLI can read with `--from-file`.
    pub fn write_snapshot(&self, dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("snapshot.json");
        let json = serde_json::to_string_pretty(self.source.snapshot()).expect("serialize snapshot");
        std::fs::write(&path, json).expect("write snapshot");
        path
    }
}
