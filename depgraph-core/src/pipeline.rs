//! Full-sync orchestrator.
//!
//! Discover types, harvest inventories, apply stats, harvest edges, and
//! persist everything. Per-scope fetch failures are collected into the
//! report; only a failed type discovery or a store error aborts the run.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::TypeCatalog;
use crate::harvest::Harvester;
use crate::stats::StatsCollector;
use crate::store::GraphStore;
use crate::types::{ComponentRecord, SyncReport, SyncRun};

/// Knobs for a single sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Clear the store before harvesting.
    pub fresh: bool,
    pub skip_stats: bool,
    pub skip_edges: bool,
}

/// Drives one full sync against a store.
pub struct SyncPipeline<'a> {
    store: &'a dyn GraphStore,
    harvester: Harvester,
    catalog: TypeCatalog,
}

impl std::fmt::Debug for SyncPipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncPipeline")
            .field("harvester", &self.harvester)
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl<'a> SyncPipeline<'a> {
    pub fn new(store: &'a dyn GraphStore, harvester: Harvester, catalog: TypeCatalog) -> Self {
        Self {
            store,
            harvester,
            catalog,
        }
    }

    pub fn harvester(&self) -> &Harvester {
        &self.harvester
    }

    #[instrument(skip_all, fields(fresh = options.fresh))]
    pub async fn run(&self, options: SyncOptions) -> crate::error::Result<SyncReport> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        info!(%run_id, "Sync starting");

        let source = self.harvester.source().as_ref();
        let types = self.catalog.discover(source).await?;

        // ── Inventory ──
        let inventory = self.harvester.fetch_inventory(&types).await;

        // The previous graph survives until the remote has answered.
        if options.fresh {
            self.store.clear().await?;
            info!("Store cleared");
        }
        let mut components_inserted = self.store.upsert_nodes(&inventory.records).await?;
        let mut failed_scopes = inventory.failed_scopes();
        info!(
            seen = inventory.records.len(),
            inserted = components_inserted,
            "Inventory stored"
        );

        // ── Stats ──
        let mut stats_applied = 0;
        if options.skip_stats {
            info!("Skipping stats");
        } else {
            let stats = StatsCollector::new(source)
                .with_call_timeout(self.harvester.call_timeout())
                .fetch()
                .await;
            stats_applied = self.store.update_stats(&stats).await?;
            info!(records = stats.len(), applied = stats_applied, "Stats stored");
        }

        // ── Edges ──
        let mut edges_seen = 0;
        let mut edges_inserted = 0;
        if options.skip_edges {
            info!("Skipping edges");
        } else {
            let edges = self.harvester.fetch_edges_by_type(&types).await;
            edges_seen = edges.records.len();

            let endpoints = endpoint_records(&edges.records);
            components_inserted += self.store.upsert_nodes(&endpoints).await?;
            edges_inserted = self.store.upsert_edges(&edges.records).await?;
            failed_scopes.extend(edges.failed_scopes());
            info!(seen = edges_seen, inserted = edges_inserted, "Edges stored");
        }

        if !failed_scopes.is_empty() {
            warn!(failed = failed_scopes.len(), "Some scopes returned nothing");
        }

        self.store
            .record_sync(&SyncRun {
                run_id,
                finished_at: Utc::now(),
                components: components_inserted,
                edges: edges_inserted,
                failed_scopes: failed_scopes.len(),
            })
            .await?;

        let report = SyncReport {
            run_id,
            types_discovered: types.len(),
            components_seen: inventory.records.len(),
            components_inserted,
            edges_seen,
            edges_inserted,
            stats_applied,
            failed_scopes,
            duration: started.elapsed(),
        };
        info!(
            %run_id,
            components = report.components_inserted,
            edges = report.edges_inserted,
            elapsed_ms = report.duration.as_millis(),
            "Sync complete"
        );
        Ok(report)
    }
}

/// Distinct endpoint records of `edges`, first sighting wins.
fn endpoint_records(edges: &[crate::types::DependencyEdgeRecord]) -> Vec<ComponentRecord> {
    let mut seen = HashSet::new();
    edges
        .iter()
        .flat_map(|e| [e.source(), e.target()])
        .filter(|c| !c.id.is_empty() && seen.insert(c.id.clone()))
        .collect()
}
