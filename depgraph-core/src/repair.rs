//! Backfilling of dangling edge endpoints.
//!
//! Edges can name components the inventory harvest never returned. Repair
//! asks the remote for edges touching those ids, in sorted batches and one
//! call at a time, and inserts every originally-missing endpoint the
//! responses reveal. Ids the remote cannot describe stay dangling and are
//! reported, not treated as errors.

use std::collections::{BTreeSet, HashSet};

use tracing::{info, instrument, warn};

use crate::config::RepairSection;
use crate::error::RepairError;
use crate::harvest::Harvester;
use crate::store::GraphStore;
use crate::types::{ComponentRecord, EdgeScope, RepairReport};

/// Finds and resolves dangling edge endpoints.
#[derive(Clone, Copy)]
pub struct ConsistencyRepairer<'a> {
    store: &'a dyn GraphStore,
    batch_size: usize,
}

impl std::fmt::Debug for ConsistencyRepairer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyRepairer")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl<'a> ConsistencyRepairer<'a> {
    pub fn new(store: &'a dyn GraphStore, config: &RepairSection) -> Self {
        Self {
            store,
            batch_size: config.batch_size.max(1),
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Every edge endpoint id without a node row, sorted.
    pub async fn find_dangling_ids(&self) -> crate::error::Result<BTreeSet<String>> {
        self.store.dangling_ids().await
    }

    /// Resolve dangling ids through sequential by-id edge queries.
    ///
    /// A failed batch stops the run with [`RepairError::BatchFailed`];
    /// batches before it stay committed and the error carries their report.
    #[instrument(skip_all, fields(batch_size = self.batch_size))]
    pub async fn repair(&self, harvester: &Harvester) -> crate::error::Result<RepairReport> {
        let missing: Vec<String> = self.find_dangling_ids().await?.into_iter().collect();
        let mut report = RepairReport {
            missing: missing.len(),
            ..RepairReport::default()
        };
        if missing.is_empty() {
            info!("No dangling ids, nothing to repair");
            return Ok(report);
        }
        info!(missing = missing.len(), "Repairing dangling ids");

        let wanted: HashSet<&str> = missing.iter().map(String::as_str).collect();
        let mut resolved: HashSet<String> = HashSet::new();

        for (index, batch) in missing.chunks(self.batch_size).enumerate() {
            report.batches += 1;
            report.remote_calls += 1;

            let edges = match harvester.query_edges(&EdgeScope::ById(batch.to_vec())).await {
                Ok(edges) => edges,
                Err(source) => {
                    warn!(batch = index, error = %source, "Repair batch failed, stopping");
                    finish_report(&mut report, &missing, &resolved);
                    return Err(RepairError::BatchFailed {
                        batch: index,
                        source,
                        partial: Box::new(report),
                    }
                    .into());
                }
            };

            let mut found: Vec<ComponentRecord> = Vec::new();
            for endpoint in edges.iter().flat_map(|e| [e.source(), e.target()]) {
                if wanted.contains(endpoint.id.as_str()) && !resolved.contains(&endpoint.id) {
                    resolved.insert(endpoint.id.clone());
                    found.push(endpoint);
                }
            }
            if !found.is_empty() {
                self.store.upsert_nodes(&found).await?;
            }
            info!(
                batch = index,
                edges = edges.len(),
                resolved = found.len(),
                "Repair batch committed"
            );
        }

        finish_report(&mut report, &missing, &resolved);
        info!(
            resolved = report.resolved.len(),
            unresolved = report.unresolved.len(),
            "Repair complete"
        );
        Ok(report)
    }
}

fn finish_report(report: &mut RepairReport, missing: &[String], resolved: &HashSet<String>) {
    let (done, left): (Vec<String>, Vec<String>) =
        missing.iter().cloned().partition(|id| resolved.contains(id));
    report.resolved = done;
    report.unresolved = left;
}
