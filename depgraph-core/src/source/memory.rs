// In-memory remote source backed by a JSON snapshot, with fault injection.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FetchError;
use crate::types::{
    ComponentRecord, DependencyEdgeRecord, EdgeScope, MetricQuery, MetricRow, TypeDescriptor,
};

use super::RemoteSource;

/// Serialized form of a remote org: what `MemorySource` serves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSnapshot {
    /// Every type name the remote reports, noise included.
    pub types: Vec<String>,
    /// Inventory per type name.
    pub components: BTreeMap<String, Vec<ComponentRecord>>,
    pub edges: Vec<DependencyEdgeRecord>,
    pub class_sizes: Vec<MetricRow>,
    pub trigger_sizes: Vec<MetricRow>,
    pub coverage: Vec<MetricRow>,
}

#[derive(Debug, Default)]
struct Faults {
    describe: bool,
    by_id: bool,
    ids: HashSet<String>,
    types: HashSet<String>,
    metrics: HashSet<MetricQuery>,
    unresolvable: HashSet<String>,
    delays: HashMap<String, Duration>,
    metric_delays: HashMap<MetricQuery, Duration>,
}

/// Counts of calls served, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub describe: usize,
    pub list: usize,
    pub edges_by_type: usize,
    pub edges_by_id: usize,
    pub aggregate: usize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.describe + self.list + self.edges_by_type + self.edges_by_id + self.aggregate
    }
}

#[derive(Debug, Default)]
struct Counters {
    describe: AtomicUsize,
    list: AtomicUsize,
    edges_by_type: AtomicUsize,
    edges_by_id: AtomicUsize,
    aggregate: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Decrements the in-flight gauge when a call returns.
struct InFlight<'a>(&'a Counters);

impl<'a> InFlight<'a> {
    fn enter(counters: &'a Counters) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(counters)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A remote source that answers from memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    snapshot: SourceSnapshot,
    faults: Mutex<Faults>,
    counters: Counters,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: SourceSnapshot) -> Self {
        Self {
            snapshot,
            ..Self::default()
        }
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, FetchError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FetchError::NotFound(format!("{}: {e}", path.display())))?;
        let snapshot: SourceSnapshot =
            serde_json::from_str(&text).map_err(|e| FetchError::Malformed(e.to_string()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn snapshot(&self) -> &SourceSnapshot {
        &self.snapshot
    }

    // ── Builders ──────────────────────────────────────────────────

    /// Register a type and its inventory. Component types default to `type_name`.
    #[must_use]
    pub fn with_type(mut self, type_name: &str, components: &[(&str, &str)]) -> Self {
        if !self.snapshot.types.iter().any(|t| t == type_name) {
            self.snapshot.types.push(type_name.to_string());
        }
        let inventory = self
            .snapshot
            .components
            .entry(type_name.to_string())
            .or_default();
        for (id, name) in components {
            inventory.push(ComponentRecord::new(*id, Some(*name), Some(type_name)));
        }
        self
    }

    /// Register a type name that has no inventory (noise, system types).
    #[must_use]
    pub fn with_type_name(mut self, type_name: &str) -> Self {
        self.snapshot.types.push(type_name.to_string());
        self
    }

    /// Add an edge. Endpoint name/type are looked up in the registered inventory.
    #[must_use]
    pub fn with_edge(mut self, source_id: &str, target_id: &str) -> Self {
        let source = self.lookup(source_id);
        let target = self.lookup(target_id);
        self.snapshot
            .edges
            .push(DependencyEdgeRecord::between(&source, &target));
        self
    }

    /// Add an edge with explicit endpoint records.
    #[must_use]
    pub fn with_edge_record(mut self, edge: DependencyEdgeRecord) -> Self {
        self.snapshot.edges.push(edge);
        self
    }

    #[must_use]
    pub fn with_metric(mut self, query: MetricQuery, row: MetricRow) -> Self {
        match query {
            MetricQuery::ClassSize => self.snapshot.class_sizes.push(row),
            MetricQuery::TriggerSize => self.snapshot.trigger_sizes.push(row),
            MetricQuery::Coverage => self.snapshot.coverage.push(row),
        }
        self
    }

    fn lookup(&self, id: &str) -> ComponentRecord {
        self.snapshot
            .components
            .values()
            .flatten()
            .find(|c| c.id == id)
            .cloned()
            .unwrap_or_else(|| ComponentRecord::new(id, None, None))
    }

    // ── Fault injection ───────────────────────────────────────────

    fn faults(&self) -> std::sync::MutexGuard<'_, Faults> {
        self.faults.lock().expect("memory source mutex poisoned")
    }

    pub fn fail_describe(&self, fail: bool) {
        self.faults().describe = fail;
    }

    /// Make every by-id edge query fail with a transient error.
    pub fn fail_by_id(&self, fail: bool) {
        self.faults().by_id = fail;
    }

    /// Make any by-id edge query that asks about `id` fail.
    pub fn fail_id(&self, id: &str) {
        self.faults().ids.insert(id.to_string());
    }

    /// Make inventory and edge queries for `type_name` fail.
    pub fn fail_type(&self, type_name: &str) {
        self.faults().types.insert(type_name.to_string());
    }

    pub fn fail_metric(&self, query: MetricQuery) {
        self.faults().metrics.insert(query);
    }

    /// Hide every edge touching `id` from by-id queries, as if it were deleted.
    pub fn make_unresolvable(&self, id: &str) {
        self.faults().unresolvable.insert(id.to_string());
    }

    /// Delay inventory and edge calls for `type_name`.
    pub fn delay_type(&self, type_name: &str, delay: Duration) {
        self.faults().delays.insert(type_name.to_string(), delay);
    }

    pub fn delay_metric(&self, query: MetricQuery, delay: Duration) {
        self.faults().metric_delays.insert(query, delay);
    }

    // ── Accounting ────────────────────────────────────────────────

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            describe: self.counters.describe.load(Ordering::SeqCst),
            list: self.counters.list.load(Ordering::SeqCst),
            edges_by_type: self.counters.edges_by_type.load(Ordering::SeqCst),
            edges_by_id: self.counters.edges_by_id.load(Ordering::SeqCst),
            aggregate: self.counters.aggregate.load(Ordering::SeqCst),
        }
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }

    fn type_fault(&self, type_name: &str) -> (bool, Option<Duration>) {
        let faults = self.faults();
        (
            faults.types.contains(type_name),
            faults.delays.get(type_name).copied(),
        )
    }
}

#[async_trait::async_trait]
impl RemoteSource for MemorySource {
    async fn describe_types(&self) -> Result<Vec<TypeDescriptor>, FetchError> {
        self.counters.describe.fetch_add(1, Ordering::SeqCst);
        if self.faults().describe {
            return Err(FetchError::Transient("describe unavailable".into()));
        }
        Ok(self
            .snapshot
            .types
            .iter()
            .map(TypeDescriptor::new)
            .collect())
    }

    async fn list_components(&self, type_name: &str) -> Result<Vec<ComponentRecord>, FetchError> {
        self.counters.list.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight::enter(&self.counters);
        let (fail, delay) = self.type_fault(type_name);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(FetchError::Transient(format!("inventory of {type_name} failed")));
        }
        debug!(type_name, "serving inventory from memory");
        Ok(self
            .snapshot
            .components
            .get(type_name)
            .cloned()
            .unwrap_or_default())
    }

    async fn query_dependency_edges(
        &self,
        scope: &EdgeScope,
    ) -> Result<Vec<DependencyEdgeRecord>, FetchError> {
        let _guard = InFlight::enter(&self.counters);
        match scope {
            EdgeScope::OfType(type_name) => {
                self.counters.edges_by_type.fetch_add(1, Ordering::SeqCst);
                let (fail, delay) = self.type_fault(type_name);
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if fail {
                    return Err(FetchError::Transient(format!("edges of {type_name} failed")));
                }
                Ok(self
                    .snapshot
                    .edges
                    .iter()
                    .filter(|e| e.source_type.as_deref() == Some(type_name.as_str()))
                    .cloned()
                    .collect())
            }
            EdgeScope::ById(ids) => {
                self.counters.edges_by_id.fetch_add(1, Ordering::SeqCst);
                let faults = self.faults();
                if faults.by_id || ids.iter().any(|id| faults.ids.contains(id)) {
                    return Err(FetchError::Transient("by-id query unavailable".into()));
                }
                let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
                Ok(self
                    .snapshot
                    .edges
                    .iter()
                    .filter(|e| {
                        wanted.contains(e.source_id.as_str()) || wanted.contains(e.target_id.as_str())
                    })
                    .filter(|e| {
                        !faults.unresolvable.contains(&e.source_id)
                            && !faults.unresolvable.contains(&e.target_id)
                    })
                    .cloned()
                    .collect())
            }
        }
    }

    async fn aggregate(&self, query: MetricQuery) -> Result<Vec<MetricRow>, FetchError> {
        self.counters.aggregate.fetch_add(1, Ordering::SeqCst);
        let delay = self.faults().metric_delays.get(&query).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.faults().metrics.contains(&query) {
            return Err(FetchError::Transient(format!("{query} query failed")));
        }
        Ok(match query {
            MetricQuery::ClassSize => self.snapshot.class_sizes.clone(),
            MetricQuery::TriggerSize => self.snapshot.trigger_sizes.clone(),
            MetricQuery::Coverage => self.snapshot.coverage.clone(),
        })
    }
}
