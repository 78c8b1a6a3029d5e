use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Remote record shapes ──────────────────────────────────────────

/// A component type name reported by the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One component as seen in an inventory listing, an edge endpoint, or a
/// repair lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ComponentRecord {
    pub fn new(id: impl Into<String>, name: Option<&str>, kind: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            kind: kind.map(str::to_string),
        }
    }
}

/// A directed dependency as reported by the remote source, with both
/// endpoints' display fields as known at fetch time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdgeRecord {
    pub source_id: String,
    pub source_name: Option<String>,
    pub source_type: Option<String>,
    pub target_id: String,
    pub target_name: Option<String>,
    pub target_type: Option<String>,
}

impl DependencyEdgeRecord {
    pub fn between(source: &ComponentRecord, target: &ComponentRecord) -> Self {
        Self {
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            source_type: source.kind.clone(),
            target_id: target.id.clone(),
            target_name: target.name.clone(),
            target_type: target.kind.clone(),
        }
    }

    pub fn source(&self) -> ComponentRecord {
        ComponentRecord {
            id: self.source_id.clone(),
            name: self.source_name.clone(),
            kind: self.source_type.clone(),
        }
    }

    pub fn target(&self) -> ComponentRecord {
        ComponentRecord {
            id: self.target_id.clone(),
            name: self.target_name.clone(),
            kind: self.target_type.clone(),
        }
    }

    /// Both endpoints carry a non-empty id.
    pub fn is_complete(&self) -> bool {
        !self.source_id.is_empty() && !self.target_id.is_empty()
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }
}

/// Which dependency relations to ask the remote for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeScope {
    /// Every edge whose source component has this type.
    OfType(String),
    /// Every edge whose source or target is one of these ids.
    ById(Vec<String>),
}

impl std::fmt::Display for EdgeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OfType(name) => write!(f, "type:{name}"),
            Self::ById(ids) => match ids.as_slice() {
                [one] => write!(f, "id:{one}"),
                _ => write!(f, "ids:{}", ids.len()),
            },
        }
    }
}

/// Auxiliary aggregate queries used to enrich component rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricQuery {
    /// Source length of class-like components.
    ClassSize,
    /// Source length of trigger-like components.
    TriggerSize,
    /// Covered/uncovered line counts per component.
    Coverage,
}

impl MetricQuery {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClassSize => "class_size",
            Self::TriggerSize => "trigger_size",
            Self::Coverage => "coverage",
        }
    }
}

impl std::fmt::Display for MetricQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single aggregate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Size(i64),
    Lines { covered: i64, uncovered: i64 },
}

/// One `{id, metric}` row from an aggregate query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricRow {
    pub id: String,
    pub metric: Metric,
}

// ── Stored shapes ─────────────────────────────────────────────────

/// Size/coverage update for one component. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentStats {
    pub id: String,
    pub size: Option<i64>,
    pub coverage: Option<i64>,
}

/// A row of the `components` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub size: Option<i64>,
    pub coverage: Option<i64>,
}

/// An edge joined with whatever the store knows about its endpoints.
///
/// Name/type prefer the node row and fall back to the copies taken at
/// harvest time. Stats only come from node rows, so a dangling endpoint
/// has null stats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeView {
    pub source_id: String,
    pub source_name: Option<String>,
    pub source_type: Option<String>,
    pub source_size: Option<i64>,
    pub source_coverage: Option<i64>,
    pub target_id: String,
    pub target_name: Option<String>,
    pub target_type: Option<String>,
    pub target_size: Option<i64>,
    pub target_coverage: Option<i64>,
}

impl EdgeView {
    /// Lift a remote record into a view with no stats attached.
    pub fn from_record(record: &DependencyEdgeRecord) -> Self {
        Self {
            source_id: record.source_id.clone(),
            source_name: record.source_name.clone(),
            source_type: record.source_type.clone(),
            source_size: None,
            source_coverage: None,
            target_id: record.target_id.clone(),
            target_name: record.target_name.clone(),
            target_type: record.target_type.clone(),
            target_size: None,
            target_coverage: None,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }
}

// ── Query modes and reports ───────────────────────────────────────

/// Where `DependencyResolver` reads edges from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveMode {
    /// Read persisted edges from the store.
    #[default]
    Local,
    /// Ask the remote source directly; the store is read-only.
    Live,
}

impl std::str::FromStr for ResolveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "live" => Ok(Self::Live),
            other => Err(format!("unknown resolve mode: {other}")),
        }
    }
}

/// Outcome of a repair run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    /// Dangling ids found before the run.
    pub missing: usize,
    /// Ids that now have a node row.
    pub resolved: Vec<String>,
    /// Ids the remote could not resolve; they stay dangling.
    pub unresolved: Vec<String>,
    /// Batches attempted.
    pub batches: usize,
    /// Remote calls issued.
    pub remote_calls: usize,
}

/// Outcome of a full sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub types_discovered: usize,
    pub components_seen: usize,
    pub components_inserted: u64,
    pub edges_seen: usize,
    pub edges_inserted: u64,
    pub stats_applied: u64,
    /// Scopes whose fetch failed and contributed nothing.
    pub failed_scopes: Vec<String>,
    pub duration: Duration,
}

/// Metadata persisted for the most recent sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRun {
    pub run_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub components: u64,
    pub edges: u64,
    pub failed_scopes: usize,
}

/// Summary statistics about the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_components: u64,
    pub total_edges: u64,
    pub dangling_ids: u64,
    pub components_by_type: HashMap<String, u64>,
    pub db_size_bytes: u64,
}
