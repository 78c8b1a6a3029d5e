//! The remote metadata source the harvester reads from.
//!
//! [`RemoteSource`] is the only seam between the core and the network.
//! [`tooling::ToolingSource`] speaks a query-over-HTTP API;
//! [`memory::MemorySource`] serves a JSON snapshot and is what tests drive.

pub mod memory;
pub mod tooling;

use crate::error::FetchError;
use crate::types::{
    ComponentRecord, DependencyEdgeRecord, EdgeScope, MetricQuery, MetricRow, TypeDescriptor,
};

pub use memory::MemorySource;
pub use tooling::ToolingSource;

/// Operations the remote metadata source must expose.
///
/// Every method is a single logical call: implementations handle paging and
/// retries internally and return either the full result or one error.
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync + std::fmt::Debug {
    /// All type names known to the source, unfiltered.
    async fn describe_types(&self) -> Result<Vec<TypeDescriptor>, FetchError>;

    /// Inventory of one type. May fail independently per type.
    async fn list_components(&self, type_name: &str) -> Result<Vec<ComponentRecord>, FetchError>;

    /// Dependency edges within `scope`.
    async fn query_dependency_edges(
        &self,
        scope: &EdgeScope,
    ) -> Result<Vec<DependencyEdgeRecord>, FetchError>;

    /// One auxiliary aggregate query.
    async fn aggregate(&self, query: MetricQuery) -> Result<Vec<MetricRow>, FetchError>;
}
