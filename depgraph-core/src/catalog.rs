// Type discovery: which component types are worth harvesting.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::config::CatalogSection;
use crate::error::DepgraphError;
use crate::source::RemoteSource;
use crate::types::TypeDescriptor;

/// Account/user/org-level system types that never carry component dependencies.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "Account",
    "User",
    "Organization",
    "Group",
    "Profile",
    "PermissionSet",
    "UserRole",
];

/// Name suffixes marking history/sharing/feed shadow types.
pub const NOISE_SUFFIXES: &[&str] = &["History", "Share", "Feed"];

/// Discovers and filters harvestable type names.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    blocklist: HashSet<String>,
    suffixes: Vec<String>,
    include: HashSet<String>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new(&CatalogSection::default())
    }
}

impl TypeCatalog {
    pub fn new(config: &CatalogSection) -> Self {
        let lower = |s: &String| s.to_ascii_lowercase();
        Self {
            blocklist: DEFAULT_BLOCKLIST
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .chain(config.extra_blocklist.iter().map(lower))
                .collect(),
            suffixes: NOISE_SUFFIXES
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .chain(config.extra_suffixes.iter().map(lower))
                .collect(),
            include: config.include.iter().map(lower).collect(),
        }
    }

    /// Ask the remote for every type name and keep the harvestable ones.
    ///
    /// A failed describe call is fatal: there is nothing to harvest without it.
    pub async fn discover(
        &self,
        source: &dyn RemoteSource,
    ) -> crate::error::Result<Vec<TypeDescriptor>> {
        let all = source
            .describe_types()
            .await
            .map_err(DepgraphError::Catalog)?;
        let total = all.len();
        let kept = self.filter(all);
        info!(total, kept = kept.len(), "Type discovery complete");
        Ok(kept)
    }

    /// Apply blocklist, suffix and allowlist rules; collapse duplicates.
    pub fn filter(&self, types: Vec<TypeDescriptor>) -> Vec<TypeDescriptor> {
        let mut seen = HashSet::new();
        types
            .into_iter()
            .filter(|t| {
                let keep = self.accepts(&t.name);
                if !keep {
                    debug!(type_name = %t.name, "Skipping type");
                }
                keep
            })
            .filter(|t| seen.insert(t.name.clone()))
            .collect()
    }

    pub fn accepts(&self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let lower = name.to_ascii_lowercase();
        if !self.include.is_empty() && !self.include.contains(&lower) {
            return false;
        }
        if self.blocklist.contains(&lower) {
            return false;
        }
        !self.suffixes.iter().any(|suffix| lower.ends_with(suffix.as_str()))
    }
}
