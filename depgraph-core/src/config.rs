use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level depgraph configuration, matching `depgraph.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepgraphConfig {
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub harvest: HarvestSection,
    #[serde(default)]
    pub repair: RepairSection,
    #[serde(default)]
    pub catalog: CatalogSection,
    #[serde(default)]
    pub store: StoreSection,
}

impl DepgraphConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.display().to_string()))?;
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a sync or repair meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.harvest.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "harvest.concurrency must be at least 1".into(),
            ));
        }
        if self.harvest.id_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "harvest.id_chunk_size must be at least 1".into(),
            ));
        }
        if self.repair.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "repair.batch_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    /// Base URL of the remote org, e.g. `https://example.my.salesforce.com`.
    pub instance_url: String,
    pub api_version: String,
    /// Environment variable holding the bearer token.
    pub token_env: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            instance_url: String::new(),
            api_version: "59.0".to_string(),
            token_env: "DEPGRAPH_TOKEN".to_string(),
            timeout_secs: 30,
            max_retries: 5,
        }
    }
}

impl SourceSection {
    pub fn require_instance_url(&self) -> Result<&str, ConfigError> {
        let url = self.instance_url.trim_end_matches('/');
        if url.is_empty() {
            return Err(ConfigError::Invalid("source.instance_url is not set".into()));
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSection {
    /// Maximum in-flight remote calls.
    pub concurrency: usize,
    /// Per-call deadline; a call that exceeds it degrades to empty.
    pub call_timeout_secs: u64,
    /// Ids per by-id edge query.
    pub id_chunk_size: usize,
}

impl Default for HarvestSection {
    fn default() -> Self {
        Self {
            concurrency: 8,
            call_timeout_secs: 60,
            id_chunk_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairSection {
    pub batch_size: usize,
}

impl Default for RepairSection {
    fn default() -> Self {
        Self { batch_size: 20 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSection {
    /// Type names dropped in addition to the built-in blocklist.
    pub extra_blocklist: Vec<String>,
    /// Name suffixes dropped in addition to the built-in noise suffixes.
    pub extra_suffixes: Vec<String>,
    /// When non-empty, only these types are harvested.
    pub include: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("depgraph.db"),
        }
    }
}
