pub mod deps;
pub mod graph;
pub mod repair;
pub mod search;
pub mod status;
pub mod sync;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Subcommand};

use depgraph_core::config::DepgraphConfig;
use depgraph_core::harvest::Harvester;
use depgraph_core::progress::{IndicatifReporter, ProgressReporter};
use depgraph_core::source::{MemorySource, RemoteSource, ToolingSource};
use depgraph_core::store::SqliteStore;

const DEFAULT_CONFIG: &str = "depgraph.toml";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest types, components, stats and dependencies into the local store
    Sync(sync::SyncArgs),
    /// Backfill components referenced by edges but missing from the store
    Repair(repair::RepairArgs),
    /// Search stored components by name or id
    Search(search::SearchArgs),
    /// Show the dependencies touching one component
    Deps(deps::DepsArgs),
    /// Export the stored graph as JSON
    Graph(graph::GraphArgs),
    /// Show store statistics and the last sync
    Status(status::StatusArgs),
}

pub async fn run(cmd: Command, quiet: bool) -> anyhow::Result<()> {
    match cmd {
        Command::Sync(args) => sync::run(args, quiet).await,
        Command::Repair(args) => repair::run(args, quiet).await,
        Command::Search(args) => search::run(args).await,
        Command::Deps(args) => deps::run(args).await,
        Command::Graph(args) => graph::run(args).await,
        Command::Status(args) => status::run(args).await,
    }
}

/// Where to find the config and the database.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Config file (default: ./depgraph.toml when present)
    #[arg(long, env = "DEPGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database path (overrides store.path from the config)
    #[arg(long, env = "DEPGRAPH_DB")]
    pub db: Option<PathBuf>,
}

/// Where remote data comes from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Read a JSON snapshot instead of calling the remote API
    #[arg(long, value_name = "SNAPSHOT")]
    pub from_file: Option<PathBuf>,
}

impl StoreArgs {
    /// Load the explicit config, else `./depgraph.toml` if it exists, else defaults.
    pub fn load_config(&self) -> anyhow::Result<DepgraphConfig> {
        if let Some(path) = &self.config {
            return DepgraphConfig::load(path)
                .with_context(|| format!("Cannot load config: {}", path.display()));
        }
        let default = Path::new(DEFAULT_CONFIG);
        if default.exists() {
            return DepgraphConfig::load(default)
                .with_context(|| format!("Cannot load config: {}", default.display()));
        }
        Ok(DepgraphConfig::default())
    }

    pub fn db_path(&self, config: &DepgraphConfig) -> PathBuf {
        self.db.clone().unwrap_or_else(|| config.store.path.clone())
    }

    /// Open (creating if needed) the store.
    pub fn open_store(&self, config: &DepgraphConfig) -> anyhow::Result<SqliteStore> {
        let db_path = self.db_path(config);
        SqliteStore::open(&db_path)
            .with_context(|| format!("Cannot open database: {}", db_path.display()))
    }

    /// Open a store that must already exist (read-only commands).
    pub fn open_existing_store(&self, config: &DepgraphConfig) -> anyhow::Result<SqliteStore> {
        let db_path = self.db_path(config);
        if !db_path.exists() {
            anyhow::bail!(
                "Database not found: {}. Run `depgraph sync` first.",
                db_path.display()
            );
        }
        self.open_store(config)
    }
}

impl SourceArgs {
    pub fn build(&self, config: &DepgraphConfig) -> anyhow::Result<Arc<dyn RemoteSource>> {
        if let Some(path) = &self.from_file {
            let source = MemorySource::load(path)
                .with_context(|| format!("Cannot read snapshot: {}", path.display()))?;
            return Ok(Arc::new(source));
        }
        let source = ToolingSource::from_config(&config.source)
            .context("Cannot configure remote source")?;
        Ok(Arc::new(source))
    }
}

pub fn harvester(
    source: Arc<dyn RemoteSource>,
    config: &DepgraphConfig,
    quiet: bool,
) -> Harvester {
    let reporter: Arc<dyn ProgressReporter> = if quiet {
        Arc::new(IndicatifReporter::hidden())
    } else {
        Arc::new(IndicatifReporter::new())
    };
    Harvester::new(source, &config.harvest).with_reporter(reporter)
}

/// Output format shared by the query commands.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Text,
    Json,
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Cannot serialize output")?;
    println!("{json}");
    Ok(())
}

pub fn or_dash(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
