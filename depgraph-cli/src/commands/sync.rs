use anyhow::Context;
use clap::Args;
use tracing::info;

use depgraph_core::catalog::TypeCatalog;
use depgraph_core::pipeline::{SyncOptions, SyncPipeline};
use depgraph_core::repair::ConsistencyRepairer;
use depgraph_core::types::SyncReport;

use super::{Format, SourceArgs, StoreArgs};

#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct SyncArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Clear the store before harvesting
    #[arg(long)]
    pub fresh: bool,

    /// Skip the size/coverage queries
    #[arg(long)]
    pub skip_stats: bool,

    /// Skip dependency harvesting (inventory only)
    #[arg(long)]
    pub skip_edges: bool,

    /// Run a repair pass after the sync
    #[arg(long)]
    pub repair: bool,

    /// Maximum in-flight remote calls (overrides harvest.concurrency)
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long, value_enum, default_value_t)]
    pub format: Format,
}

pub async fn run(args: SyncArgs, quiet: bool) -> anyhow::Result<()> {
    let mut config = args.store.load_config()?;
    if let Some(limit) = args.concurrency {
        config.harvest.concurrency = limit;
    }
    config.validate().context("Invalid config")?;

    let source = args.source.build(&config)?;
    let store = args.store.open_store(&config)?;
    let harvester = super::harvester(source, &config, quiet);

    let pipeline = SyncPipeline::new(&store, harvester, TypeCatalog::new(&config.catalog));
    let report = pipeline
        .run(SyncOptions {
            fresh: args.fresh,
            skip_stats: args.skip_stats,
            skip_edges: args.skip_edges,
        })
        .await
        .context("Sync failed")?;

    let repair = if args.repair {
        info!("Running repair after sync");
        let report = ConsistencyRepairer::new(&store, &config.repair)
            .repair(pipeline.harvester())
            .await
            .context("Repair after sync failed")?;
        Some(report)
    } else {
        None
    };

    match args.format {
        Format::Json => super::print_json(&serde_json::json!({
            "sync": report,
            "repair": repair,
        }))?,
        Format::Text if !quiet => {
            print_report(&report);
            if let Some(repair) = &repair {
                super::repair::print_report(repair);
            }
        }
        Format::Text => {}
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    println!(
        "Sync complete in {:.1}s (run {})",
        report.duration.as_secs_f64(),
        report.run_id
    );
    println!();
    println!("  Types:      {}", report.types_discovered);
    println!(
        "  Components: {} seen, {} new",
        report.components_seen, report.components_inserted
    );
    println!(
        "  Edges:      {} seen, {} new",
        report.edges_seen, report.edges_inserted
    );
    println!("  Stats:      {} applied", report.stats_applied);
    if !report.failed_scopes.is_empty() {
        println!();
        println!("  Failed scopes ({}):", report.failed_scopes.len());
        for scope in &report.failed_scopes {
            println!("    {scope}");
        }
    }
}
