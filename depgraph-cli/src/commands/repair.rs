use anyhow::Context;
use clap::Args;

use depgraph_core::error::{DepgraphError, RepairError};
use depgraph_core::repair::ConsistencyRepairer;
use depgraph_core::types::RepairReport;

use super::{Format, SourceArgs, StoreArgs};

#[derive(Args, Debug)]
pub struct RepairArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Ids per repair batch (overrides repair.batch_size)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Only list dangling ids, do not contact the remote
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: Format,
}

pub async fn run(args: RepairArgs, quiet: bool) -> anyhow::Result<()> {
    let mut config = args.store.load_config()?;
    if let Some(size) = args.batch_size {
        config.repair.batch_size = size;
    }
    config.validate().context("Invalid config")?;

    let store = args.store.open_existing_store(&config)?;
    let repairer = ConsistencyRepairer::new(&store, &config.repair);

    if args.dry_run {
        let dangling = repairer.find_dangling_ids().await?;
        match args.format {
            Format::Json => super::print_json(&dangling)?,
            Format::Text => {
                println!("{} dangling id(s)", dangling.len());
                for id in &dangling {
                    println!("  {id}");
                }
            }
        }
        return Ok(());
    }

    let source = args.source.build(&config)?;
    let harvester = super::harvester(source, &config, quiet);

    let report = match repairer.repair(&harvester).await {
        Ok(report) => report,
        Err(DepgraphError::Repair(RepairError::BatchFailed { batch, source, partial })) => {
            match args.format {
                Format::Json => super::print_json(&partial)?,
                Format::Text if !quiet => print_report(&partial),
                Format::Text => {}
            }
            return Err(anyhow::Error::new(DepgraphError::Fetch(source))
                .context(format!("Repair stopped at batch {batch}; earlier batches were kept")));
        }
        Err(e) => return Err(e).context("Repair failed"),
    };

    match args.format {
        Format::Json => super::print_json(&report)?,
        Format::Text if !quiet => print_report(&report),
        Format::Text => {}
    }
    Ok(())
}

pub fn print_report(report: &RepairReport) {
    println!(
        "Repair: {} missing, {} resolved, {} unresolved ({} batch(es), {} remote call(s))",
        report.missing,
        report.resolved.len(),
        report.unresolved.len(),
        report.batches,
        report.remote_calls
    );
    for id in &report.unresolved {
        println!("  unresolved: {id}");
    }
}
