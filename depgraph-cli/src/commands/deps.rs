use anyhow::Context;
use clap::Args;

use depgraph_core::query;
use depgraph_core::resolve::DependencyResolver;
use depgraph_core::store::SqliteStore;
use depgraph_core::types::{EdgeView, ResolveMode};

use super::{Format, SourceArgs, StoreArgs, or_dash};

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Component id (a name is accepted when it matches a stored component)
    pub component: String,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Ask the remote directly instead of reading stored edges
    #[arg(long)]
    pub live: bool,

    /// Hide edges from a component to itself
    #[arg(long)]
    pub no_self_loops: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: Format,
}

pub async fn run(args: DepsArgs) -> anyhow::Result<()> {
    let config = args.store.load_config()?;
    // Live lookups never write, so a missing database is not created here;
    // they just go without local stats.
    let store = if args.live && !args.store.db_path(&config).exists() {
        SqliteStore::in_memory().context("Cannot open scratch database")?
    } else {
        args.store.open_existing_store(&config)?
    };

    let id = query::find_component(&store, &args.component)
        .await?
        .map_or_else(|| args.component.clone(), |c| c.id);

    let resolver = DependencyResolver::new(&store).include_self_loops(!args.no_self_loops);
    let edges = if args.live {
        let source = args.source.build(&config)?;
        let harvester = super::harvester(source, &config, true);
        resolver
            .with_remote(&harvester)
            .resolve(&id, ResolveMode::Live)
            .await
            .with_context(|| format!("Live lookup failed for {id}"))?
    } else {
        resolver.resolve(&id, ResolveMode::Local).await?
    };

    if args.format == Format::Json {
        return super::print_json(&edges);
    }
    print_edges(&id, &edges);
    Ok(())
}

fn print_edges(id: &str, edges: &[EdgeView]) {
    let (outgoing, incoming): (Vec<&EdgeView>, Vec<&EdgeView>) =
        edges.iter().partition(|e| e.source_id == id);

    println!("Dependencies of {id}");
    println!();
    println!("  Uses ({}):", outgoing.len());
    for e in &outgoing {
        println!(
            "    {:<20} {:<24} {}{}",
            e.target_id,
            or_dash(e.target_type.as_deref()),
            or_dash(e.target_name.as_deref()),
            stats_suffix(e.target_size, e.target_coverage)
        );
    }
    println!();
    println!("  Used by ({}):", incoming.len());
    for e in &incoming {
        println!(
            "    {:<20} {:<24} {}{}",
            e.source_id,
            or_dash(e.source_type.as_deref()),
            or_dash(e.source_name.as_deref()),
            stats_suffix(e.source_size, e.source_coverage)
        );
    }
}

fn stats_suffix(size: Option<i64>, coverage: Option<i64>) -> String {
    match (size, coverage) {
        (None, None) => String::new(),
        (Some(s), None) => format!("  [size {s}]"),
        (None, Some(c)) => format!("  [coverage {c}%]"),
        (Some(s), Some(c)) => format!("  [size {s}, coverage {c}%]"),
    }
}
