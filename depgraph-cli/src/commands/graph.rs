use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use depgraph_core::query;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Drop edges from a component to itself
    #[arg(long)]
    pub no_self_loops: bool,

    /// Write the JSON to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub async fn run(args: GraphArgs) -> anyhow::Result<()> {
    let config = args.store.load_config()?;
    let store = args.store.open_existing_store(&config)?;

    let mut graph = query::load_graph(&store).await?;
    if args.no_self_loops {
        graph = graph.without_self_loops();
    }

    match &args.output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&graph).context("Cannot serialize graph")?;
            std::fs::write(path, json)
                .with_context(|| format!("Cannot write graph: {}", path.display()))?;
            eprintln!(
                "Wrote {} nodes and {} edges to {}",
                graph.nodes.len(),
                graph.edges.len(),
                path.display()
            );
        }
        None => super::print_json(&graph)?,
    }
    Ok(())
}
