use clap::Args;

use depgraph_core::store::{GraphStore, SEARCH_LIMIT};

use super::{Format, StoreArgs, or_dash};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Substring to match against component names and ids (case-insensitive)
    pub term: String,

    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, value_enum, default_value_t)]
    pub format: Format,
}

pub async fn run(args: SearchArgs) -> anyhow::Result<()> {
    let config = args.store.load_config()?;
    let store = args.store.open_existing_store(&config)?;
    let hits = store.search_nodes(&args.term).await?;

    if args.format == Format::Json {
        return super::print_json(&hits);
    }

    if hits.is_empty() {
        println!("No components match \"{}\"", args.term);
        return Ok(());
    }
    for hit in &hits {
        println!(
            "{:<20} {:<24} {}",
            hit.id,
            or_dash(hit.kind.as_deref()),
            or_dash(hit.name.as_deref())
        );
    }
    if hits.len() == SEARCH_LIMIT {
        println!("(showing the first {SEARCH_LIMIT} matches)");
    }
    Ok(())
}
