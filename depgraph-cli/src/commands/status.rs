#![allow(clippy::cast_precision_loss)]

use clap::Args;

use depgraph_core::store::GraphStore;

use super::StoreArgs;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let config = args.store.load_config()?;
    let store = args.store.open_existing_store(&config)?;
    let stats = store.stats().await?;
    let db_path = args.store.db_path(&config);

    println!("depgraph status");
    println!();
    println!("  Database: {}", db_path.display());
    if stats.db_size_bytes > 0 {
        println!("  Size:     {}", format_bytes(stats.db_size_bytes));
    }
    println!();

    println!("  Components: {} total", stats.total_components);
    if !stats.components_by_type.is_empty() {
        let mut types: Vec<_> = stats.components_by_type.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (kind, count) in &types {
            println!("    {kind:<28} {count:>6}");
        }
    }
    println!();
    println!("  Edges:    {} total", stats.total_edges);
    println!("  Dangling: {}", stats.dangling_ids);
    if stats.dangling_ids > 0 {
        println!("            run `depgraph repair` to backfill them");
    }
    println!();

    match store.last_sync().await? {
        Some(run) => {
            println!("  Last sync: {} (run {})", run.finished_at.to_rfc3339(), run.run_id);
            println!(
                "             {} new components, {} new edges, {} failed scope(s)",
                run.components, run.edges, run.failed_scopes
            );
        }
        None => println!("  Last sync: never"),
    }
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
