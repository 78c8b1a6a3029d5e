use clap::Parser;

use depgraph_core::error::DepgraphError;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "depgraph",
    version,
    about = "Harvest, repair and query a component dependency graph"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Map an error to the process exit code.
///
///   0: success
///   1: general/unknown error
///   2: configuration error
///   4: database error
///   5: remote API error (fetch failure, failed discovery, failed repair batch)
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<DepgraphError>() {
            return match e {
                DepgraphError::Config(_) => 2,
                DepgraphError::Store(_) => 4,
                DepgraphError::Fetch(_) | DepgraphError::Catalog(_) | DepgraphError::Repair(_) => 5,
            };
        }
    }

    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("config") {
        2
    } else if lower.contains("database") || lower.contains("sqlite") {
        4
    } else if lower.contains("remote api") || lower.contains("snapshot") || lower.contains("rate limit") {
        5
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(commands::run(cli.command, cli.quiet)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use depgraph_core::error::{ConfigError, FetchError, StoreError};

    use super::*;

    #[test]
    fn exit_code_typed_config() {
        let err = anyhow::Error::from(DepgraphError::Config(ConfigError::Invalid("x".into())));
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_typed_store_behind_context() {
        let err = anyhow::Error::from(DepgraphError::Store(StoreError::Migration("v0".into())))
            .context("Cannot open database: graph.db");
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_typed_fetch() {
        let err = anyhow::Error::from(DepgraphError::Fetch(FetchError::Api {
            status: 401,
            body: "INVALID_SESSION_ID".into(),
        }));
        assert_eq!(classify_exit_code(&err), 5);
    }

    #[test]
    fn exit_code_config_message() {
        let err = anyhow::anyhow!("Cannot parse config: bad toml");
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_database_message() {
        let err = anyhow::anyhow!("Database not found: depgraph.db");
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_general() {
        let err = anyhow::anyhow!("Something unexpected happened");
        assert_eq!(classify_exit_code(&err), 1);
    }
}
