//! Thin command-line surface over the epithet library crates. All real
//! logic lives in `epithet-core` / `epithet-store`; this binary parses
//! arguments, wires up the Elasticsearch client, and prints outcomes.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use epithet_cluster::{ClusterClient, EsCluster};
use epithet_core::{AliasConfig, RoutingKey};
use epithet_store::{EnforceStatus, Reindexer, SchemaStore, UpdateOutcome};

#[derive(Parser, Debug)]
#[command(
    name = "epithet",
    version,
    about = "Declarative alias and index lifecycle management for a search cluster",
    arg_required_else_help = true
)]
struct Cli {
    /// Search cluster URL.
    #[arg(long, global = true, default_value = "http://localhost:9200", value_name = "URL")]
    host: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a declared config file and write the schema if it changed.
    Update {
        /// Path to a JSON config file.
        config: PathBuf,
    },

    /// Direct structural edits to the schema (bypass the compiler).
    Index {
        #[command(subcommand)]
        command: IndexCommand,
    },

    /// Push the current schema to the cluster.
    Enforce,

    /// Copy every document from INDEX to INDEX_new, pacing scroll pages.
    Reindex {
        index: String,
        /// Seconds to sleep between scroll pages.
        scroll_sleep_secs: f64,
    },

    /// Swap aliases from INDEX to INDEX_new and enforce the result.
    ReindexCutover { index: String },

    /// Merge a mapping for one document type into an index.
    PutMapping {
        index: String,
        doc_type: String,
        /// Mapping document as inline JSON.
        mapping: String,
    },
}

#[derive(Subcommand, Debug)]
enum IndexCommand {
    /// Add an index to an alias, creating the schema record if needed.
    Add {
        alias: String,
        index: String,
        routing: String,
    },
    /// Remove an index from the schema and from every alias.
    Remove { index: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("epithet=info")),
        )
        .init();

    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    let cluster: Arc<dyn ClusterClient> = Arc::new(EsCluster::connect(&cli.host)?);
    let store = SchemaStore::new(Arc::clone(&cluster));

    match cli.command {
        Command::Update { config } => {
            let raw = fs::read_to_string(&config)?;
            let config: AliasConfig = serde_json::from_str(&raw)?;
            match store.update(&config).await? {
                UpdateOutcome::Unchanged => println!("schema unchanged"),
                UpdateOutcome::Applied { version } => println!("schema advanced to version {version}"),
            }
        }
        Command::Index { command } => match command {
            IndexCommand::Add {
                alias,
                index,
                routing,
            } => {
                let meta = store
                    .add_index(&alias, &index, Some(RoutingKey::parse(&routing)))
                    .await?;
                println!("added {index} to {alias} (version {})", meta.version);
            }
            IndexCommand::Remove { index } => {
                let meta = store.remove_index(&index).await?;
                println!("removed {index} (version {})", meta.version);
            }
        },
        Command::Enforce => {
            return Ok(report_enforcement(store.enforce().await));
        }
        Command::Reindex {
            index,
            scroll_sleep_secs,
        } => {
            let target = format!("{index}_new");
            let reindexer = Reindexer::new(Arc::clone(&cluster));
            let report = reindexer
                .reindex(&index, &target, Duration::from_secs_f64(scroll_sleep_secs))
                .await?;
            println!(
                "copied {} documents in {} pages ({} failures)",
                report.docs_copied,
                report.pages,
                report.failures.len()
            );
            if !report.is_clean() {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::ReindexCutover { index } => {
            return Ok(report_enforcement(store.reindex_cutover(&index).await?));
        }
        Command::PutMapping {
            index,
            doc_type,
            mapping,
        } => {
            let mapping: serde_json::Value = serde_json::from_str(&mapping)?;
            cluster.put_mapping(&index, &doc_type, &mapping).await?;
            println!("mapping for {index}/{doc_type} applied");
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report_enforcement(status: EnforceStatus) -> ExitCode {
    match status {
        EnforceStatus::Applied(stats) => {
            println!(
                "enforced: {} indexes created, {} alias updates, {} templates, {} settings groups",
                stats.indexes_created,
                stats.alias_updates,
                stats.templates_put,
                stats.settings_applied
            );
            ExitCode::SUCCESS
        }
        EnforceStatus::Failed { reason } => {
            eprintln!("enforcement failed: {reason}");
            ExitCode::FAILURE
        }
    }
}
