//! memo — local, per-project persistent memory for LLM agents.

use memo_cli::{ops, render};

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memo_core::{ContainerTag, MemoConfig, MemoError, MemoResult};
use memo_identity::{ProjectIdentity, Provenance};
use memo_search::DedupVerdict;
use memo_storage::StoreEngine;

#[derive(Parser)]
#[command(name = "memo", version, about = "Local persistent memory for LLM agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert one memory.
    Add {
        text: String,
        #[arg(long)]
        container: Option<String>,
    },
    /// Import markdown files or a repo map, replacing per source.
    Import {
        #[arg(long, value_name = "PATH")]
        markdown: Option<PathBuf>,
        #[arg(long, value_name = "FILE", conflicts_with = "markdown")]
        repo_map: Option<PathBuf>,
        #[arg(long)]
        container: Option<String>,
        #[arg(long, default_value_t = 400)]
        chunk_tokens: usize,
        #[arg(long, default_value_t = 80)]
        overlap_tokens: usize,
    },
    /// Hybrid search over stored memories.
    Search {
        query: String,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        container: Option<String>,
        #[arg(long)]
        skip_vector: bool,
        #[arg(long)]
        skip_full_text: bool,
    },
    /// Recent memories, newest first.
    List {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        container: Option<String>,
    },
    /// Delete a memory by id.
    Forget {
        id: String,
        #[arg(long)]
        container: Option<String>,
    },
    /// Drop this project's database.
    Reset,
    /// Repair the full-text index.
    Reindex,
    /// Show model, store, and threshold information.
    Status,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        if !matches!(e, MemoError::InvalidInput(_)) {
            tracing::error!(error = %e, "command failed");
        }
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> MemoResult<()> {
    let config = MemoConfig::load()?;
    let cwd = std::env::current_dir()?;
    let identity = ProjectIdentity::discover(&cwd);

    match cli.command {
        Command::Reset => {
            let db = identity.db_path();
            if !db.exists() {
                println!("nothing to reset at {}", db.display());
                return Ok(());
            }
            StoreEngine::reset_path(&db)?;
            println!("removed {}", db.display());
            return Ok(());
        }
        Command::Reindex => {
            let store = StoreEngine::open(&identity.db_path(), &config)?;
            let outcome = ops::reindex(&store)?;
            println!("reindexed: {} added, {} removed", outcome.added, outcome.removed);
            store.close()?;
            return Ok(());
        }
        Command::Status => {
            let store = StoreEngine::open(&identity.db_path(), &config)?;
            let report = ops::status(&store, &config, &identity)?;
            print_status(&report);
            store.close()?;
            return Ok(());
        }
        _ => {}
    }

    let store = StoreEngine::open(&identity.db_path(), &config)?;
    let embedder = memo_embeddings::global(&config);
    let provenance = Provenance::gather(&cwd, &identity);

    match cli.command {
        Command::Add { text, container } => {
            let container = resolve_container(container.as_deref(), &identity)?;
            let outcome = ops::add(&store, &embedder, &config, &container, &provenance, &text)
                .await?;
            match outcome {
                ops::AddOutcome::Stored { id } => println!("stored {id}"),
                ops::AddOutcome::Skipped { verdict } => match verdict {
                    DedupVerdict::ExactDuplicate { id } => {
                        println!("skipped: exact duplicate of {id} (similarity=1.000)");
                    }
                    DedupVerdict::NearDuplicate { id, similarity } => {
                        println!("skipped: near duplicate of {id} (similarity={similarity:.3})");
                    }
                    DedupVerdict::NotDuplicate => unreachable!("skip implies duplicate"),
                },
            }
        }
        Command::Import {
            markdown,
            repo_map,
            container,
            chunk_tokens,
            overlap_tokens,
        } => {
            let container = resolve_container(container.as_deref(), &identity)?;
            let outcome = ops::import(
                &store,
                &embedder,
                &container,
                &provenance,
                markdown.as_ref(),
                repo_map.as_ref(),
                chunk_tokens,
                overlap_tokens,
            )
            .await?;
            println!(
                "imported {} source(s): {} records inserted, {} replaced",
                outcome.sources, outcome.inserted, outcome.deleted
            );
        }
        Command::Search {
            query,
            limit,
            threshold,
            container,
            skip_vector,
            skip_full_text,
        } => {
            let container = resolve_container(container.as_deref(), &identity)?;
            let results = ops::search(
                &store,
                &embedder,
                &config,
                &query,
                limit,
                threshold,
                Some(&container),
                skip_vector,
                skip_full_text,
            )
            .await?;
            println!("{}", render::render_results(&results));
        }
        Command::List {
            limit,
            all,
            container,
        } => {
            let container = resolve_container(container.as_deref(), &identity)?;
            let records = ops::list(&store, &config, limit, all, Some(&container))?;
            if records.is_empty() {
                println!("no memories");
            } else {
                let rendered: Vec<String> =
                    records.iter().map(render::render_record).collect();
                println!("{}", rendered.join("\n\n"));
            }
        }
        Command::Forget { id, container } => {
            let container = container
                .as_deref()
                .map(|name| ContainerTag::named(name))
                .transpose()?;
            ops::forget(&store, &id, container.as_ref())?;
            println!("forgot {id}");
        }
        Command::Reset | Command::Reindex | Command::Status => unreachable!("handled above"),
    }

    store.close()?;
    Ok(())
}

/// `--container <name>` when given, the project container otherwise.
fn resolve_container(
    name: Option<&str>,
    identity: &ProjectIdentity,
) -> MemoResult<ContainerTag> {
    match name {
        Some(name) => ContainerTag::named(name),
        None => Ok(identity.container_tag()),
    }
}

fn print_status(report: &ops::StatusReport) {
    println!("model:      {} ({} dims)", report.model, report.dimensions);
    println!("database:   {}", report.db_path.display());
    println!("records:    {}", report.record_count);
    for (container, count) in &report.counts_by_container {
        println!("  {container}: {count}");
    }
    println!("cached embeddings: {}", report.cached_embeddings);
    println!(
        "thresholds: similarity={}, vector-gate={}, dedup={}",
        report.similarity_threshold, report.min_vector_similarity, report.dedup_threshold
    );
}
