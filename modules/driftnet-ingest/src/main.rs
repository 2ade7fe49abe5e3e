use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use driftnet_common::{load_config, AppConfig, RawWebPage, RecordId, StoreKind};
use driftnet_ingest::{build_renderer, Extractor, Ingestor};
use driftnet_store::{mirror_missing, open_store, RecordStore, StoreBackend};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "driftnet", about = "Idempotent web page ingestion")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an ingestion batch described by a TOML file
    Ingest {
        /// Path to batch config
        #[arg(long, default_value = "./config/driftnet.toml")]
        config: PathBuf,
    },

    /// List record ids in an index
    List(IndexArgs),

    /// Count records in an index
    Count(IndexArgs),

    /// Print one record as JSON
    Get {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        target: Target,
    },

    /// Delete one record
    Delete {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        target: Target,
    },

    /// Save a page from a JSON file, replacing any record with the same URL
    Put {
        #[command(flatten)]
        index: IndexArgs,
        /// JSON document; timestamps and geopoints may use any supported form
        file: PathBuf,
    },

    /// Search with the search-bar syntax, e.g. `domain:nytimes.com text:covid`
    Search {
        #[command(flatten)]
        index: IndexArgs,
        query: String,
        /// Match records where any term matches any field
        #[arg(long)]
        any: bool,
    },

    /// Copy records missing from one backend into another
    Mirror {
        #[arg(long, default_value = "demo")]
        index: String,
        #[arg(long, value_enum, default_value_t = Backend::File)]
        from: Backend,
        #[arg(long, value_enum, default_value_t = Backend::Postgres)]
        to: Backend,
    },
}

#[derive(Args)]
struct IndexArgs {
    #[arg(long, default_value = "demo")]
    index: String,
    #[arg(long, value_enum, default_value_t = Backend::File)]
    store: Backend,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    url: Option<String>,
}

impl Target {
    fn record_id(&self) -> Result<RecordId> {
        match (&self.id, &self.url) {
            (Some(id), _) => Ok(RecordId::parse(id)?),
            (None, Some(url)) => Ok(RecordId::derive(url)?),
            (None, None) => bail!("either --id or --url is required"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    File,
    Postgres,
}

impl From<Backend> for StoreKind {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::File => StoreKind::File,
            Backend::Postgres => StoreKind::Postgres,
        }
    }
}

async fn store_for(kind: impl Into<StoreKind>, app: &AppConfig) -> Result<Arc<dyn RecordStore>> {
    let backend = StoreBackend::from_kind(kind.into(), app)?;
    Ok(open_store(&backend).await?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("driftnet=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = AppConfig::from_env()?;

    match cli.command {
        Command::Ingest { config } => {
            let batch = load_config(&config)?;
            info!(
                config = %config.display(),
                index = batch.index.as_str(),
                pages = batch.pages.len(),
                "Loaded batch"
            );

            let store = store_for(batch.store.backend, &app).await?;
            let renderer = build_renderer(&batch.render, &app)?;
            let extractor = Extractor::from_config(&batch)?;

            let report = Ingestor::new(store, renderer, extractor)
                .run(&batch.index, &batch.pages)
                .await?;
            print_json(&report)?;

            if !report.is_clean() {
                let failed: Vec<&str> = report.failures().map(|r| r.key.as_str()).collect();
                bail!(
                    "{} of {} keys failed ({}); rerun the batch to retry them",
                    failed.len(),
                    report.keys.len(),
                    failed.join(", ")
                );
            }
        }
        Command::List(args) => {
            let store = store_for(args.store, &app).await?;
            for id in store.list(&args.index).await? {
                let url = id.recover().unwrap_or_default();
                println!("{id}\t{url}");
            }
        }
        Command::Count(args) => {
            let store = store_for(args.store, &app).await?;
            println!("{}", store.count(&args.index).await?);
        }
        Command::Get { index, target } => {
            let store = store_for(index.store, &app).await?;
            let id = target.record_id()?;
            match store.get(&index.index, &id).await? {
                Some(page) => print_json(&page)?,
                None => bail!("no record {id} in index {}", index.index),
            }
        }
        Command::Delete { index, target } => {
            let store = store_for(index.store, &app).await?;
            let id = target.record_id()?;
            if store.delete(&index.index, &id).await? {
                info!(index = index.index.as_str(), id = %id, "Deleted record");
            } else {
                bail!("no record {id} in index {}", index.index);
            }
        }
        Command::Put { index, file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let page: RawWebPage = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid page JSON in {}", file.display()))?;
            let page = page.into_record()?;

            let store = store_for(index.store, &app).await?;
            store.save(&index.index, &page).await?;
            info!(index = index.index.as_str(), id = %page.id, url = page.url.as_str(), "Saved record");
        }
        Command::Search { index, query, any } => {
            let store = store_for(index.store, &app).await?;
            let hits = if any {
                store.search_any(&index.index, &query).await?
            } else {
                store.search_bar(&index.index, &query).await?
            };
            for page in hits {
                println!("{}\t{}", page.id, page.url);
            }
        }
        Command::Mirror { index, from, to } => {
            if from == to {
                bail!("--from and --to must differ");
            }
            let from = store_for(from, &app).await?;
            let to = store_for(to, &app).await?;
            let report = mirror_missing(from.as_ref(), to.as_ref(), &index).await?;
            println!("copied {} (already present {})", report.copied, report.already_present);
        }
    }

    Ok(())
}
