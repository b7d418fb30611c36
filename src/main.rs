use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use catalog_pipeline::app::enrich_use_case::{AnalysisSettings, EnrichUseCase};
use catalog_pipeline::app::fetch_use_case::FetchUseCase;
use catalog_pipeline::app::validate_use_case::ValidateUseCase;
use catalog_pipeline::config::PipelineConfig;
use catalog_pipeline::infra::{create_completion_client, Adapters};
use catalog_pipeline::observability::{init_logging, metrics};
use catalog_pipeline::pipeline::keys::KeyLayout;
use catalog_pipeline::pipeline::PipelineOrchestrator;

#[derive(Parser)]
#[command(name = "catalog_pipeline")]
#[command(about = "Fetch, validate and enrich a product catalog")]
#[command(version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, env = "PIPELINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the catalog and store it under the raw prefix
    Fetch,
    /// Validate a raw catalog blob
    Validate(EventArgs),
    /// Classify every product in a validated blob
    Enrich(EventArgs),
    /// Run fetch, validate and enrich in sequence
    Run,
}

/// Either an explicit bucket/key pair or a JSON event file
#[derive(Args)]
struct EventArgs {
    #[arg(long, requires = "key", conflicts_with = "event")]
    bucket: Option<String>,
    #[arg(long, requires = "bucket", conflicts_with = "event")]
    key: Option<String>,
    /// JSON file holding `{"bucket": ..., "key": ...}`
    #[arg(long)]
    event: Option<PathBuf>,
}

impl EventArgs {
    fn payload(&self) -> anyhow::Result<Value> {
        match (&self.bucket, &self.key, &self.event) {
            (Some(bucket), Some(key), None) => Ok(serde_json::json!({ "bucket": bucket, "key": key })),
            (None, None, Some(path)) => read_event_file(path),
            _ => bail!("pass either --bucket and --key, or --event <file>"),
        }
    }
}

fn read_event_file(path: &Path) -> anyhow::Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read event file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("event file {} is not valid JSON", path.display()))
}

fn print_outcome<T: Serialize>(outcome: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

async fn push_metrics(job: &str) {
    let instance = hostname();
    match metrics::push_to_gateway(job, &instance).await {
        Ok(true) => info!("Pushed metrics to Pushgateway"),
        Ok(false) => {}
        Err(e) => warn!("Failed to push metrics to Pushgateway: {}", e),
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string())
}

async fn execute(command: &Commands, config: &PipelineConfig, adapters: &Adapters) -> anyhow::Result<()> {
    let keys = KeyLayout::from_config(&config.storage);
    match command {
        Commands::Fetch => {
            let fetch = FetchUseCase::new(
                adapters.http.clone(),
                adapters.store.clone(),
                config.catalog.url.clone(),
                config.storage.bucket.clone(),
                keys,
            );
            print_outcome(&fetch.run().await?)
        }
        Commands::Validate(args) => {
            let validate = ValidateUseCase::with_product_contract(adapters.store.clone(), keys);
            print_outcome(&validate.handle(&args.payload()?).await?)
        }
        Commands::Enrich(args) => {
            let enrich = EnrichUseCase::new(
                adapters.store.clone(),
                create_completion_client(&config.inference)?,
                keys,
                AnalysisSettings::from(&config.inference),
            );
            print_outcome(&enrich.handle(&args.payload()?).await?)
        }
        Commands::Run => {
            let completion = create_completion_client(&config.inference)?;
            let orchestrator = PipelineOrchestrator::from_config(config, adapters, completion);
            print_outcome(&orchestrator.run().await?)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = init_logging();
    metrics::init()?;

    let cli = Cli::parse();
    let config = PipelineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let adapters = Adapters::from_config(&config).context("failed to build adapters")?;

    let job = match cli.command {
        Commands::Fetch => "catalog_fetch",
        Commands::Validate(_) => "catalog_validate",
        Commands::Enrich(_) => "catalog_enrich",
        Commands::Run => "catalog_pipeline",
    };
    let result = execute(&cli.command, &config, &adapters).await;
    push_metrics(job).await;
    result
}
