//! # Command Line Interface
//!
//! Runs reconciliation passes outside the custom-resource runtime: feed it
//! the same event document CloudFormation would send, inspect what a pass
//! would create, or list the names a project/environment owns.
//!
//! ```text
//! secret-seeder reconcile --event event.json
//! secret-seeder plan --event - < event.json
//! secret-seeder names --project omix3 --env test --service fence
//! ```

pub mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::bundles::{BundleKind, SecretNamer};
use crate::config::SeederConfig;
use crate::event::{ResourceEvent, ResponseStatus};
use crate::invocation::InvocationContext;
use crate::observability::{init_logging, log_config_info};
use crate::reconcile::Reconciler;
use crate::secrets::{InMemorySecretStore, SecretGateway, SecretStore};
use output::{print_output, OutputFormat};

#[derive(Parser)]
#[command(name = "secret-seeder")]
#[command(about = "Seed g3auto application secrets: create if missing, never overwrite")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Run against an empty in-memory store instead of AWS Secrets Manager
    #[arg(long, global = true)]
    pub memory: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Handle a custom-resource event and print the response
    Reconcile {
        /// Event file, or `-` for stdin
        #[arg(long, default_value = "-")]
        event: PathBuf,
    },

    /// Show the secrets an event targets and which already exist
    Plan {
        /// Event file, or `-` for stdin
        #[arg(long, default_value = "-")]
        event: PathBuf,
    },

    /// List every secret name a project/environment can own
    Names {
        #[arg(long)]
        project: String,

        #[arg(long)]
        env: String,

        /// Per-service credential to include (repeatable)
        #[arg(long = "service")]
        services: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
struct NameEntry {
    name: String,
    kind: BundleKind,
    flag: &'static str,
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let mut config = SeederConfig::from_env()?;
    if cli.verbose {
        config.log_level = "debug".to_string();
    }
    init_logging(&config)?;

    match cli.command {
        Commands::Reconcile { event } => {
            let event = read_event(&event)?;
            let reconciler = Reconciler::new(build_gateway(&config, cli.memory).await?);
            let response = reconciler.handle_event(&event).await;
            print_output(&response, cli.output)?;

            if response.status == ResponseStatus::Failed {
                anyhow::bail!(
                    "Reconciliation failed: {}",
                    response.reason.as_deref().unwrap_or("unknown error")
                );
            }
        }
        Commands::Plan { event } => {
            let event = read_event(&event)?;
            let context = InvocationContext::from_properties(&event.resource_properties)?;
            let reconciler = Reconciler::new(build_gateway(&config, cli.memory).await?);
            let plan = reconciler.plan(&context).await?;
            print_output(&plan, cli.output)?;
        }
        Commands::Names { project, env, services } => {
            print_output(&all_names(&project, &env, &services), cli.output)?;
        }
    }

    Ok(())
}

fn all_names(project: &str, env: &str, services: &[String]) -> Vec<NameEntry> {
    let namer = SecretNamer::new(project, env);
    let per_service = services.iter().map(|service| NameEntry {
        name: namer.service(service),
        kind: BundleKind::DatabaseCredential,
        flag: BundleKind::DatabaseCredential.flag_name(),
    });
    let bundles = BundleKind::OPTIONAL_ORDER.into_iter().map(|kind| NameEntry {
        name: namer.bundle(kind),
        kind,
        flag: kind.flag_name(),
    });
    per_service.chain(bundles).collect()
}

fn read_event(path: &Path) -> Result<ResourceEvent> {
    let raw = if path.as_os_str() == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw).context("Failed to read event from stdin")?;
        raw
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?
    };
    Ok(ResourceEvent::from_json(&raw)?)
}

async fn build_gateway(config: &SeederConfig, memory: bool) -> Result<SecretGateway> {
    let store: Arc<dyn SecretStore> = if memory {
        Arc::new(InMemorySecretStore::new())
    } else {
        aws_store(config).await?
    };

    log_config_info(config);
    info!(store = %store.store_type(), "Secret store ready");
    Ok(SecretGateway::with_options(store, config.gateway_options()))
}

#[cfg(feature = "aws")]
async fn aws_store(config: &SeederConfig) -> Result<Arc<dyn SecretStore>> {
    let store = crate::secrets::AwsSecretStore::from_config(config).await;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "aws"))]
async fn aws_store(_config: &SeederConfig) -> Result<Arc<dyn SecretStore>> {
    anyhow::bail!("Built without the `aws` feature; rerun with --memory")
}
