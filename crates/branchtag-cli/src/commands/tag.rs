use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use url::Url;

use branchtag_auth::{Credentials, EnvStore};
use branchtag_core::config::TaggerConfig;
use branchtag_host::{BranchResolver, GitHubClient};
use branchtag_ledger::{ErrorLedger, FlushOutcome};
use branchtag_reconcile::owner::OwnerResolver;
use branchtag_reconcile::{Orchestrator, RunOptions, TagValue};
use branchtag_scan::SnykClient;

use super::summary;

#[derive(Args)]
pub struct TagArgs {
    /// Scan-platform region (SNYK-US-01, SNYK-US-02, SNYK-EU-01, SNYK-AU-01)
    #[arg(long)]
    region: Option<String>,
    /// Compute matches and tag changes without writing anything
    #[arg(long)]
    dry_run: bool,
    /// Tag key for default-branch projects
    #[arg(long)]
    key: String,
    /// Fixed tag value; defaults to the repository's default branch
    #[arg(long)]
    value: Option<String>,
    /// Integration type(s) to include, e.g. --integration-type github github-enterprise
    #[arg(long = "integration-type", num_args = 1.., required = true)]
    integration_types: Vec<String>,
    /// Restrict to organizations of this group
    #[arg(long)]
    group_id: Option<String>,
    /// Hosting-platform API URL, e.g. https://ghe.example.com/api/v3
    #[arg(long)]
    github_base_url: Option<String>,
    /// Error log file path
    #[arg(long)]
    error_log: Option<PathBuf>,
    /// Targets processed concurrently per organization
    #[arg(long)]
    concurrency: Option<usize>,
    /// Config file to use instead of ~/.branchtag/config.toml
    #[arg(long)]
    config: Option<PathBuf>,
    /// Hide the per-organization progress bar
    #[arg(long)]
    no_progress: bool,
}

/// Fold command-line overrides into the loaded configuration.
fn effective_config(args: &TagArgs) -> anyhow::Result<TaggerConfig> {
    let mut config = match &args.config {
        Some(path) => TaggerConfig::load_from(path)?,
        None => TaggerConfig::load()?,
    };
    if let Some(region) = &args.region {
        config.region = region.parse()?;
    }
    if let Some(base) = &args.github_base_url {
        config.github_api_url =
            Url::parse(base).map_err(|e| anyhow::anyhow!("invalid --github-base-url {base}: {e}"))?;
    }
    if let Some(path) = &args.error_log {
        config.error_log = path.clone();
    }
    if let Some(n) = args.concurrency {
        config.target_concurrency = n.max(1);
    }
    Ok(config)
}

pub async fn run(args: TagArgs) -> anyhow::Result<()> {
    let creds = Credentials::load(&EnvStore::new())?;

    let config = effective_config(&args)?;
    let source_types = config.validate_source_types(&args.integration_types)?;
    tracing::info!("processing integration types: {}", source_types.join(", "));

    tracing::info!("initializing scan-platform client (region: {})", config.region);
    let scan = Arc::new(SnykClient::from_config(&config, &creds.snyk_token)?);
    let owners = OwnerResolver::from_platform(&*scan).await;

    tracing::info!(
        "initializing hosting-platform client (base URL: {})",
        config.github_api_url
    );
    let github = GitHubClient::new(
        config.github_api_url.clone(),
        &creds.github_token,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let resolver = BranchResolver::new(Arc::new(github), config.github_host_marker.clone());
    let ledger = Arc::new(ErrorLedger::new(config.error_log.clone()));

    let options = RunOptions {
        tag_key: args.key.clone(),
        tag_value: args
            .value
            .clone()
            .map(TagValue::Fixed)
            .unwrap_or(TagValue::DefaultBranch),
        dry_run: args.dry_run,
        group_id: args.group_id.clone(),
        source_types,
        target_concurrency: config.target_concurrency,
        show_progress: !args.no_progress,
    };

    let orchestrator = Orchestrator::new(scan, Arc::new(resolver), owners, ledger.clone(), options);
    let result = orchestrator.run().await;

    match ledger.flush() {
        Ok(FlushOutcome::Clean) => {
            println!("\nNo errors logged - all projects processed successfully!");
        }
        Ok(FlushOutcome::Written { path, count }) => {
            println!("\nError log saved to: {}", path.display());
            println!("   Total errors logged: {count}");
        }
        Err(e) => {
            tracing::error!("failed to save error log: {e}");
            eprintln!("Failed to save error log: {e}");
        }
    }

    let report = result?;
    println!("{}", summary::render(&report, &ledger.summary(), args.dry_run));
    Ok(())
}
