//! Editorial Express: editorial planning engine for hotel social accounts.
//!
//! Batch entry point: builds schedules and ingests performance feedback for
//! one or more tenant bundles, each on its own blocking task.

mod bundle;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use editorial_catalog::InMemoryCatalog;
use editorial_core::{AppConfig, CancelFlag, TenantContext};
use editorial_feedback::{InMemoryWeightsStore, OutcomeFeedbackAdjuster, WeightsStore};
use editorial_planner::{BuildOptions, ScheduleBuilder};
use tracing::{error, info, warn};

use crate::bundle::{emit, load_weights, save_weights, TenantBundle};

#[derive(Parser, Debug)]
#[command(name = "editorial-express")]
#[command(about = "Asset selection, editorial schedules and performance feedback")]
#[command(version)]
struct Cli {
    /// TOML configuration file, overridden by EDITORIAL_EXPRESS__* variables
    #[arg(long, env = "EDITORIAL_EXPRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Instance identifier (overrides config)
    #[arg(long, env = "EDITORIAL_EXPRESS__INSTANCE_ID")]
    instance_id: Option<String>,

    /// Directory holding learned weights, one file per tenant
    #[arg(long, env = "EDITORIAL_EXPRESS_WEIGHTS_DIR")]
    weights_dir: Option<PathBuf>,

    /// Write results to this directory instead of stdout
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct TenantArgs {
    /// Tenant bundle JSON file (repeatable)
    #[arg(long = "tenant", required = true)]
    tenants: Vec<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct PlanArgs {
    #[command(flatten)]
    tenants: TenantArgs,

    /// First date to plan (inclusive)
    #[arg(long)]
    start: NaiveDate,

    /// Last date to plan (inclusive)
    #[arg(long)]
    end: NaiveDate,

    /// Re-plan slots listed in the bundle's existing_slots
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Runner-up alternatives kept per entry (overrides config)
    #[arg(long)]
    alternatives: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an editorial schedule per tenant
    Plan(PlanArgs),
    /// Ingest each tenant's performance records into its learned weights
    Ingest(TenantArgs),
    /// Report rule and theme configuration problems
    Validate(TenantArgs),
}

/// Settings shared by every tenant job of one invocation.
struct Run {
    config: AppConfig,
    weights_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
    cancel: CancelFlag,
}

impl Run {
    fn context(&self, bundle: &mut TenantBundle) -> Result<TenantContext> {
        let overrides = std::mem::take(&mut bundle.overrides);
        Ok(TenantContext::with_overrides(
            bundle.tenant_id.clone(),
            &self.config,
            overrides,
        )?)
    }

    fn weights_store(&self, ctx: &TenantContext) -> Result<Arc<InMemoryWeightsStore>> {
        let store = Arc::new(InMemoryWeightsStore::new());
        if let Some(weights) = load_weights(self.weights_dir.as_deref(), &ctx.tenant_id)? {
            store.restore(weights);
        }
        Ok(store)
    }
}

fn plan_tenant(run: &Run, args: &PlanArgs, mut bundle: TenantBundle) -> Result<()> {
    let ctx = run.context(&mut bundle)?;
    for problem in bundle.rules.validate() {
        warn!(tenant_id = %ctx.tenant_id, %problem, "rule configuration problem");
    }

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.upsert_many(&ctx.tenant_id, bundle.assets);
    let store = run.weights_store(&ctx)?;
    let builder = ScheduleBuilder::new(ctx.tenant_id.clone(), catalog, store, bundle.rules);

    let options = BuildOptions {
        exclude: bundle.planned_assets.into_iter().collect(),
        existing: bundle
            .existing_slots
            .iter()
            .map(|slot| (slot.date, slot.slot_index))
            .collect::<HashSet<_>>(),
        overwrite: args.overwrite,
        alternatives: args.alternatives,
        cancel: run.cancel.clone(),
    };
    let outcome = builder.build(&ctx, args.start, args.end, &options)?;

    info!(
        tenant_id = %ctx.tenant_id,
        entries = outcome.entries.len(),
        unfilled = outcome.unfilled.len(),
        fingerprint = %outcome.fingerprint(),
        "schedule ready"
    );
    emit(
        run.out_dir.as_deref(),
        &format!("{}.schedule.json", ctx.tenant_id),
        &outcome,
    )
}

fn ingest_tenant(run: &Run, mut bundle: TenantBundle) -> Result<()> {
    let ctx = run.context(&mut bundle)?;

    let catalog = Arc::new(InMemoryCatalog::new());
    catalog.upsert_many(&ctx.tenant_id, bundle.assets);
    let store = run.weights_store(&ctx)?;
    let adjuster = OutcomeFeedbackAdjuster::new(catalog, store.clone());

    let report = adjuster.ingest(&ctx, &bundle.records, &run.cancel)?;
    for skipped in &report.skipped {
        warn!(
            tenant_id = %ctx.tenant_id,
            record_id = %skipped.record_id,
            reason = %skipped.reason,
            "performance record skipped"
        );
    }

    match run.weights_dir.as_deref() {
        Some(dir) => {
            let path = save_weights(dir, &store.load(&ctx.tenant_id)?)?;
            info!(tenant_id = %ctx.tenant_id, path = %path.display(), "weights saved");
        }
        None => warn!(
            tenant_id = %ctx.tenant_id,
            "no weights directory configured, learned weights are discarded"
        ),
    }
    emit(
        run.out_dir.as_deref(),
        &format!("{}.ingest.json", ctx.tenant_id),
        &report,
    )
}

fn validate_tenant(run: &Run, mut bundle: TenantBundle) -> Result<()> {
    let ctx = run.context(&mut bundle)?;
    let problems = bundle.rules.validate();
    if problems.is_empty() {
        info!(tenant_id = %ctx.tenant_id, "configuration is valid");
        return Ok(());
    }
    for problem in &problems {
        error!(tenant_id = %ctx.tenant_id, %problem, "rule configuration problem");
    }
    anyhow::bail!("{} configuration problem(s) for {}", problems.len(), ctx.tenant_id)
}

/// Run `job` for every bundle on the blocking pool. Returns the number of
/// failed tenants; one tenant failing never stops the others.
async fn run_per_tenant<F>(paths: &[PathBuf], job: F) -> usize
where
    F: Fn(TenantBundle) -> Result<()> + Send + Sync + 'static,
{
    let job = Arc::new(job);
    let handles: Vec<_> = paths
        .iter()
        .map(|path| {
            let job = job.clone();
            let owned = path.clone();
            let handle = tokio::task::spawn_blocking(move || job(TenantBundle::load(&owned)?));
            (path.clone(), handle)
        })
        .collect();

    let mut failures = 0;
    for (path, handle) in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let message = format!("{e:#}");
                error!(bundle = %path.display(), error = %message, "tenant job failed");
                failures += 1;
            }
            Err(e) => {
                error!(bundle = %path.display(), error = %e, "tenant job aborted");
                failures += 1;
            }
        }
    }
    failures
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match AppConfig::load_from(path) {
        Ok(config) => Ok(config),
        Err(e) if path.is_none() => {
            warn!(error = %e, "Failed to load config, using defaults");
            Ok(AppConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "editorial_express=info,editorial_planner=info".into()),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(instance_id) = cli.instance_id {
        config.instance_id = instance_id;
    }
    info!(
        instance_id = %config.instance_id,
        min_quality = config.selection.min_quality,
        cooldown_tiers = ?config.selection.cooldown_tiers_days,
        lookback_days = config.feedback.lookback_days,
        "Configuration loaded"
    );

    let cancel = CancelFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current slot");
            on_interrupt.cancel();
        }
    });

    let run = Arc::new(Run {
        config,
        weights_dir: cli.weights_dir,
        out_dir: cli.out_dir,
        cancel,
    });

    let (total, failures) = match cli.command {
        Command::Plan(args) => {
            let args = Arc::new(args);
            let paths = args.tenants.tenants.clone();
            let job_run = run.clone();
            let failures = run_per_tenant(&paths, move |bundle| {
                plan_tenant(&job_run, &args, bundle)
            })
            .await;
            (paths.len(), failures)
        }
        Command::Ingest(args) => {
            let job_run = run.clone();
            let failures =
                run_per_tenant(&args.tenants, move |bundle| ingest_tenant(&job_run, bundle)).await;
            (args.tenants.len(), failures)
        }
        Command::Validate(args) => {
            let job_run = run.clone();
            let failures =
                run_per_tenant(&args.tenants, move |bundle| validate_tenant(&job_run, bundle))
                    .await;
            (args.tenants.len(), failures)
        }
    };

    if failures > 0 {
        anyhow::bail!("{failures} of {total} tenant job(s) failed");
    }
    info!(tenants = total, cancelled = run.cancel.is_cancelled(), "Editorial Express finished");
    Ok(())
}
