#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use cardaudit::artifacts::ArtifactStore;
use cardaudit::clients::{AlertBackend, AlertmanagerClient, GrafanaClient, PrometheusClient};
use cardaudit::config::{self, CardAuditConfig, load_configuration};
use cardaudit::error::ConfigError;
use cardaudit::pipeline::{AnalyzeOptions, CollectOptions, analyze_and_persist, run_collect};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing::event;

#[derive(Debug, Parser)]
#[command(
    name = "cardaudit",
    version,
    about = "Find high-cardinality Prometheus metrics that no dashboard or alert uses",
    long_about = None
)]
struct Cli {
    /// Directory for every artifact (overrides CARDAUDIT_RESULTS_DIR)
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Export the queries of every Grafana dashboard, and optionally Alertmanager expressions.
    Collect(CollectArgs),
    /// Analyze the top Prometheus metrics against the exported queries.
    Analyze(AnalyzeArgs),
    /// Collect, then analyze.
    Run {
        #[command(flatten)]
        collect: CollectArgs,
        #[command(flatten)]
        analyze: AnalyzeArgs,
    },
}

#[derive(Debug, Args)]
struct CollectArgs {
    /// Also export the dashboard queries mentioning this metric
    #[arg(long)]
    metric: Option<String>,

    /// Also export the expressions of the active Alertmanager alerts
    #[arg(long)]
    alerts: bool,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    /// Number of highest-cardinality metrics to analyze (overrides CARDAUDIT_TOP_METRICS)
    #[arg(long)]
    top: Option<usize>,

    /// Metrics analyzed in parallel (overrides CARDAUDIT_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    load_configuration().context("Failed to load configuration")?;
    let config = config::get().context("Failed to get configuration")?;

    let _sentry = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let store = ArtifactStore::new(
        cli.results_dir
            .clone()
            .unwrap_or_else(|| config.results_dir.clone()),
    );

    let result = match &cli.command {
        Commands::Collect(args) => collect(&config, &store, args).await,
        Commands::Analyze(args) => analyze(&config, &store, args).await,
        Commands::Run {
            collect: c,
            analyze: a,
        } => {
            async {
                // Check both commands' settings before any request is made
                config.require_prometheus_url()?;
                collect(&config, &store, c).await?;
                analyze(&config, &store, a).await
            }
            .await
        }
    };

    if let Err(err) = &result {
        event!(Level::ERROR, "{:#}", err);
        sentry::integrations::anyhow::capture_anyhow(err);
    }
    result
}

async fn collect(
    config: &CardAuditConfig,
    store: &ArtifactStore,
    args: &CollectArgs,
) -> Result<()> {
    let timeout = config.request_timeout()?;
    let grafana_url = config.require_grafana_url()?;
    let alertmanager_url = if args.alerts {
        Some(config.require_alertmanager_url()?)
    } else {
        None
    };

    let grafana_credentials = config.grafana_credentials();
    if grafana_credentials.is_anonymous() {
        event!(
            Level::WARN,
            "Neither GRAFANA_SESSION_COOKIE nor GRAFANA_API_TOKEN is set, using unauthenticated requests"
        );
    }
    let grafana = GrafanaClient::new(grafana_url, grafana_credentials, timeout)?;
    let alertmanager = alertmanager_url
        .map(|url| AlertmanagerClient::new(url, config.alertmanager_credentials(), timeout))
        .transpose()?;

    let options = CollectOptions {
        metric_filter: args.metric.clone(),
        alerts: args.alerts,
    };
    let outcome = run_collect(
        &grafana,
        alertmanager.as_ref().map(|client| client as &dyn AlertBackend),
        store,
        &options,
    )
    .await?;

    println!(
        "✅ Extracted {} PromQL queries from {} dashboards ({} failed)",
        outcome.queries, outcome.dashboards, outcome.failed_dashboards
    );
    if let Some(count) = outcome.filtered_queries {
        println!("🔎 {} queries matched the metric filter", count);
    }
    if let Some(count) = outcome.alert_expressions {
        println!("🔔 {} unique PromQL expressions found in alerts", count);
    }
    println!("💾 Results saved in {}", store.dir().display());
    Ok(())
}

async fn analyze(
    config: &CardAuditConfig,
    store: &ArtifactStore,
    args: &AnalyzeArgs,
) -> Result<()> {
    let timeout = config.request_timeout()?;
    let prometheus = PrometheusClient::new(config.require_prometheus_url()?, timeout)?;

    let top = args.top.unwrap_or(config.top_metrics);
    if top == 0 {
        return Err(ConfigError::MustBePositive {
            setting: "CARDAUDIT_TOP_METRICS",
        }
        .into());
    }
    // One series request per metric, plus time to fold the result
    let metric_timeout = timeout + Duration::from_secs(5);
    let options = AnalyzeOptions::new(store, top, metric_timeout)
        .with_concurrency(args.concurrency.unwrap_or(config.concurrency));

    let (summary, path) = analyze_and_persist(&prometheus, store, &options).await?;

    println!("\nHighest-cardinality metrics:");
    for line in summary.digest_lines() {
        println!("{}", line);
    }
    println!(
        "\n📊 {} metrics referenced, {} not referenced by any dashboard or alert",
        summary.used().count(),
        summary.unused().count()
    );
    println!("💾 Saved metric summary to {}", path.display());
    Ok(())
}
