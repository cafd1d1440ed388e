use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use songchul::config::Config;
use songchul::dedup::DeduplicationIndex;
use songchul::models::{ContentType, PrivacyStatus, PublishOutcome, PublishRequest};
use songchul::orchestrator::PublishOrchestrator;
use songchul::publisher::fallback::BridgeSessionFactory;
use songchul::publisher::{ApiPublisher, FallbackPublisher};
use songchul::quota::QuotaManager;
use songchul::scheduler::{recurring, RetryScheduler};
use songchul::store::{DurableFailureStore, RetryScope};

#[derive(Parser)]
#[command(
    name = "songchul",
    version,
    about = "Resilient video publisher with API, UI-automation fallback and retry drain",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (environment variables used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish one video through the channel chain
    Publish {
        /// Video title
        #[arg(short, long)]
        title: String,

        /// Path to the media file
        #[arg(short, long)]
        media: PathBuf,

        /// Path to a thumbnail image
        #[arg(long)]
        thumbnail: Option<PathBuf>,

        /// Video description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,

        /// Content type (longform, shorts)
        #[arg(long, default_value = "longform")]
        content_type: String,

        /// Visibility (public, unlisted, private)
        #[arg(long, default_value = "public")]
        privacy: String,

        /// Source article URL, enables deduplication
        #[arg(long)]
        source_url: Option<String>,
    },

    /// Drain stored failed uploads through the fallback channel
    Retry {
        /// Limit the drain to one content type
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Show quota flag, failure store and published-index counts
    Status,

    /// Inspect or reset the daily quota flag
    Quota {
        #[command(subcommand)]
        action: QuotaAction,
    },

    /// Run the periodic retry drain and quota reset until interrupted
    Daemon,
}

#[derive(Subcommand)]
enum QuotaAction {
    /// Show the current flag state
    Show,
    /// Clear the flag manually
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Publish {
            title,
            media,
            thumbnail,
            description,
            tags,
            content_type,
            privacy,
            source_url,
        } => {
            let content_type = ContentType::parse(&content_type)
                .ok_or_else(|| anyhow::anyhow!("Unknown content type: {content_type}"))?;
            let privacy = PrivacyStatus::parse(&privacy)
                .ok_or_else(|| anyhow::anyhow!("Unknown privacy: {privacy}"))?;

            let mut request = PublishRequest::new(&title, media, content_type);
            request.description = description;
            request.privacy = privacy;
            request.thumbnail_path = thumbnail;
            request.source_url = source_url;
            request.tags = tags
                .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default();

            publish(&config, request).await?;
        }

        Commands::Retry { content_type } => {
            let scope = match content_type {
                Some(ct) => RetryScope::Only(
                    ContentType::parse(&ct)
                        .ok_or_else(|| anyhow::anyhow!("Unknown content type: {ct}"))?,
                ),
                None => RetryScope::All,
            };
            retry(&config, scope).await;
        }

        Commands::Status => {
            status(&config).await;
        }

        Commands::Quota { action } => {
            let quota = QuotaManager::new(config.storage.quota_path());
            match action {
                QuotaAction::Show => {
                    println!("Quota exceeded: {}", quota.is_exceeded().await);
                    println!("Last updated:   {}", quota.last_updated().await);
                }
                QuotaAction::Reset => {
                    quota.reset().await;
                    println!("Quota flag cleared");
                }
            }
        }

        Commands::Daemon => {
            daemon(&config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("songchul=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("songchul=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

struct Components {
    quota: Arc<QuotaManager>,
    orchestrator: PublishOrchestrator,
    scheduler: RetryScheduler,
}

fn build_components(config: &Config) -> Result<Components> {
    let quota = Arc::new(QuotaManager::new(config.storage.quota_path()));
    let dedup = Arc::new(DeduplicationIndex::new(config.storage.index_path()));
    let store = Arc::new(DurableFailureStore::new(config.storage.failed_dir()));

    let primary = Arc::new(ApiPublisher::new(&config.primary)?);
    let factory = Arc::new(BridgeSessionFactory::new(&config.automation.bridge_url)?);
    let fallback = Arc::new(FallbackPublisher::new(
        config.automation.clone(),
        config.storage.session_snapshot_path(),
        factory,
    ));

    let orchestrator = PublishOrchestrator::new(
        Arc::clone(&quota),
        Arc::clone(&dedup),
        Arc::clone(&store),
        primary,
        Arc::clone(&fallback),
    );

    let scheduler = RetryScheduler::new(
        Arc::clone(&store),
        fallback,
        Arc::clone(&dedup),
        config.retry.clone(),
    );

    Ok(Components {
        quota,
        orchestrator,
        scheduler,
    })
}

async fn publish(config: &Config, request: PublishRequest) -> Result<()> {
    let components = build_components(config)?;

    tracing::info!(
        title = %request.title,
        content_type = %request.content_type,
        "Starting publish"
    );

    match components.orchestrator.publish(request).await {
        PublishOutcome::Success { channel, video } => {
            println!("Published via {channel}: {}", video.video_url);
        }
        PublishOutcome::Skipped { reason } => {
            println!("Skipped: {reason}");
        }
        PublishOutcome::PendingRetry { reason } => {
            println!("Failed, stored for retry: {reason}");
        }
        PublishOutcome::FailedHard { kind, reason } => {
            anyhow::bail!("Publish failed ({kind:?}): {reason}");
        }
    }

    Ok(())
}

async fn retry(config: &Config, scope: RetryScope) {
    let components = match build_components(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Setup failed: {e}");
            return;
        }
    };

    let report = components.scheduler.run(scope).await;
    if report.skipped {
        println!("Retry drain skipped: another run in progress");
    } else {
        println!(
            "Retry drain: {} attempted, {} succeeded, {} failed",
            report.attempted, report.succeeded, report.failed
        );
    }
}

async fn status(config: &Config) {
    let quota = QuotaManager::new(config.storage.quota_path());
    let dedup = DeduplicationIndex::new(config.storage.index_path());
    let store = DurableFailureStore::new(config.storage.failed_dir());

    let stats = store.statistics();
    println!("Quota exceeded:    {}", quota.is_exceeded().await);
    println!("Published sources: {}", dedup.count().await);
    println!(
        "Pending retries:   {} (longform {}, shorts {})",
        stats.total(),
        stats.longform,
        stats.shorts
    );

    if let Some(oldest) = store.list(RetryScope::All).first() {
        println!(
            "Oldest pending:    {} ({})",
            oldest.record.failed_at, oldest.record.title
        );
    }
}

/// Periodic retry drain plus the daily quota reset, until Ctrl-C
async fn daemon(config: &Config) -> Result<()> {
    let components = build_components(config)?;
    let reset_time = config.quota_reset.parse_reset_time()?;
    let retry_interval =
        std::time::Duration::from_secs(config.retry.interval_minutes.max(1) * 60);

    tracing::info!(
        retry_interval_minutes = config.retry.interval_minutes,
        quota_reset_time = %config.quota_reset.reset_time,
        "Daemon started"
    );

    let quota = Arc::clone(&components.quota);
    let reset_loop = tokio::spawn(async move {
        loop {
            let until = recurring::duration_until_daily(reset_time);
            tracing::debug!(seconds = until.as_secs(), "Sleeping until quota reset");
            tokio::time::sleep(until).await;
            quota.reset().await;
        }
    });

    let mut ticker = tokio::time::interval(retry_interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = components.scheduler.run(RetryScope::All).await;
                if !report.skipped && report.attempted > 0 {
                    tracing::info!(
                        attempted = report.attempted,
                        succeeded = report.succeeded,
                        "Scheduled retry drain finished"
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }

    reset_loop.abort();
    Ok(())
}
