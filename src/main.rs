use anyhow::Context;
use collector::{FixedDelayPacer, Pacer, RateLimitConfig, TokenBucketPacer};
use pipeline::{CsvSeriesSink, Pipeline, SeriesSink, TableSink};
use reddit_client::{ListingSort, RedditApiClient, SubredditFeed};
use sentiment::LexiconScorer;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracker_core::{CoreError, ErrorReporter, PacerKind, RunMode, TrackerConfig};
use tracing_subscriber::EnvFilter;

const CONFIG_ENV: &str = "SENTIMENT_TRACKER_CONFIG";
const DEFAULT_CONFIG: &str = "sentiment-tracker.toml";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "sentiment_tracker=info,pipeline=info,collector=info,post_store=info,reddit_client=info",
        )
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG));
    let config = TrackerConfig::load(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    tracing::info!("Starting sentiment tracker for r/{}", config.subreddit);

    if let Err(e) = run(&config).await {
        ErrorReporter::new().report_error(&e);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run(config: &TrackerConfig) -> Result<(), CoreError> {
    match config.pacer {
        PacerKind::Fixed => {
            let pacer = FixedDelayPacer::new(config.item_delay(), config.batch_delay());
            run_with(config, pacer).await
        }
        PacerKind::TokenBucket => {
            let pacer =
                TokenBucketPacer::new(RateLimitConfig::per_minute(config.requests_per_minute))?;
            run_with(config, pacer).await
        }
    }
}

async fn run_with<P: Pacer>(config: &TrackerConfig, pacer: P) -> Result<(), CoreError> {
    let client =
        RedditApiClient::with_base_url(config.user_agent.clone(), &config.feed_base_url)?;
    let pipeline = Pipeline::new(config, LexiconScorer::new(), pacer)?;

    match config.mode {
        RunMode::Windowed => {
            let mut feed = SubredditFeed::newest(client, config.subreddit.as_str())
                .with_cap(config.fetch_limit);
            let window = config.window()?;

            let mut table = TableSink::stdout(format!(
                "Daily sentiment for r/{} ({} to {})",
                config.subreddit,
                window.start(),
                window.end()
            ));
            let mut csv_sink = config.series_path.as_ref().map(|path| CsvSeriesSink::new(path));
            let mut sinks: Vec<&mut dyn SeriesSink> = vec![&mut table];
            if let Some(csv_sink) = csv_sink.as_mut() {
                sinks.push(csv_sink);
            }

            let summary = pipeline.run_windowed(&mut feed, window, &mut sinks).await?;
            tracing::info!(
                "Run finished: {} collected, {} stored, {} pages fetched",
                summary.report.collected,
                summary.stored,
                feed.pages_fetched()
            );
        }
        RunMode::Snapshot => {
            let mut feed = SubredditFeed::new(client, config.subreddit.as_str(), ListingSort::Hot)
                .with_cap(Some(config.snapshot_limit));
            let summary = pipeline.run_snapshot(&mut feed).await?;
            tracing::info!(
                "Snapshot of {} posts written to {}",
                summary.posts.len(),
                summary.path.display()
            );
        }
    }
    Ok(())
}
