use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracker_core::{
    CollectionWindow, CoreError, DayCalendar, FeedPost, FeedSource, TrackerConfig,
};

use collector::{CollectionReport, Pacer, WindowedCollector};
use post_store::StoreFile;
use sentiment::{DailySentiment, ScoredPost, SentimentAggregator, SentimentScorer};

use crate::sinks::{write_snapshot, SeriesSink};

/// Outcome of a windowed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: CollectionReport,
    /// Posts in the store after the run.
    pub stored: usize,
    pub series: DailySentiment,
}

/// Outcome of a snapshot run.
#[derive(Debug, Clone)]
pub struct SnapshotSummary {
    pub posts: Vec<ScoredPost>,
    pub path: PathBuf,
}

impl SnapshotSummary {
    /// Mean overall sentiment over the finite scores, if any.
    pub fn mean_sentiment(&self) -> Option<f64> {
        let finite: Vec<f64> = self
            .posts
            .iter()
            .map(|post| post.overall_sentiment)
            .filter(|score| score.is_finite())
            .collect();
        if finite.is_empty() {
            None
        } else {
            Some(finite.iter().sum::<f64>() / finite.len() as f64)
        }
    }
}

/// Runs collection, storage and aggregation in sequence.
pub struct Pipeline<S, P> {
    store: StoreFile,
    collector: WindowedCollector<P>,
    aggregator: SentimentAggregator<S>,
    calendar: DayCalendar,
    snapshot_limit: usize,
    snapshot_path: PathBuf,
}

impl<S: SentimentScorer, P: Pacer> Pipeline<S, P> {
    pub fn new(config: &TrackerConfig, scorer: S, pacer: P) -> Result<Self, CoreError> {
        let collector = WindowedCollector::new(pacer, config.batch_size)?
            .with_ordering(config.ordering)
            .with_calendar(config.calendar);

        Ok(Self {
            store: StoreFile::new(&config.store_path),
            collector,
            aggregator: SentimentAggregator::new(scorer),
            calendar: config.calendar,
            snapshot_limit: config.snapshot_limit,
            snapshot_path: config.snapshot_path.clone(),
        })
    }

    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    /// load, collect, merge, aggregate, persist, then emit to every sink.
    ///
    /// A failure while collecting returns before the final persist, so the
    /// store keeps only what the collector had already flushed. Nothing is
    /// emitted unless the store was persisted.
    pub async fn run_windowed<F>(
        &self,
        feed: &mut F,
        window: CollectionWindow,
        sinks: &mut [&mut dyn SeriesSink],
    ) -> Result<RunSummary, CoreError>
    where
        F: FeedSource,
    {
        let loaded = self.store.load();
        let before = loaded.len();

        let mut flush_target = self.store.clone();
        let collection = self
            .collector
            .collect(feed, window, &mut flush_target)
            .await?;

        let merged = loaded.merge(collection.posts);
        let series = self.aggregator.daily_average(merged.iter())?;
        self.store.persist(&merged)?;

        info!(
            "Store holds {} posts ({} new), {} days aggregated",
            merged.len(),
            merged.len().saturating_sub(before),
            series.len()
        );
        if series.rejected() > 0 {
            warn!("{} posts had no usable sentiment score", series.rejected());
        }

        for sink in sinks.iter_mut() {
            sink.emit(&series)?;
        }

        Ok(RunSummary {
            report: collection.report,
            stored: merged.len(),
            series,
        })
    }

    /// Scores the first posts of `feed` one by one and writes them to the
    /// snapshot file. The post store is left alone.
    pub async fn run_snapshot<F>(&self, feed: &mut F) -> Result<SnapshotSummary, CoreError>
    where
        F: FeedSource,
    {
        let mut fetched: Vec<FeedPost> = Vec::new();
        while fetched.len() < self.snapshot_limit {
            match feed.next_post().await? {
                Some(post) => fetched.push(post),
                None => break,
            }
        }

        let posts = self.aggregator.score_posts(&fetched, self.calendar)?;
        write_snapshot(&self.snapshot_path, &posts)?;

        let summary = SnapshotSummary {
            posts,
            path: self.snapshot_path.clone(),
        };
        match summary.mean_sentiment() {
            Some(mean) => info!(
                "Snapshot of {} posts, mean overall sentiment {:.4}",
                summary.posts.len(),
                mean
            ),
            None => info!("Snapshot has no scored posts"),
        }
        Ok(summary)
    }
}
