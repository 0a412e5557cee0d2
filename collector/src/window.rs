use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use tracker_core::{
    BatchSink, CollectionWindow, CoreError, DayCalendar, FeedSource, OrderingPolicy, Post,
};

use crate::pacing::Pacer;

/// Why a collection pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A post dated before the window start was read.
    ReachedWindowStart,
    /// The source had no more posts.
    SourceExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    /// Posts consumed from the source, including the one that stopped the pass.
    pub inspected: usize,
    pub collected: usize,
    /// Posts dated after the window end.
    pub skipped_newer: usize,
    /// Posts dated before the window start that did not stop the pass.
    pub skipped_older: usize,
    pub flushes: usize,
    /// Posts that were newer than the post read before them.
    pub ordering_violations: usize,
    pub stop_reason: StopReason,
}

impl CollectionReport {
    fn new() -> Self {
        Self {
            inspected: 0,
            collected: 0,
            skipped_newer: 0,
            skipped_older: 0,
            flushes: 0,
            ordering_violations: 0,
            stop_reason: StopReason::SourceExhausted,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    pub posts: Vec<Post>,
    pub report: CollectionReport,
}

/// Reads a newest-first feed into the posts of one date window.
///
/// Every `batch_size` collected posts, everything collected so far is flushed
/// to the sink and the pacer's batch pause runs. The pacer's item pause runs
/// after every post read, in or out of the window. Errors from the source or
/// the sink abort the pass; posts collected since the last flush are lost.
pub struct WindowedCollector<P> {
    pacer: P,
    batch_size: usize,
    ordering: OrderingPolicy,
    calendar: DayCalendar,
}

impl<P: Pacer> WindowedCollector<P> {
    pub fn new(pacer: P, batch_size: usize) -> Result<Self, CoreError> {
        if batch_size == 0 {
            return Err(CoreError::InvalidInput {
                message: "batch size must be positive".to_string(),
            });
        }

        Ok(Self {
            pacer,
            batch_size,
            ordering: OrderingPolicy::default(),
            calendar: DayCalendar::default(),
        })
    }

    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_calendar(mut self, calendar: DayCalendar) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn collect<S, K>(
        &self,
        source: &mut S,
        window: CollectionWindow,
        sink: &mut K,
    ) -> Result<Collection, CoreError>
    where
        S: FeedSource,
        K: BatchSink,
    {
        info!(
            "Collecting posts from {} to {} ({:?})",
            window.start(),
            window.end(),
            self.ordering
        );

        let mut report = CollectionReport::new();
        let mut posts: Vec<Post> = Vec::new();
        let mut flushed = 0;
        let mut previous: Option<DateTime<Utc>> = None;

        while let Some(feed_post) = source.next_post().await? {
            report.inspected += 1;

            if let Some(previous) = previous {
                if feed_post.created_at > previous {
                    report.ordering_violations += 1;
                    warn!(
                        "Feed is not newest first: post at {} follows post at {}",
                        feed_post.created_at, previous
                    );
                }
            }
            previous = Some(feed_post.created_at);

            let post = Post::from_feed(feed_post, self.calendar);

            if window.is_before_start(post.date) {
                if self.ordering == OrderingPolicy::EarlyStop {
                    debug!("Reached post dated {}, before window start", post.date);
                    report.stop_reason = StopReason::ReachedWindowStart;
                    break;
                }
                report.skipped_older += 1;
            } else if window.contains(post.date) {
                posts.push(post);

                if posts.len() % self.batch_size == 0 {
                    info!("Collected {} posts...", posts.len());
                    sink.flush(&posts)?;
                    flushed = posts.len();
                    report.flushes += 1;
                    self.pacer.after_batch().await;
                }
            } else {
                report.skipped_newer += 1;
            }

            self.pacer.after_item().await;
        }

        if posts.len() > flushed {
            sink.flush(&posts)?;
            report.flushes += 1;
        }

        report.collected = posts.len();
        if report.ordering_violations > 0 {
            warn!(
                "{} posts arrived out of order; the window may be incomplete",
                report.ordering_violations
            );
        }
        info!(
            "Collected {} posts ({} inspected, stop: {:?})",
            report.collected, report.inspected, report.stop_reason
        );

        Ok(Collection { posts, report })
    }
}
