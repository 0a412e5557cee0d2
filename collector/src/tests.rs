use crate::{Pacer, StopReason, WindowedCollector};
use chrono::{NaiveDate, TimeZone, Utc};
use post_store::StoreFile;
use std::cell::Cell;
use std::env;
use std::fs;
use tracker_core::{
    BatchSink, CollectionWindow, CoreError, DayCalendar, FeedPost, FeedSource, OrderingPolicy,
    Post, RedditApiError,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
}

fn feed_post(id: &str, d: u32, hour: u32) -> FeedPost {
    FeedPost {
        title: format!("title {}", id),
        body: format!("body {}", id),
        created_at: Utc.with_ymd_and_hms(2024, 4, d, hour, 0, 0).unwrap(),
    }
}

fn window(start: u32, end: u32) -> CollectionWindow {
    CollectionWindow::new(day(start), day(end)).unwrap()
}

/// Feed that counts reads and can fail after a number of posts.
struct ScriptedFeed {
    posts: Vec<FeedPost>,
    position: usize,
    fail_after: Option<usize>,
}

impl ScriptedFeed {
    fn new(posts: Vec<FeedPost>) -> Self {
        Self {
            posts,
            position: 0,
            fail_after: None,
        }
    }

    fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    fn reads(&self) -> usize {
        self.position
    }
}

impl FeedSource for ScriptedFeed {
    async fn next_post(&mut self) -> Result<Option<FeedPost>, CoreError> {
        if self.fail_after == Some(self.position) {
            return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
        }
        let post = self.posts.get(self.position).cloned();
        if post.is_some() {
            self.position += 1;
        }
        Ok(post)
    }
}

#[derive(Default)]
struct RecordingSink {
    flushes: Vec<Vec<Post>>,
}

impl BatchSink for RecordingSink {
    fn flush(&mut self, collected: &[Post]) -> Result<(), CoreError> {
        self.flushes.push(collected.to_vec());
        Ok(())
    }
}

#[derive(Default)]
struct CountingPacer {
    items: Cell<usize>,
    batches: Cell<usize>,
}

impl Pacer for CountingPacer {
    async fn after_item(&self) {
        self.items.set(self.items.get() + 1);
    }

    async fn after_batch(&self) {
        self.batches.set(self.batches.get() + 1);
    }
}

fn collector(pacer: &CountingPacer, batch_size: usize) -> WindowedCollector<&CountingPacer> {
    WindowedCollector::new(pacer, batch_size)
        .unwrap()
        .with_calendar(DayCalendar::Utc)
}

#[test]
fn test_zero_batch_size_rejected() {
    let pacer = CountingPacer::default();
    assert!(matches!(
        WindowedCollector::new(&pacer, 0),
        Err(CoreError::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn test_early_stop_at_window_start() {
    let pacer = CountingPacer::default();
    // The trailing post is out of order; an early stop must never reach it.
    let mut feed = ScriptedFeed::new(vec![
        feed_post("10", 10, 12),
        feed_post("9", 9, 12),
        feed_post("8", 8, 12),
        feed_post("7", 7, 12),
        feed_post("late 8", 8, 1),
    ]);
    let mut sink = RecordingSink::default();

    let collection = collector(&pacer, 100)
        .collect(&mut feed, window(8, 9), &mut sink)
        .await
        .unwrap();

    let dates: Vec<NaiveDate> = collection.posts.iter().map(|p| p.date).collect();
    assert_eq!(dates, vec![day(9), day(8)]);
    assert_eq!(feed.reads(), 4);
    assert_eq!(collection.report.stop_reason, StopReason::ReachedWindowStart);
    assert_eq!(collection.report.skipped_newer, 1);
    // The stopping post gets no item pause.
    assert_eq!(pacer.items.get(), 3);
}

#[tokio::test]
async fn test_single_day_window() {
    let pacer = CountingPacer::default();
    let mut feed = ScriptedFeed::new(vec![
        feed_post("a", 12, 23),
        feed_post("b", 11, 20),
        feed_post("c", 11, 0),
        feed_post("d", 10, 23),
    ]);
    let mut sink = RecordingSink::default();

    let collection = collector(&pacer, 10)
        .collect(&mut feed, window(11, 11), &mut sink)
        .await
        .unwrap();

    assert_eq!(collection.posts.len(), 2);
    assert!(collection.posts.iter().all(|p| p.date == day(11)));
}

#[tokio::test]
async fn test_batches_flush_cumulative_prefixes() {
    let pacer = CountingPacer::default();
    let mut feed = ScriptedFeed::new((0..5).map(|i| feed_post(&i.to_string(), 15, 20 - i)).collect());
    let mut sink = RecordingSink::default();

    let collection = collector(&pacer, 2)
        .collect(&mut feed, window(1, 20), &mut sink)
        .await
        .unwrap();

    let sizes: Vec<usize> = sink.flushes.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 4, 5]);
    assert_eq!(collection.report.flushes, 3);
    assert_eq!(collection.report.stop_reason, StopReason::SourceExhausted);
    assert_eq!(pacer.batches.get(), 2);
    assert_eq!(pacer.items.get(), 5);
}

#[tokio::test]
async fn test_no_trailing_flush_on_exact_multiple() {
    let pacer = CountingPacer::default();
    let mut feed = ScriptedFeed::new((0..4).map(|i| feed_post(&i.to_string(), 15, 20 - i)).collect());
    let mut sink = RecordingSink::default();

    collector(&pacer, 2)
        .collect(&mut feed, window(1, 20), &mut sink)
        .await
        .unwrap();

    let sizes: Vec<usize> = sink.flushes.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![2, 4]);
}

#[tokio::test]
async fn test_empty_feed() {
    let pacer = CountingPacer::default();
    let mut feed = ScriptedFeed::new(Vec::new());
    let mut sink = RecordingSink::default();

    let collection = collector(&pacer, 2)
        .collect(&mut feed, window(1, 20), &mut sink)
        .await
        .unwrap();

    assert!(collection.posts.is_empty());
    assert!(sink.flushes.is_empty());
}

#[tokio::test]
async fn test_newer_posts_are_paced_but_skipped() {
    let pacer = CountingPacer::default();
    let mut feed = ScriptedFeed::new(vec![
        feed_post("a", 20, 12),
        feed_post("b", 19, 12),
        feed_post("c", 18, 12),
    ]);
    let mut sink = RecordingSink::default();

    let collection = collector(&pacer, 1)
        .collect(&mut feed, window(1, 18), &mut sink)
        .await
        .unwrap();

    assert_eq!(collection.posts.len(), 1);
    assert_eq!(collection.report.skipped_newer, 2);
    assert_eq!(pacer.items.get(), 3);
    assert_eq!(pacer.batches.get(), 1);
}

#[tokio::test]
async fn test_ordering_violation_is_counted() {
    let pacer = CountingPacer::default();
    let mut feed = ScriptedFeed::new(vec![
        feed_post("a", 10, 12),
        feed_post("b", 10, 14),
        feed_post("c", 9, 12),
    ]);
    let mut sink = RecordingSink::default();

    let collection = collector(&pacer, 10)
        .collect(&mut feed, window(9, 10), &mut sink)
        .await
        .unwrap();

    assert_eq!(collection.report.ordering_violations, 1);
    assert_eq!(collection.posts.len(), 3);
}

#[tokio::test]
async fn test_full_scan_does_not_stop_early() {
    let pacer = CountingPacer::default();
    let posts = vec![
        feed_post("9", 9, 12),
        feed_post("7", 7, 12),
        feed_post("late 8", 8, 1),
    ];

    let mut sink = RecordingSink::default();
    let early = collector(&pacer, 10)
        .collect(&mut ScriptedFeed::new(posts.clone()), window(8, 9), &mut sink)
        .await
        .unwrap();
    assert_eq!(early.posts.len(), 1);

    let mut sink = RecordingSink::default();
    let full = collector(&pacer, 10)
        .with_ordering(OrderingPolicy::FullScan)
        .collect(&mut ScriptedFeed::new(posts), window(8, 9), &mut sink)
        .await
        .unwrap();

    assert_eq!(full.posts.len(), 2);
    assert_eq!(full.report.skipped_older, 1);
    assert_eq!(full.report.ordering_violations, 1);
    assert_eq!(full.report.stop_reason, StopReason::SourceExhausted);
}

#[tokio::test]
async fn test_feed_failure_keeps_flushed_batches() {
    let path = env::temp_dir().join(format!("test_collect_{}.csv", uuid::Uuid::new_v4()));
    let mut store_file = StoreFile::new(&path);
    let pacer = CountingPacer::default();
    let mut feed = ScriptedFeed::new(
        (0..6).map(|i| feed_post(&i.to_string(), 15, 20 - i)).collect(),
    )
    .failing_after(3);

    let result = collector(&pacer, 2)
        .collect(&mut feed, window(1, 20), &mut store_file)
        .await;

    assert!(matches!(
        result,
        Err(CoreError::RedditApi(RedditApiError::RequestTimeout))
    ));
    // The first batch survived; the third post was never flushed.
    let recovered = store_file.load();
    assert_eq!(recovered.len(), 2);
    assert_eq!(recovered.posts()[0].title, "title 0");
    fs::remove_file(&path).ok();
}
