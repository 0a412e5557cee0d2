use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use tracker_core::{CoreError, DayCalendar, FeedPost, Post};

use crate::scorer::SentimentScorer;

/// Mean sentiment of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayAggregate {
    pub mean: f64,
    pub posts: usize,
}

/// Per-day mean of overall post sentiment, keyed and iterated by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySentiment {
    days: BTreeMap<NaiveDate, DayAggregate>,
    rejected: usize,
}

impl DailySentiment {
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.days.get(&date).map(|day| day.mean)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayAggregate> {
        self.days.get(&date)
    }

    /// Days in ascending date order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &DayAggregate)> {
        self.days.iter().map(|(date, day)| (*date, day))
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Posts left out because their score was not a finite number.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

/// A post with its title, body and overall scores, as reported by snapshot runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPost {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Text")]
    pub body: String,
    /// Creation time on the calendar the snapshot was taken with.
    #[serde(rename = "Date")]
    pub created_at: DateTime<FixedOffset>,
    #[serde(rename = "Sentiment_Title")]
    pub title_sentiment: f64,
    #[serde(rename = "Sentiment_Text")]
    pub body_sentiment: f64,
    #[serde(rename = "Overall_Sentiment")]
    pub overall_sentiment: f64,
}

pub struct SentimentAggregator<S> {
    scorer: S,
}

impl<S: SentimentScorer> SentimentAggregator<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Mean of the title and body scores.
    pub fn overall_sentiment(&self, title: &str, body: &str) -> Result<f64, CoreError> {
        let title_score = self.scorer.score(title)?;
        let body_score = self.scorer.score(body)?;
        Ok((title_score + body_score) / 2.0)
    }

    /// Groups posts by date and averages their overall sentiment.
    ///
    /// Days without posts are absent. A post whose overall sentiment is not
    /// finite is excluded from its day and counted in
    /// [`DailySentiment::rejected`]. Scorer errors abort the aggregation.
    pub fn daily_average<'a, I>(&self, posts: I) -> Result<DailySentiment, CoreError>
    where
        I: IntoIterator<Item = &'a Post>,
    {
        let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        let mut rejected = 0;

        for post in posts {
            let overall = self.overall_sentiment(&post.title, &post.body)?;
            if !overall.is_finite() {
                warn!(
                    "Scorer {} returned a non-finite score for a post dated {}, skipping it",
                    self.scorer.name(),
                    post.date
                );
                rejected += 1;
                continue;
            }

            let entry = sums.entry(post.date).or_insert((0.0, 0));
            entry.0 += overall;
            entry.1 += 1;
        }

        let days: BTreeMap<NaiveDate, DayAggregate> = sums
            .into_iter()
            .map(|(date, (sum, count))| {
                (
                    date,
                    DayAggregate {
                        mean: sum / count as f64,
                        posts: count,
                    },
                )
            })
            .collect();

        debug!(
            "Aggregated sentiment for {} days ({} posts rejected)",
            days.len(),
            rejected
        );
        Ok(DailySentiment { days, rejected })
    }

    /// Scores each post individually, keeping the full creation timestamp
    /// as wall-clock time on `calendar`.
    pub fn score_posts<'a, I>(
        &self,
        posts: I,
        calendar: DayCalendar,
    ) -> Result<Vec<ScoredPost>, CoreError>
    where
        I: IntoIterator<Item = &'a FeedPost>,
    {
        posts
            .into_iter()
            .map(|post| {
                let title_sentiment = self.scorer.score(&post.title)?;
                let body_sentiment = self.scorer.score(&post.body)?;
                Ok::<_, CoreError>(ScoredPost {
                    title: post.title.clone(),
                    body: post.body.clone(),
                    created_at: calendar.local_time(post.created_at),
                    title_sentiment,
                    body_sentiment,
                    overall_sentiment: (title_sentiment + body_sentiment) / 2.0,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::LexiconScorer;
    use chrono::{Offset, TimeZone, Utc};
    use std::collections::HashMap;
    use tracker_core::ScoringError;

    struct FixedScorer {
        scores: HashMap<&'static str, f64>,
    }

    impl FixedScorer {
        fn new(scores: &[(&'static str, f64)]) -> Self {
            Self {
                scores: scores.iter().copied().collect(),
            }
        }
    }

    impl SentimentScorer for FixedScorer {
        fn name(&self) -> &str {
            "fixed"
        }

        fn score(&self, text: &str) -> Result<f64, CoreError> {
            self.scores.get(text).copied().ok_or_else(|| {
                ScoringError::ScorerFailed {
                    scorer: "fixed".to_string(),
                    reason: format!("no score for {:?}", text),
                }
                .into()
            })
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_opposite_posts_average_to_zero() {
        let scorer = FixedScorer::new(&[("a", 1.0), ("b", 1.0), ("c", -1.0), ("d", -1.0)]);
        let aggregator = SentimentAggregator::new(scorer);
        let posts = vec![Post::new("a", "b", day(1)), Post::new("c", "d", day(1))];

        let daily = aggregator.daily_average(&posts).unwrap();

        assert_eq!(daily.len(), 1);
        assert_eq!(daily.get(day(1)), Some(0.0));
        assert_eq!(daily.day(day(1)).unwrap().posts, 2);
    }

    #[test]
    fn test_overall_is_mean_of_title_and_body() {
        let scorer = FixedScorer::new(&[("up", 0.8), ("flat", 0.0)]);
        let aggregator = SentimentAggregator::new(scorer);
        assert_eq!(aggregator.overall_sentiment("up", "flat").unwrap(), 0.4);
    }

    #[test]
    fn test_days_grouped_and_ordered() {
        let scorer = FixedScorer::new(&[("x", 0.5), ("y", -0.5), ("", 0.0)]);
        let aggregator = SentimentAggregator::new(scorer);
        let posts = vec![
            Post::new("y", "", day(3)),
            Post::new("x", "", day(1)),
            Post::new("x", "x", day(3)),
        ];

        let daily = aggregator.daily_average(&posts).unwrap();
        let dates: Vec<NaiveDate> = daily.iter().map(|(date, _)| date).collect();

        assert_eq!(dates, vec![day(1), day(3)]);
        assert_eq!(daily.get(day(1)), Some(0.25));
        assert_eq!(daily.get(day(3)), Some(0.125));
        assert_eq!(daily.get(day(2)), None);
    }

    #[test]
    fn test_empty_input_has_no_days() {
        let aggregator = SentimentAggregator::new(LexiconScorer::new());
        let daily = aggregator.daily_average(&Vec::<Post>::new()).unwrap();
        assert!(daily.is_empty());
        assert_eq!(daily.rejected(), 0);
    }

    #[test]
    fn test_non_finite_scores_are_isolated() {
        let scorer = FixedScorer::new(&[("ok", 0.6), ("nan", f64::NAN), ("", 0.0)]);
        let aggregator = SentimentAggregator::new(scorer);
        let posts = vec![
            Post::new("ok", "", day(1)),
            Post::new("nan", "", day(1)),
            Post::new("nan", "", day(2)),
        ];

        let daily = aggregator.daily_average(&posts).unwrap();

        assert_eq!(daily.get(day(1)), Some(0.3));
        assert_eq!(daily.get(day(2)), None);
        assert_eq!(daily.rejected(), 2);
    }

    #[test]
    fn test_scorer_failure_propagates() {
        let aggregator = SentimentAggregator::new(FixedScorer::new(&[]));
        let posts = vec![Post::new("unknown", "", day(1))];

        let result = aggregator.daily_average(&posts);
        assert!(matches!(result, Err(CoreError::Scoring(_))));
    }

    #[test]
    fn test_score_posts_keeps_timestamp() {
        let scorer = FixedScorer::new(&[("t", 1.0), ("b", 0.0)]);
        let aggregator = SentimentAggregator::new(scorer);
        let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 14, 30, 0).unwrap();
        let posts = vec![FeedPost {
            title: "t".to_string(),
            body: "b".to_string(),
            created_at,
        }];

        let scored = aggregator.score_posts(&posts, DayCalendar::Utc).unwrap();

        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].created_at, created_at);
        assert_eq!(scored[0].created_at.offset().local_minus_utc(), 0);
        assert_eq!(scored[0].title_sentiment, 1.0);
        assert_eq!(scored[0].overall_sentiment, 0.5);
    }

    #[test]
    fn test_score_posts_uses_local_calendar_offset() {
        let scorer = FixedScorer::new(&[("t", 0.0)]);
        let aggregator = SentimentAggregator::new(scorer);
        let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 14, 30, 0).unwrap();
        let posts = vec![FeedPost {
            title: "t".to_string(),
            body: "t".to_string(),
            created_at,
        }];

        let scored = aggregator.score_posts(&posts, DayCalendar::Local).unwrap();
        let expected = created_at.with_timezone(&chrono::Local);

        assert_eq!(scored[0].created_at, created_at);
        assert_eq!(
            scored[0].created_at.offset().local_minus_utc(),
            expected.offset().fix().local_minus_utc()
        );
    }
}
