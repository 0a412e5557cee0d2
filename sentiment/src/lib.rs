pub mod aggregator;
pub mod scorer;

pub use aggregator::{DailySentiment, DayAggregate, ScoredPost, SentimentAggregator};
pub use scorer::{LexiconScorer, SentimentScorer};
