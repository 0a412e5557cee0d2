use crate::error::CoreError;
use crate::types::{FeedPost, Post};

/// A feed of posts for one community, newest first.
///
/// Implementations are expected to yield posts in non-increasing creation
/// time. Nothing enforces this; consumers that rely on it must cope with a
/// source that breaks it.
pub trait FeedSource {
    /// Returns the next post, or `Ok(None)` once the feed is exhausted.
    async fn next_post(&mut self) -> Result<Option<FeedPost>, CoreError>;
}

impl FeedSource for std::vec::IntoIter<FeedPost> {
    async fn next_post(&mut self) -> Result<Option<FeedPost>, CoreError> {
        Ok(self.next())
    }
}

/// Durable destination for partially collected results.
pub trait BatchSink {
    /// Merges everything collected so far into durable storage.
    fn flush(&mut self, collected: &[Post]) -> Result<(), CoreError>;
}
