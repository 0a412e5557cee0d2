//! Paginated subreddit feed.

use std::collections::VecDeque;
use tracing::{debug, warn};
use tracker_core::{CoreError, FeedPost, FeedSource};

use crate::api::{ListingSort, RedditApiClient, RedditListing, RedditPostData, MAX_PAGE_SIZE};

/// One page of a listing, addressed by the `after` cursor of the previous page.
pub trait ListingFetcher {
    async fn fetch_page(
        &self,
        subreddit: &str,
        sort: ListingSort,
        limit: u32,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditPostData>, CoreError>;
}

impl ListingFetcher for RedditApiClient {
    async fn fetch_page(
        &self,
        subreddit: &str,
        sort: ListingSort,
        limit: u32,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        self.get_listing(subreddit, sort, limit, after).await
    }
}

/// Walks a subreddit listing page by page and yields its posts one at a time,
/// in listing order.
///
/// For [`ListingSort::New`] that order is newest first. Pages are only
/// requested when the previous one has been consumed.
pub struct SubredditFeed<F> {
    fetcher: F,
    subreddit: String,
    sort: ListingSort,
    cap: Option<usize>,
    buffer: VecDeque<FeedPost>,
    after: Option<String>,
    exhausted: bool,
    yielded: usize,
    pages: usize,
}

impl<F: ListingFetcher> SubredditFeed<F> {
    pub fn new(fetcher: F, subreddit: impl Into<String>, sort: ListingSort) -> Self {
        Self {
            fetcher,
            subreddit: subreddit.into(),
            sort,
            cap: None,
            buffer: VecDeque::new(),
            after: None,
            exhausted: false,
            yielded: 0,
            pages: 0,
        }
    }

    /// Newest-first feed of `subreddit`.
    pub fn newest(fetcher: F, subreddit: impl Into<String>) -> Self {
        Self::new(fetcher, subreddit, ListingSort::New)
    }

    /// Stops the feed after `cap` posts.
    pub fn with_cap(mut self, cap: Option<usize>) -> Self {
        self.cap = cap;
        self
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn posts_yielded(&self) -> usize {
        self.yielded
    }

    fn cap_reached(&self) -> bool {
        self.cap.is_some_and(|cap| self.yielded >= cap)
    }

    fn next_page_size(&self) -> u32 {
        let remaining = self
            .cap
            .map(|cap| cap.saturating_sub(self.yielded + self.buffer.len()))
            .unwrap_or(MAX_PAGE_SIZE as usize);
        remaining.clamp(1, MAX_PAGE_SIZE as usize) as u32
    }

    async fn fetch_next_page(&mut self) -> Result<(), CoreError> {
        let limit = self.next_page_size();
        let listing = self
            .fetcher
            .fetch_page(&self.subreddit, self.sort, limit, self.after.as_deref())
            .await?;
        self.pages += 1;

        let children = listing.data.children;
        if children.is_empty() {
            debug!("r/{} listing ended after {} pages", self.subreddit, self.pages);
            self.exhausted = true;
            return Ok(());
        }

        for child in children {
            let id = child.data.id.clone();
            match FeedPost::try_from(child.data) {
                Ok(post) => self.buffer.push_back(post),
                Err(e) => warn!("Skipping post {} from r/{}: {}", id, self.subreddit, e),
            }
        }

        self.after = listing.data.after;
        if self.after.is_none() {
            debug!("r/{} has no further pages", self.subreddit);
            self.exhausted = true;
        }
        Ok(())
    }
}

impl<F: ListingFetcher> FeedSource for SubredditFeed<F> {
    async fn next_post(&mut self) -> Result<Option<FeedPost>, CoreError> {
        if self.cap_reached() {
            return Ok(None);
        }

        while self.buffer.is_empty() && !self.exhausted {
            self.fetch_next_page().await?;
        }

        let post = self.buffer.pop_front();
        if post.is_some() {
            self.yielded += 1;
        }
        Ok(post)
    }
}
