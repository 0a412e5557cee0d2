pub mod api;
pub mod feed;


pub use api::{ListingSort, RedditApiClient, RedditListing, RedditPostData};
pub use feed::{ListingFetcher, SubredditFeed};
