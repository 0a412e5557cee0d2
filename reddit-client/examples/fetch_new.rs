use reddit_client::{RedditApiClient, SubredditFeed};
use tracker_core::FeedSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let subreddit = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "wallstreetbets".to_string());

    println!("=== Newest posts in r/{} ===\n", subreddit);

    let client = RedditApiClient::new("sentiment-tracker/0.1 example".to_string())?;
    let mut feed = SubredditFeed::newest(client, subreddit).with_cap(Some(10));

    while let Some(post) = feed.next_post().await? {
        println!("{}  {}", post.created_at.format("%Y-%m-%d %H:%M"), post.title);
    }

    println!("\nFetched {} pages", feed.pages_fetched());
    Ok(())
}
