use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracker_core::{CoreError, FeedPost, RedditApiError};
use url::Url;

const REDDIT_BASE: &str = "https://www.reddit.com";

/// Largest page Reddit serves for a listing request.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSort {
    New,
    Hot,
}

impl ListingSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingSort::New => "new",
            ListingSort::Hot => "hot",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
    #[serde(default)]
    pub stickied: bool,
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    base_url: Url,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_BASE)
    }

    pub fn with_base_url(user_agent: String, base_url: &str) -> Result<Self, CoreError> {
        let base_url = Url::parse(base_url).map_err(|e| CoreError::InvalidInput {
            message: format!("invalid feed base url {}: {}", base_url, e),
        })?;

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// `{base}/r/{subreddit}/{sort}.json?limit=..&after=..&raw_json=1`
    pub fn listing_url(
        &self,
        subreddit: &str,
        sort: ListingSort,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Url, CoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CoreError::InvalidInput {
                message: format!("feed base url {} cannot hold a path", self.base_url),
            })?
            .pop_if_empty()
            .push("r")
            .push(subreddit)
            .push(&format!("{}.json", sort.as_str()));

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.min(MAX_PAGE_SIZE).to_string());
            if let Some(after) = after {
                query.append_pair("after", after);
            }
            query.append_pair("raw_json", "1");
        }
        Ok(url)
    }

    async fn make_request(&self, url: Url, subreddit: &str) -> Result<Response, CoreError> {
        info!("Making Reddit request: GET {}", url.path());

        let response = match self.http_client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {}: {}", url.path(), e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, url.path());
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, url.path());
        let err = match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            StatusCode::UNAUTHORIZED => RedditApiError::AuthenticationFailed {
                reason: "request was not authorized".to_string(),
            },
            StatusCode::FORBIDDEN => RedditApiError::Forbidden {
                resource: format!("r/{}", subreddit),
            },
            StatusCode::NOT_FOUND => RedditApiError::SubredditNotFound {
                subreddit: subreddit.to_string(),
            },
            s if s.is_server_error() => RedditApiError::ServerError {
                status_code: s.as_u16(),
            },
            s => RedditApiError::InvalidResponse {
                details: format!("unexpected status {}", s),
            },
        };
        Err(CoreError::RedditApi(err))
    }

    pub async fn get_listing(
        &self,
        subreddit: &str,
        sort: ListingSort,
        limit: u32,
        after: Option<&str>,
    ) -> Result<RedditListing<RedditPostData>, CoreError> {
        let url = self.listing_url(subreddit, sort, limit, after)?;
        let response = self.make_request(url, subreddit).await?;

        let listing: RedditListing<RedditPostData> = response.json().await.map_err(|e| {
            error!("Failed to parse subreddit posts: {}", e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse posts for r/{}", subreddit),
            })
        })?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }
}

impl TryFrom<RedditPostData> for FeedPost {
    type Error = CoreError;

    fn try_from(post_data: RedditPostData) -> Result<Self, Self::Error> {
        let seconds = post_data.created_utc.trunc() as i64;
        let created_at = DateTime::<Utc>::from_timestamp(seconds, 0).ok_or_else(|| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!(
                    "post {} has invalid created_utc {}",
                    post_data.id, post_data.created_utc
                ),
            })
        })?;

        Ok(Self {
            title: post_data.title,
            body: post_data.selftext,
            created_at,
        })
    }
}
