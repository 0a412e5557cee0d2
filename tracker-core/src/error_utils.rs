//! Classifying and reporting a failed run.
//!
//! Nothing in a run is retried, so a failure ends the run. What the operator
//! needs to know is where it broke and what state the post store was left in.

use std::fmt;
use tracing::{debug, error, info};

use crate::error::{ConfigError, CoreError, RedditApiError, ScoringError, StoreError};

/// The stage of a run a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Reading the feed: network, HTTP status or an unparseable listing.
    Upstream,
    /// Reading or writing the post store and output files.
    Storage,
    Scoring,
    Configuration,
    /// A bad argument from the caller, such as an inverted window.
    Input,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Upstream => "upstream",
            FailureKind::Storage => "storage",
            FailureKind::Scoring => "scoring",
            FailureKind::Configuration => "configuration",
            FailureKind::Input => "input",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ErrorExt {
    fn failure_kind(&self) -> FailureKind;
    fn error_code(&self) -> &'static str;
    fn user_friendly_message(&self) -> String;
    fn log_error(&self) -> &Self;
}

impl ErrorExt for CoreError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            CoreError::RedditApi(_) | CoreError::Network(_) => FailureKind::Upstream,
            CoreError::Store(_) | CoreError::Io(_) => FailureKind::Storage,
            CoreError::Scoring(_) => FailureKind::Scoring,
            CoreError::Config(_) => FailureKind::Configuration,
            CoreError::InvalidInput { .. } => FailureKind::Input,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::RedditApi(e) => feed_code(e),
            CoreError::Network(_) => "FEED_NETWORK",
            CoreError::Store(StoreError::WriteFailed { .. }) => "STORE_WRITE_FAILED",
            CoreError::Store(StoreError::CorruptRow { .. }) => "STORE_CORRUPT_ROW",
            CoreError::Store(StoreError::Csv(_)) => "STORE_CSV",
            CoreError::Io(_) => "FILE_IO",
            CoreError::Scoring(ScoringError::ScorerFailed { .. }) => "SCORER_FAILED",
            CoreError::Config(e) => config_code(e),
            CoreError::InvalidInput { .. } => "INVALID_INPUT",
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => format!(
                "{} Batches saved before the failure are kept; rerun to continue.",
                feed_message(e)
            ),
            CoreError::Network(_) => "Could not reach Reddit. Batches saved before the failure \
                                      are kept; rerun to continue."
                .to_string(),
            CoreError::Store(StoreError::WriteFailed { path }) => format!(
                "Could not replace the post store at {}. The previous file is unchanged.",
                path
            ),
            CoreError::Store(_) | CoreError::Io(_) => {
                format!("Reading or writing a data file failed: {}", self)
            }
            CoreError::Scoring(ScoringError::ScorerFailed { scorer, .. }) => format!(
                "Sentiment scorer '{}' could not score a post. The store was not updated \
                 and no series was written.",
                scorer
            ),
            CoreError::Config(ConfigError::MissingField { field }) => {
                format!("Required configuration field '{}' is missing.", field)
            }
            CoreError::Config(ConfigError::InvalidValue { field, value }) => {
                format!("'{}' is not a valid value for '{}'.", value, field)
            }
            CoreError::Config(e) => format!("Configuration problem: {}", e),
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
        }
    }

    fn log_error(&self) -> &Self {
        error!(
            "Run failed at the {} stage [{}]: {}",
            self.failure_kind(),
            self.error_code(),
            self
        );
        debug!("Error details: {:?}", self);
        self
    }
}

fn feed_code(error: &RedditApiError) -> &'static str {
    match error {
        RedditApiError::AuthenticationFailed { .. } => "FEED_UNAUTHORIZED",
        RedditApiError::RateLimitExceeded { .. } => "FEED_RATE_LIMITED",
        RedditApiError::Forbidden { .. } => "FEED_FORBIDDEN",
        RedditApiError::SubredditNotFound { .. } => "FEED_NOT_FOUND",
        RedditApiError::RequestTimeout => "FEED_TIMEOUT",
        RedditApiError::InvalidResponse { .. } => "FEED_BAD_RESPONSE",
        RedditApiError::ServerError { .. } => "FEED_SERVER_ERROR",
    }
}

fn feed_message(error: &RedditApiError) -> String {
    match error {
        RedditApiError::RateLimitExceeded { retry_after } => format!(
            "Reddit is rate limiting this client; wait {} seconds or raise the pacing delays.",
            retry_after
        ),
        RedditApiError::SubredditNotFound { subreddit } => {
            format!("Subreddit '{}' does not exist or is private.", subreddit)
        }
        RedditApiError::Forbidden { resource } => {
            format!("Reddit denied access to {}.", resource)
        }
        RedditApiError::AuthenticationFailed { .. } => {
            "Reddit refused the request; check the configured user agent.".to_string()
        }
        _ => format!("Fetching the listing failed: {}", error),
    }
}

fn config_code(error: &ConfigError) -> &'static str {
    match error {
        ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND",
        ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
        ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
        ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED",
        ConfigError::Parse(_) => "CONFIG_PARSE_ERROR",
    }
}

/// Reports the error that ended a run.
#[derive(Debug, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("{}", error.user_friendly_message());
    }
}
