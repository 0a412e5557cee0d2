use tracker_core::{
    ConfigError, CoreError, ErrorExt, ErrorReporter, FailureKind, RedditApiError, ScoringError,
    StoreError,
};

#[test]
fn test_failure_kinds() {
    let feed_error = CoreError::RedditApi(RedditApiError::RequestTimeout);
    assert_eq!(feed_error.failure_kind(), FailureKind::Upstream);

    let store_error = CoreError::Store(StoreError::WriteFailed {
        path: "reddit_posts.csv".to_string(),
    });
    assert_eq!(store_error.failure_kind(), FailureKind::Storage);

    let io_error = CoreError::Io(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "read only",
    ));
    assert_eq!(io_error.failure_kind(), FailureKind::Storage);

    let scoring_error = CoreError::Scoring(ScoringError::ScorerFailed {
        scorer: "lexicon".to_string(),
        reason: "boom".to_string(),
    });
    assert_eq!(scoring_error.failure_kind(), FailureKind::Scoring);

    let config_error = CoreError::Config(ConfigError::MissingField {
        field: "subreddit".to_string(),
    });
    assert_eq!(config_error.failure_kind(), FailureKind::Configuration);

    let input_error = CoreError::InvalidInput {
        message: "bad window".to_string(),
    };
    assert_eq!(input_error.failure_kind(), FailureKind::Input);
}

#[test]
fn test_error_codes() {
    let rate_limited = CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 60 });
    assert_eq!(rate_limited.error_code(), "FEED_RATE_LIMITED");

    let server_error = CoreError::RedditApi(RedditApiError::ServerError { status_code: 503 });
    assert_eq!(server_error.error_code(), "FEED_SERVER_ERROR");

    let corrupt = CoreError::Store(StoreError::CorruptRow {
        path: "reddit_posts.csv".to_string(),
        row: 3,
        reason: "bad date".to_string(),
    });
    assert_eq!(corrupt.error_code(), "STORE_CORRUPT_ROW");

    let invalid = CoreError::Config(ConfigError::InvalidValue {
        field: "window_days".to_string(),
        value: "fifty".to_string(),
    });
    assert_eq!(invalid.error_code(), "CONFIG_INVALID_VALUE");
}

#[test]
fn test_feed_failures_mention_kept_batches() {
    let not_found = CoreError::RedditApi(RedditApiError::SubredditNotFound {
        subreddit: "wallstreetbets".to_string(),
    });
    let message = not_found.user_friendly_message();
    assert!(message.contains("wallstreetbets"));
    assert!(message.contains("rerun"));

    let rate_limited = CoreError::RedditApi(RedditApiError::RateLimitExceeded { retry_after: 42 });
    assert!(rate_limited.user_friendly_message().contains("42 seconds"));
}

#[test]
fn test_config_messages_name_the_field() {
    let missing = CoreError::Config(ConfigError::MissingField {
        field: "subreddit".to_string(),
    });
    assert!(missing.user_friendly_message().contains("subreddit"));

    let invalid = CoreError::Config(ConfigError::InvalidValue {
        field: "window_days".to_string(),
        value: "fifty".to_string(),
    });
    let message = invalid.user_friendly_message();
    assert!(message.contains("window_days"));
    assert!(message.contains("fifty"));
}

#[test]
fn test_error_reporter() {
    let reporter = ErrorReporter::new();
    let error = CoreError::RedditApi(RedditApiError::RequestTimeout);

    // This test just ensures reporting doesn't panic
    reporter.report_error(&error);
    assert_eq!(error.log_error().error_code(), "FEED_TIMEOUT");
}
