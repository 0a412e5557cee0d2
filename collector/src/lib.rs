pub mod pacing;
pub mod window;

#[cfg(test)]
mod tests;

pub use pacing::{FixedDelayPacer, Pacer, RateLimitConfig, TokenBucket, TokenBucketPacer};
pub use window::{Collection, CollectionReport, StopReason, WindowedCollector};
