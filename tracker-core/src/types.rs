use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A post as yielded by a feed source, before it is pinned to a calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPost {
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// A collected post as kept in the durable store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub title: String,
    pub body: String,
    pub date: NaiveDate,
}

/// Deduplication identity of a post.
///
/// Two posts are the same post iff title and body are byte-equal. The feed's
/// native post id is deliberately not part of the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostKey<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

impl Post {
    pub fn new(title: impl Into<String>, body: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            date,
        }
    }

    pub fn from_feed(post: FeedPost, calendar: DayCalendar) -> Self {
        let date = calendar.date_of(post.created_at);
        Self {
            title: post.title,
            body: post.body,
            date,
        }
    }

    pub fn key(&self) -> PostKey<'_> {
        PostKey {
            title: &self.title,
            body: &self.body,
        }
    }
}

/// Which clock decides the calendar day of a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DayCalendar {
    #[default]
    Local,
    Utc,
}

impl DayCalendar {
    pub fn date_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        match self {
            DayCalendar::Local => timestamp.with_timezone(&Local).date_naive(),
            DayCalendar::Utc => timestamp.date_naive(),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    /// `timestamp` as wall-clock time on this calendar.
    pub fn local_time(&self, timestamp: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            DayCalendar::Local => timestamp.with_timezone(&Local).fixed_offset(),
            DayCalendar::Utc => timestamp.fixed_offset(),
        }
    }
}

/// Inclusive `[start, end]` range of calendar days to collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl CollectionWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::InvalidInput {
                message: format!("window start {} is after window end {}", start, end),
            });
        }
        Ok(Self { start, end })
    }

    /// The window covering `days` days before `end` up to and including `end`.
    pub fn ending_on(end: NaiveDate, days: u32) -> Result<Self, CoreError> {
        let start = end
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| CoreError::InvalidInput {
                message: format!("a window of {} days before {} is out of range", days, end),
            })?;
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// True when `date` lies strictly before the window start.
    pub fn is_before_start(&self, date: NaiveDate) -> bool {
        date < self.start
    }
}

/// How the collector treats the newest-first ordering of the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingPolicy {
    /// Stop at the first post dated before the window start.
    #[default]
    EarlyStop,
    /// Never stop early; scan until the source is exhausted.
    FullScan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Collect the date window, merge into the store, aggregate per day.
    #[default]
    Windowed,
    /// Score a capped listing of currently popular posts without touching the store.
    Snapshot,
}

/// How the collector waits between feed reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacerKind {
    /// Constant pauses after every post and every batch.
    #[default]
    Fixed,
    /// Waits only when a requests-per-minute budget is used up.
    TokenBucket,
}
