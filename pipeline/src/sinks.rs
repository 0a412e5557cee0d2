//! Output sinks for the daily series and snapshot rows.

use chrono::NaiveDate;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracker_core::{CoreError, StoreError};

use sentiment::{DailySentiment, ScoredPost};

pub trait SeriesSink {
    /// Receives the daily series; days arrive in ascending date order.
    fn emit(&mut self, series: &DailySentiment) -> Result<(), CoreError>;
}

/// Prints the series as a plain-text table.
pub struct TableSink<W> {
    out: W,
    title: String,
}

impl TableSink<std::io::Stdout> {
    pub fn stdout(title: impl Into<String>) -> Self {
        Self::new(std::io::stdout(), title)
    }
}

impl<W: Write> TableSink<W> {
    pub fn new(out: W, title: impl Into<String>) -> Self {
        Self {
            out,
            title: title.into(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SeriesSink for TableSink<W> {
    fn emit(&mut self, series: &DailySentiment) -> Result<(), CoreError> {
        writeln!(self.out, "{}", self.title)?;
        writeln!(self.out, "{:<12} {:>10} {:>7}", "Date", "Sentiment", "Posts")?;
        for (date, day) in series.iter() {
            writeln!(
                self.out,
                "{:<12} {:>10.4} {:>7}",
                date.format("%Y-%m-%d"),
                day.mean,
                day.posts
            )?;
        }
        if series.rejected() > 0 {
            writeln!(
                self.out,
                "({} posts without a usable score were left out)",
                series.rejected()
            )?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SeriesRow {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Overall_Sentiment")]
    mean: f64,
    #[serde(rename = "Posts")]
    posts: usize,
}

/// Writes the series to a CSV file, replacing previous contents.
pub struct CsvSeriesSink {
    path: PathBuf,
}

impl CsvSeriesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SeriesSink for CsvSeriesSink {
    fn emit(&mut self, series: &DailySentiment) -> Result<(), CoreError> {
        let rows = series.iter().map(|(date, day)| SeriesRow {
            date,
            mean: day.mean,
            posts: day.posts,
        });
        write_csv(&self.path, &["Date", "Overall_Sentiment", "Posts"], rows)?;
        info!("Daily series written to {}", self.path.display());
        Ok(())
    }
}

/// Writes scored snapshot rows to `path`.
pub fn write_snapshot(path: &Path, posts: &[ScoredPost]) -> Result<(), CoreError> {
    write_csv(
        path,
        &[
            "Title",
            "Text",
            "Date",
            "Sentiment_Title",
            "Sentiment_Text",
            "Overall_Sentiment",
        ],
        posts.iter(),
    )?;
    info!("Snapshot of {} posts written to {}", posts.len(), path.display());
    Ok(())
}

fn write_csv<T, I>(path: &Path, header: &[&str], rows: I) -> Result<(), CoreError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer.write_record(header).map_err(StoreError::from)?;
    for row in rows {
        writer.serialize(row).map_err(StoreError::from)?;
    }
    writer.flush()?;
    Ok(())
}
