//! End-to-end runs: collect a window into the post store and report daily
//! sentiment, or score a one-off snapshot of a listing.

pub mod driver;
pub mod sinks;


pub use driver::{Pipeline, RunSummary, SnapshotSummary};
pub use sinks::{write_snapshot, CsvSeriesSink, SeriesSink, TableSink};
