use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracker_core::{BatchSink, CoreError, Post, StoreError};

use crate::PostStore;

const HEADER: [&str; 3] = ["Title", "Text", "Date"];

#[derive(Debug, Serialize, Deserialize)]
struct PostRow {
    #[serde(rename = "Title")]
    title: String,
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "Date")]
    date: NaiveDate,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post::new(row.title, row.text, row.date)
    }
}

impl<'a> From<&'a Post> for PostRow {
    fn from(post: &'a Post) -> Self {
        Self {
            title: post.title.clone(),
            text: post.body.clone(),
            date: post.date,
        }
    }
}

/// The CSV file a [`PostStore`] lives in between runs.
///
/// Not safe for concurrent writers: two runs against the same path can lose
/// each other's updates.
#[derive(Debug, Clone)]
pub struct StoreFile {
    path: PathBuf,
}

impl StoreFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the store. A missing or unreadable file is an empty store.
    ///
    /// An unreadable file is copied aside to `<path>.corrupt` before it is
    /// treated as empty, since the next persist overwrites it.
    pub fn load(&self) -> PostStore {
        if !self.path.exists() {
            debug!("No store file at {}, starting empty", self.path.display());
            return PostStore::new();
        }

        match self.read_rows() {
            Ok(posts) => {
                let store = PostStore::from_posts(posts);
                info!(
                    "Loaded {} posts from {}",
                    store.len(),
                    self.path.display()
                );
                store
            }
            Err(e) => {
                warn!(
                    "Store file {} is unreadable, treating it as empty: {}",
                    self.path.display(),
                    e
                );
                let backup = self.corrupt_backup_path();
                if let Err(copy_err) = fs::copy(&self.path, &backup) {
                    warn!(
                        "Could not keep a copy of the unreadable store at {}: {}",
                        backup.display(),
                        copy_err
                    );
                }
                PostStore::new()
            }
        }
    }

    /// Overwrites the file with the full contents of `store`.
    pub fn persist(&self, store: &PostStore) -> Result<(), CoreError> {
        let tmp_path = self.tmp_path();
        self.write_rows(&tmp_path, store)?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            warn!("Failed to replace {}: {}", self.path.display(), e);
            StoreError::WriteFailed {
                path: self.path.display().to_string(),
            }
        })?;

        info!("Saved {} posts to {}", store.len(), self.path.display());
        Ok(())
    }

    fn read_rows(&self) -> Result<Vec<Post>, CoreError> {
        let file = File::open(&self.path)?;
        let mut reader = csv::Reader::from_reader(file);

        let mut posts = Vec::new();
        for (index, result) in reader.deserialize::<PostRow>().enumerate() {
            let row = result.map_err(|e| StoreError::CorruptRow {
                path: self.path.display().to_string(),
                row: index + 1,
                reason: e.to_string(),
            })?;
            posts.push(row.into());
        }
        Ok(posts)
    }

    fn write_rows(&self, path: &Path, store: &PostStore) -> Result<(), CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        // Written explicitly so an empty store still round-trips as a valid table.
        writer.write_record(HEADER).map_err(StoreError::from)?;
        for post in store.iter() {
            writer
                .serialize(PostRow::from(post))
                .map_err(StoreError::from)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn corrupt_backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }
}

impl BatchSink for StoreFile {
    fn flush(&mut self, collected: &[Post]) -> Result<(), CoreError> {
        let merged = self.load().merge(collected.iter().cloned());
        self.persist(&merged)
    }
}
