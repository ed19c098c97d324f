use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tagreel_core::VideoId;
use thiserror::Error;

/// Durable record of every video id that completed the pipeline.
///
/// One record per line, `<id>\t<rfc3339 timestamp>`; the timestamp is
/// informational and ignored on load, so older files carrying bare ids
/// stay readable. Appends are synced before `record` returns: a crash
/// right after a successful transform never leaves the output file
/// behind without its store entry.
#[derive(Debug)]
pub struct ProcessedStore {
    path: PathBuf,
    ids: HashSet<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file exists but cannot be decoded.
    #[error("store file {} is unreadable: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ProcessedStore {
    /// Opens the store at `path` and loads the full id set. A missing
    /// file is an empty store. Duplicate lines collapse to a single
    /// membership.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    ids: HashSet::new(),
                });
            }
            Err(err) => return Err(StoreError::Io(err)),
        };
        let text = String::from_utf8(raw).map_err(|err| StoreError::Unreadable {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        let ids = text
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(ToOwned::to_owned)
            .collect();
        Ok(Self { path, ids })
    }

    /// Fresh store with nothing loaded, for recovering from an unreadable
    /// file without refusing the whole job.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids: HashSet::new(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `id` with a timestamp and syncs the file. The id counts as
    /// processed only once this returns `Ok`.
    pub fn record(&mut self, id: &VideoId) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}\t{}", id, Utc::now().to_rfc3339())?;
        file.sync_all()?;
        self.ids.insert(id.as_str().to_owned());
        Ok(())
    }
}
