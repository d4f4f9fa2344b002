//! Append-only query log.
//!
//! Each summarize request appends one JSON line to `search-log.jsonl`. When the
//! active file reaches `max_bytes` it is renamed to
//! `search-log-<timestamp>.jsonl` and a fresh file is started. Recording never
//! fails the caller: writes run on a detached blocking task and errors are
//! only logged.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

const LOG_FILE_NAME: &str = "search-log.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLogEntry {
    pub id: Uuid,
    pub query: String,
    pub source: String,
    pub ai_provider: String,
    pub timestamp: DateTime<Utc>,
}

impl SearchLogEntry {
    pub fn new(query: &str, source: &str, ai_provider: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.to_string(),
            source: source.to_string(),
            ai_provider: ai_provider.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct SearchLog {
    inner: Arc<Inner>,
}

struct Inner {
    dir: PathBuf,
    max_bytes: u64,
    // Serializes rotate + append across concurrent recorders.
    write_lock: Mutex<()>,
}

impl SearchLog {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                dir: dir.into(),
                max_bytes,
                write_lock: Mutex::new(()),
            }),
        }
    }

    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let dir = crate::config::search_log_dir(config)?;
        Ok(Self::new(dir, config.search_log.max_bytes))
    }

    /// Path of the active log file
    pub fn path(&self) -> PathBuf {
        self.inner.dir.join(LOG_FILE_NAME)
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Fire-and-forget: record a query on a detached blocking task.
    ///
    /// The handle may be dropped; it is returned so callers can wait for the
    /// write when they need to (tests, graceful shutdown).
    pub fn record_query(&self, query: &str, category: &str, provider: &str) -> Option<JoinHandle<()>> {
        let entry = SearchLogEntry::new(query, category, provider);
        let log = self.clone();

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("no async runtime, query not logged");
                return None;
            }
        };

        Some(handle.spawn_blocking(move || {
            if let Err(e) = log.append(&entry) {
                tracing::warn!(
                    error = %e,
                    query = %entry.query,
                    source = %entry.source,
                    ai_provider = %entry.ai_provider,
                    "search logging failed"
                );
            }
        }))
    }

    /// Append one entry, rotating first when the active file is full.
    pub fn append(&self, entry: &SearchLogEntry) -> Result<()> {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        fs::create_dir_all(&self.inner.dir).with_context(|| {
            format!("Failed to create log directory: {}", self.inner.dir.display())
        })?;
        self.rotate_if_needed()?;

        let mut line = serde_json::to_string(entry).context("Failed to serialize log entry")?;
        line.push('\n');

        let path = self.path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open search log: {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to write search log: {}", path.display()))?;

        Ok(())
    }

    fn rotate_if_needed(&self) -> Result<()> {
        let path = self.path();
        let Ok(meta) = fs::metadata(&path) else {
            return Ok(());
        };
        if meta.len() < self.inner.max_bytes {
            return Ok(());
        }

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let archive = self.free_archive_path(&stamp);
        fs::rename(&path, &archive)
            .with_context(|| format!("Failed to rotate search log to {}", archive.display()))?;

        tracing::info!(archive = %archive.display(), size = meta.len(), "rotated search log");
        Ok(())
    }

    /// First unused archive name for `stamp`; rename would replace an existing one.
    fn free_archive_path(&self, stamp: &str) -> PathBuf {
        let mut archive = self.inner.dir.join(format!("search-log-{stamp}.jsonl"));
        let mut n = 1u32;
        while archive.exists() {
            archive = self.inner.dir.join(format!("search-log-{stamp}-{n}.jsonl"));
            n += 1;
        }
        archive
    }

    /// All entries in the active file, newest first. Malformed lines are skipped.
    pub fn entries(&self) -> Result<Vec<SearchLogEntry>> {
        let path = self.path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read search log: {}", path.display()))?;

        let mut entries: Vec<SearchLogEntry> = content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed search log line");
                    None
                }
            })
            .collect();

        entries.reverse();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    /// Rotated archives, oldest first
    pub fn archives(&self) -> Result<Vec<PathBuf>> {
        if !self.inner.dir.exists() {
            return Ok(Vec::new());
        }

        let mut archives = Vec::new();
        for entry in fs::read_dir(&self.inner.dir).with_context(|| {
            format!("Failed to read log directory: {}", self.inner.dir.display())
        })? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            if name.starts_with("search-log-") && name.ends_with(".jsonl") {
                archives.push(entry.path());
            }
        }
        archives.sort();
        Ok(archives)
    }
}
