// src/archive/store.rs
//! Per-(topic, date) archive records under `<base_dir>/<topic_id>/<YYYY-MM-DD>.md`.
//!
//! Single writer per file is assumed; there is no locking.

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::archive::document::{ArchiveDocument, ParsedArchive};
use crate::ingest::types::ClassifiedItem;
use crate::telemetry;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
const RECORD_EXT: &str = "md";

/// How `save` treats an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Regenerate derived sections, keep the human-editable regions of the old file.
    #[default]
    Merge,
    /// Replace the file in full.
    Overwrite,
}

/// Topic ids become directory names: one plain path component only.
pub fn validate_topic_id(topic_id: &str) -> Result<()> {
    let ok = !topic_id.is_empty()
        && topic_id != "."
        && topic_id != ".."
        && !topic_id.contains(['/', '\\'])
        && !topic_id.contains('\0');
    if ok {
        Ok(())
    } else {
        Err(anyhow!("invalid topic id `{topic_id}`"))
    }
}

#[derive(Debug, Clone)]
pub struct TopicArchive {
    base_dir: PathBuf,
}

impl TopicArchive {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn topic_dir(&self, topic_id: &str) -> PathBuf {
        self.base_dir.join(topic_id)
    }

    pub fn record_path(&self, topic_id: &str, date: NaiveDate) -> PathBuf {
        self.topic_dir(topic_id)
            .join(format!("{}.{RECORD_EXT}", date.format(DATE_FORMAT)))
    }

    /// Write the record for (`topic_id`, `date`) and return its path.
    ///
    /// In [`SaveMode::Merge`] an existing record's human notes and importance marks are
    /// spliced into the regenerated document. An unreadable old record is treated as absent.
    pub fn save(
        &self,
        date: NaiveDate,
        topic_id: &str,
        topic_name: &str,
        items: &[ClassifiedItem],
        mode: SaveMode,
    ) -> Result<PathBuf> {
        validate_topic_id(topic_id)?;
        let dir = self.topic_dir(topic_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating topic directory {}", dir.display()))?;

        let path = self.record_path(topic_id, date);
        let date_str = date.format(DATE_FORMAT).to_string();
        let mut doc = ArchiveDocument::from_items(topic_name, &date_str, items);

        if mode == SaveMode::Merge && path.exists() {
            match fs::read_to_string(&path) {
                Ok(existing) => {
                    doc = doc.with_human_regions(&ParsedArchive::parse(&existing));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "existing record unreadable, writing fresh");
                }
            }
        }

        let result = write_atomic(&path, &doc.render());
        match &result {
            Ok(()) => {
                telemetry::archive_saved();
                info!(
                    topic = %topic_id,
                    date = %date_str,
                    items = doc.stats.total,
                    kept_notes = doc.human_notes.is_some(),
                    "archive record saved"
                );
            }
            Err(e) => {
                telemetry::archive_save_failed();
                warn!(topic = %topic_id, date = %date_str, error = ?e, "archive record not saved");
            }
        }
        result.map(|()| path)
    }

    /// Raw record text, or `None` if there is no readable record.
    pub fn read(&self, topic_id: &str, date: NaiveDate) -> Option<String> {
        validate_topic_id(topic_id).ok()?;
        let path = self.record_path(topic_id, date);
        match fs::read_to_string(&path) {
            Ok(s) => Some(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "archive record unreadable");
                None
            }
        }
    }

    /// Parsed record for (`topic_id`, `date`), if present.
    pub fn read_parsed(&self, topic_id: &str, date: NaiveDate) -> Option<ParsedArchive> {
        self.read(topic_id, date).map(|s| ParsedArchive::parse(&s))
    }

    /// Dates with a record for `topic_id`, newest first. Derived from file names.
    pub fn list_dates(&self, topic_id: &str) -> Vec<NaiveDate> {
        if validate_topic_id(topic_id).is_err() {
            return Vec::new();
        }
        let Ok(entries) = fs::read_dir(self.topic_dir(topic_id)) else {
            return Vec::new();
        };
        let mut dates: Vec<NaiveDate> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|s| s.to_str()) == Some(RECORD_EXT))
            .filter_map(|p| {
                let stem = p.file_stem()?.to_str()?.to_string();
                match NaiveDate::parse_from_str(&stem, DATE_FORMAT) {
                    Ok(d) => Some(d),
                    Err(_) => {
                        debug!(file = %p.display(), "not a dated record, ignored");
                        None
                    }
                }
            })
            .collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));
        dates
    }

    /// Topic directories present on disk, sorted by name.
    pub fn list_topics(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.base_dir) else {
            return Vec::new();
        };
        let mut topics: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(String::from))
            .collect();
        topics.sort();
        topics
    }
}

/// Write via a sibling temp file + rename so a failed write leaves the old record intact.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("invalid record path {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));
    fs::write(&tmp, content).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
