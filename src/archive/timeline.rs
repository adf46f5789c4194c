// src/archive/timeline.rs
//! Legacy per-topic timeline (`<index_dir>/<topic_id>/timeline.md`).
//!
//! Append-only, grouped by date, deduplicated by URL against everything already in the file.
//! New blocks go right after the first heading line so header metadata stays on top.
//! Kept for compatibility with router-style output; the dated archive is the canonical store.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::archive::store::{validate_topic_id, write_atomic};
use crate::ingest::types::Trend;
use crate::telemetry;

const TIMELINE_FILE: &str = "timeline.md";
const LINK_LABEL: &str = "**链接**：";
const NO_LINK: &str = "（无链接）";
const NO_SUMMARY: &str = "（无摘要）";
const JUDGEMENT_PLACEHOLDER: &str = "（留空，供人工补充）";

fn link_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\*\*链接\*\*：(https?://\S+)").expect("link regex"))
}

/// Every URL recorded in an existing timeline.
pub fn existing_urls(content: &str) -> HashSet<String> {
    link_regex()
        .captures_iter(content)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Keep items without a URL, and items whose URL the timeline does not contain yet.
pub fn dedupe_against_existing<'a>(existing: &str, items: &[&'a Trend]) -> Vec<&'a Trend> {
    let seen = existing_urls(existing);
    items
        .iter()
        .copied()
        .filter(|t| t.url.as_ref().map_or(true, |u| !seen.contains(u)))
        .collect()
}

fn render_blocks(trends: &[&Trend]) -> String {
    let mut by_date: BTreeMap<&str, Vec<&Trend>> = BTreeMap::new();
    for t in trends {
        by_date.entry(t.date.as_str()).or_default().push(t);
    }

    let mut out = String::new();
    for (date, group) in by_date.iter().rev() {
        out.push_str(&format!("\n## {date}\n"));
        for t in group {
            out.push_str(&format!("\n**标题**：{}  \n", t.title));
            out.push_str(&format!("**来源**：{}  \n", t.source));
            out.push_str(&format!(
                "{LINK_LABEL}{}\n",
                t.url.as_deref().unwrap_or(NO_LINK)
            ));
            out.push_str(&format!(
                "\n**摘要**：  \n{}\n",
                t.summary.as_deref().unwrap_or(NO_SUMMARY)
            ));
            out.push_str(&format!("\n**我的判断**：  \n{JUDGEMENT_PLACEHOLDER}\n"));
            out.push_str("\n---\n");
        }
    }
    out
}

/// Insert `blocks` right after the first heading line of `existing`.
fn splice_after_header(existing: &str, blocks: &str) -> String {
    let lines: Vec<&str> = existing.split('\n').collect();
    let header_end = lines
        .iter()
        .position(|l| l.starts_with('#'))
        .map_or(0, |i| i + 1);
    format!(
        "{}\n{}{}",
        lines[..header_end].join("\n"),
        blocks,
        lines[header_end..].join("\n")
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineUpdate {
    pub path: PathBuf,
    pub added: usize,
    pub deduped: usize,
}

#[derive(Debug, Clone)]
pub struct TimelineStore {
    index_dir: PathBuf,
}

impl TimelineStore {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
        }
    }

    pub fn timeline_path(&self, topic_id: &str) -> PathBuf {
        self.index_dir.join(topic_id).join(TIMELINE_FILE)
    }

    /// Prepend the not-yet-recorded `trends` to the topic's timeline.
    pub fn append(&self, topic_id: &str, topic_name: &str, trends: &[&Trend]) -> Result<TimelineUpdate> {
        validate_topic_id(topic_id)?;
        let path = self.timeline_path(topic_id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating timeline directory {}", dir.display()))?;
        }

        let existing = read_existing(&path)?;
        let fresh = dedupe_against_existing(existing.as_deref().unwrap_or(""), trends);
        let deduped = trends.len() - fresh.len();
        telemetry::timeline_updated(fresh.len(), deduped);

        if fresh.is_empty() {
            info!(topic = %topic_id, deduped, "timeline has nothing new");
            return Ok(TimelineUpdate {
                path,
                added: 0,
                deduped,
            });
        }

        let blocks = render_blocks(&fresh);
        let content = match existing {
            Some(old) => splice_after_header(&old, &blocks),
            None => format!("# {topic_name}\n{blocks}"),
        };
        write_atomic(&path, &content)?;
        info!(topic = %topic_id, added = fresh.len(), deduped, "timeline updated");

        Ok(TimelineUpdate {
            path,
            added: fresh.len(),
            deduped,
        })
    }
}

fn read_existing(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading timeline {}", path.display())),
    }
}
