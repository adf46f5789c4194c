// src/topics.rs
//! Topic definitions and the keyword classifier.
//!
//! - Loads `topics.yaml` (`topics: [{id, name, keywords, description?, priority?}]`).
//! - Invalid entries are dropped with a warning; a missing or malformed file yields no topics.
//! - Classification fans out: one item may land in several topics.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::ingest::types::{ClassifiedItem, HotlistFeed, RssFeed, Trend};
use crate::matcher;

pub const DEFAULT_PRIORITY: i64 = 999;

fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

/// A keyword-defined bucket used for long-term tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicDefinition {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
}

impl TopicDefinition {
    /// First-hit keyword scan.
    pub fn matches(&self, text: &str) -> bool {
        matcher::matches_any(text, &self.keywords).is_some()
    }
}

#[derive(Debug, Default, Deserialize)]
struct TopicsFile {
    #[serde(default)]
    topics: Option<Vec<serde_yaml::Value>>,
}

/// Loose shape used to validate one entry before accepting it.
#[derive(Debug, Deserialize)]
struct RawTopic {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<i64>,
}

fn validate(value: serde_yaml::Value) -> Option<TopicDefinition> {
    let raw: RawTopic = match serde_yaml::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "topic entry is malformed, skipped");
            return None;
        }
    };
    let id = raw.id.map(|s| s.trim().to_string()).unwrap_or_default();
    let name = raw.name.map(|s| s.trim().to_string()).unwrap_or_default();
    let keywords: Vec<String> = raw
        .keywords
        .unwrap_or_default()
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    if id.is_empty() || name.is_empty() || keywords.is_empty() {
        warn!(topic = %id, name = %name, "topic entry incomplete (id, name and keywords required), skipped");
        return None;
    }
    Some(TopicDefinition {
        id,
        name,
        keywords,
        description: raw.description.unwrap_or_default(),
        priority: raw.priority.unwrap_or(DEFAULT_PRIORITY),
    })
}

/// Parse topic definitions from YAML text. Never fails: problems are logged.
pub fn parse_topics(yaml: &str) -> Vec<TopicDefinition> {
    let file = match serde_yaml::from_str::<Option<TopicsFile>>(yaml) {
        Ok(Some(f)) => f,
        Ok(None) => TopicsFile::default(),
        Err(e) => {
            warn!(error = %e, "topic config is not valid YAML");
            return Vec::new();
        }
    };
    let entries = file.topics.unwrap_or_default();
    if entries.is_empty() {
        warn!("topic config has no topics");
        return Vec::new();
    }

    let mut topics: Vec<TopicDefinition> = Vec::with_capacity(entries.len());
    for t in entries.into_iter().filter_map(validate) {
        if topics.iter().any(|seen| seen.id == t.id) {
            warn!(topic = %t.id, "duplicate topic id, later entry skipped");
            continue;
        }
        topics.push(t);
    }
    topics
}

/// Load topic definitions from a file. A missing or unreadable file yields no topics.
pub fn load_topics(path: &Path) -> Vec<TopicDefinition> {
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "topic config not readable");
            return Vec::new();
        }
    };
    let topics = parse_topics(&content);
    info!(path = %path.display(), count = topics.len(), "topic config loaded");
    topics
}

/// Items grouped per topic. Topics appear in first-matched order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    buckets: Vec<(String, Vec<ClassifiedItem>)>,
}

impl Classification {
    fn push(&mut self, topic_id: &str, item: ClassifiedItem) {
        match self.buckets.iter_mut().find(|(id, _)| id == topic_id) {
            Some((_, items)) => items.push(item),
            None => self.buckets.push((topic_id.to_string(), vec![item])),
        }
    }

    pub fn get(&self, topic_id: &str) -> Option<&[ClassifiedItem]> {
        self.buckets
            .iter()
            .find(|(id, _)| id == topic_id)
            .map(|(_, items)| items.as_slice())
    }

    pub fn topic_ids(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ClassifiedItem])> {
        self.buckets
            .iter()
            .map(|(id, items)| (id.as_str(), items.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total routed items, counting fan-out copies.
    pub fn item_count(&self) -> usize {
        self.buckets.iter().map(|(_, items)| items.len()).sum()
    }
}

/// Maps incoming items to topic ids by keyword.
#[derive(Debug, Clone, Default)]
pub struct TopicClassifier {
    topics: Vec<TopicDefinition>,
}

impl TopicClassifier {
    pub fn new(topics: Vec<TopicDefinition>) -> Self {
        Self { topics }
    }

    pub fn from_file(path: &Path) -> Self {
        Self::new(load_topics(path))
    }

    pub fn from_yaml_str(yaml: &str) -> Self {
        Self::new(parse_topics(yaml))
    }

    pub fn topics(&self) -> &[TopicDefinition] {
        &self.topics
    }

    pub fn topic(&self, id: &str) -> Option<&TopicDefinition> {
        self.topics.iter().find(|t| t.id == id)
    }

    /// Topic ids matching `text`, in config order.
    pub fn match_topics(&self, text: &str) -> Vec<&str> {
        self.topics
            .iter()
            .filter(|t| t.matches(text))
            .map(|t| t.id.as_str())
            .collect()
    }

    /// Classify hotlist titles, then RSS titles. No dedup at this layer.
    pub fn classify(&self, hotlist: &HotlistFeed, rss: &RssFeed) -> Classification {
        let mut out = Classification::default();
        if self.topics.is_empty() {
            return out;
        }

        for (source_id, title, entry) in hotlist.iter() {
            for topic_id in self.match_topics(title) {
                out.push(topic_id, ClassifiedItem::from_hotlist(source_id, title, entry));
            }
        }
        for (feed_id, title, entry) in rss.iter() {
            for topic_id in self.match_topics(title) {
                out.push(topic_id, ClassifiedItem::from_rss(feed_id, title, entry));
            }
        }

        crate::telemetry::items_classified(out.item_count());
        out
    }

    /// Legacy router matching on title and summary together. Topics in config order,
    /// topics without a match left out.
    pub fn route_trends<'a>(&self, trends: &'a [Trend]) -> Vec<(&TopicDefinition, Vec<&'a Trend>)> {
        let texts: Vec<String> = trends
            .iter()
            .map(|t| format!("{} {}", t.title, t.summary.as_deref().unwrap_or("")))
            .collect();
        self.topics
            .iter()
            .filter_map(|topic| {
                let matched: Vec<&'a Trend> = trends
                    .iter()
                    .zip(&texts)
                    .filter(|(_, text)| topic.matches(text))
                    .map(|(t, _)| t)
                    .collect();
                (!matched.is_empty()).then_some((topic, matched))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{HotlistEntry, RssEntry, SourceType};

    const TOPICS_YAML: &str = r#"
topics:
  - id: ai-tech
    name: AI与科技
    keywords: ["AI", "人工智能", "ChatGPT"]
    description: 人工智能和科技领域
    priority: 1
  - id: ev
    name: 新能源车
    keywords: ["电动车", "Tesla"]
  - id: broken-no-keywords
    name: Nothing
    keywords: []
  - name: missing id
    keywords: ["x"]
  - "not a mapping"
  - id: ai-tech
    name: duplicate
    keywords: ["dup"]
"#;

    #[test]
    fn invalid_entries_are_dropped() {
        let topics = parse_topics(TOPICS_YAML);
        let ids: Vec<_> = topics.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["ai-tech", "ev"]);
        assert_eq!(topics[0].priority, 1);
        assert_eq!(topics[1].priority, DEFAULT_PRIORITY);
        assert_eq!(topics[1].description, "");
    }

    #[test]
    fn malformed_or_empty_config_yields_no_topics() {
        assert!(parse_topics("topics: [unclosed").is_empty());
        assert!(parse_topics("").is_empty());
        assert!(parse_topics("other: 1").is_empty());
    }

    #[test]
    fn missing_file_yields_no_topics() {
        let dir = tempfile::tempdir().unwrap();
        let c = TopicClassifier::from_file(&dir.path().join("topics.yaml"));
        assert!(c.topics().is_empty());
        let out = c.classify(
            &HotlistFeed::new().with("s", "AI news", HotlistEntry::default()),
            &RssFeed::new(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn fan_out_and_first_matched_order() {
        let c = TopicClassifier::from_yaml_str(TOPICS_YAML);
        let hot = HotlistFeed::new()
            .with("weibo", "Tesla发布电动车新品", HotlistEntry::default())
            .with("weibo", "Tesla用AI驾驶", HotlistEntry::default())
            .with("weibo", "天气晴朗", HotlistEntry::default());
        let rss = RssFeed::new().with("hn", "ChatGPT turns three", RssEntry::default());

        let out = c.classify(&hot, &rss);
        assert_eq!(out.topic_ids().collect::<Vec<_>>(), vec!["ev", "ai-tech"]);

        let ev: Vec<_> = out.get("ev").unwrap().iter().map(|i| &i.title).collect();
        assert_eq!(ev, vec!["Tesla发布电动车新品", "Tesla用AI驾驶"]);

        let ai = out.get("ai-tech").unwrap();
        assert_eq!(ai.len(), 2);
        assert_eq!(ai[0].source_type(), SourceType::Hotlist);
        assert_eq!(ai[1].source_type(), SourceType::Rss);
        assert_eq!(out.item_count(), 4);
    }

    #[test]
    fn route_trends_matches_title_and_summary() {
        let c = TopicClassifier::from_yaml_str(TOPICS_YAML);
        let trends = vec![
            Trend {
                title: "Markets calm".into(),
                url: None,
                date: "2026-01-20".into(),
                source: "x".into(),
                summary: Some("but Tesla slid".into()),
            },
            Trend {
                title: "Rain".into(),
                url: None,
                date: "2026-01-20".into(),
                source: "x".into(),
                summary: None,
            },
        ];
        let routed = c.route_trends(&trends);
        assert_eq!(routed.len(), 1);
        assert_eq!(routed[0].0.id, "ev");
        assert_eq!(routed[0].1.len(), 1);
    }
}
