// src/pipeline.rs
//! Orchestration: classify → archive, legacy route → timeline, and digest lookup.
//! Synchronous and run-to-completion.

use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::archive::{SaveMode, TimelineStore, TimelineUpdate, TopicArchive};
use crate::history::HistorySummarizer;
use crate::ingest::feed_db;
use crate::ingest::types::{HotlistFeed, RssFeed};
use crate::settings::Settings;
use crate::topics::TopicClassifier;

#[derive(Debug, Default)]
pub struct ArchiveReport {
    pub saved: Vec<(String, PathBuf)>,
    /// Topics whose save failed; other topics are unaffected.
    pub failed: Vec<(String, anyhow::Error)>,
}

#[derive(Debug, Default)]
pub struct RouteReport {
    pub trends: usize,
    pub updates: Vec<(String, TimelineUpdate)>,
    pub failed: Vec<(String, anyhow::Error)>,
}

pub struct TopicPipeline {
    settings: Settings,
    classifier: TopicClassifier,
    archive: TopicArchive,
}

impl TopicPipeline {
    pub fn new(settings: Settings, classifier: TopicClassifier) -> Self {
        let archive = TopicArchive::new(settings.archive_dir.clone());
        Self {
            settings,
            classifier,
            archive,
        }
    }

    /// Topics from `settings.topics_file`; a missing file leaves the pipeline without topics.
    pub fn from_settings(settings: Settings) -> Self {
        let classifier = TopicClassifier::from_file(&settings.topics_file);
        Self::new(settings, classifier)
    }

    pub fn classifier(&self) -> &TopicClassifier {
        &self.classifier
    }

    pub fn archive(&self) -> &TopicArchive {
        &self.archive
    }

    /// Classify one day's feed and write one archive record per matched topic.
    pub fn archive_day(
        &self,
        date: NaiveDate,
        hotlist: &HotlistFeed,
        rss: &RssFeed,
        mode: SaveMode,
    ) -> ArchiveReport {
        let classification = self.classifier.classify(hotlist, rss);
        info!(
            %date,
            topics = classification.len(),
            items = classification.item_count(),
            "feed classified"
        );

        let mut report = ArchiveReport::default();
        for (topic_id, items) in classification.iter() {
            let name = self
                .classifier
                .topic(topic_id)
                .map_or(topic_id, |t| t.name.as_str());
            match self.archive.save(date, topic_id, name, items, mode) {
                Ok(path) => report.saved.push((topic_id.to_string(), path)),
                Err(e) => report.failed.push((topic_id.to_string(), e)),
            }
        }
        report
    }

    /// Legacy router run: read every feed database and prepend unseen items to each
    /// topic's timeline.
    pub fn route_timelines(&self) -> Result<RouteReport> {
        let trends = feed_db::load_all_trends(&self.settings.feed_dir)?;
        let timelines = TimelineStore::new(self.settings.timeline_dir.clone());

        let mut report = RouteReport {
            trends: trends.len(),
            ..Default::default()
        };
        for (topic, matched) in self.classifier.route_trends(&trends) {
            info!(topic = %topic.id, matched = matched.len(), "trends routed");
            match timelines.append(&topic.id, &topic.name, &matched) {
                Ok(update) => report.updates.push((topic.id.clone(), update)),
                Err(e) => {
                    warn!(topic = %topic.id, error = ?e, "timeline not updated");
                    report.failed.push((topic.id.clone(), e));
                }
            }
        }
        Ok(report)
    }

    pub fn summarizer(&self) -> HistorySummarizer {
        HistorySummarizer::new(self.archive.clone()).with_utc_offset(self.settings.utc_offset_hours)
    }

    /// History context for the analysis prompt, using the configured window and budget.
    pub fn history_context(&self, current_date: NaiveDate) -> String {
        let h = &self.settings.history;
        self.summarizer()
            .summarize(h.days, current_date, h.max_tokens)
    }
}
