// src/lib.rs
// Public library surface for integration tests and the CLI.

pub mod analysis;
pub mod archive;
pub mod history;
pub mod ingest;
pub mod matcher;
pub mod pipeline;
pub mod settings;
pub mod telemetry;
pub mod topics;

// ---- Re-exports for stable public API ----
pub use crate::archive::{SaveMode, TimelineStore, TopicArchive};
pub use crate::history::HistorySummarizer;
pub use crate::ingest::types::{ClassifiedItem, HotlistEntry, HotlistFeed, RssEntry, RssFeed, SourceType};
pub use crate::pipeline::TopicPipeline;
pub use crate::settings::Settings;
pub use crate::topics::{TopicClassifier, TopicDefinition};
