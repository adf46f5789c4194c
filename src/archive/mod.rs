// src/archive/mod.rs
pub mod document;
pub mod store;
pub mod timeline;

pub use document::{ArchiveDocument, ParsedArchive, Section, Stats};
pub use store::{SaveMode, TopicArchive};
pub use timeline::{TimelineStore, TimelineUpdate};
