// src/telemetry.rs
//! Counters for classification and archival. The library only records; installing a
//! recorder/exporter is up to the embedding binary.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series carry descriptions once a recorder exists).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "topic_items_classified_total",
            "Items routed to topics (fan-out copies counted)."
        );
        describe_counter!(
            "topic_archive_saves_total",
            "Archive records written."
        );
        describe_counter!(
            "topic_archive_save_errors_total",
            "Archive writes that failed."
        );
        describe_counter!(
            "timeline_items_added_total",
            "Entries prepended to legacy timelines."
        );
        describe_counter!(
            "timeline_items_deduped_total",
            "Entries dropped because their URL was already recorded."
        );
    });
}

pub fn items_classified(n: usize) {
    ensure_metrics_described();
    counter!("topic_items_classified_total").increment(n as u64);
}

pub fn archive_saved() {
    ensure_metrics_described();
    counter!("topic_archive_saves_total").increment(1);
}

pub fn archive_save_failed() {
    ensure_metrics_described();
    counter!("topic_archive_save_errors_total").increment(1);
}

pub fn timeline_updated(added: usize, deduped: usize) {
    ensure_metrics_described();
    counter!("timeline_items_added_total").increment(added as u64);
    counter!("timeline_items_deduped_total").increment(deduped as u64);
}
