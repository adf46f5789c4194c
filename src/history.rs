//! history.rs: budgeted digest of recent archive records, fed to the analysis prompt.

use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::archive::{Stats, TopicArchive};
use crate::ingest::truncate_chars;
use crate::settings::{today_at_offset, DEFAULT_UTC_OFFSET_HOURS};

/// Rough token → character conversion used for the budget.
pub const CHARS_PER_TOKEN: f64 = 1.5;
pub const TRUNCATION_NOTICE: &str = "\n> ⚠️ 历史数据过多，已截断...\n";
const NOTE_EXCERPT_CHARS: usize = 100;
/// Longest window a digest looks back over (ten years).
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// `days` dates strictly before `current`, newest first. `days` is capped at
/// [`MAX_WINDOW_DAYS`].
pub fn date_window(current: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (1..=i64::from(days.min(MAX_WINDOW_DAYS)))
        .map_while(|i| current.checked_sub_signed(Duration::days(i)))
        .collect()
}

pub fn char_budget(max_tokens: usize) -> usize {
    (max_tokens as f64 * CHARS_PER_TOKEN) as usize
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub stats: Stats,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicHistory {
    pub topic_id: String,
    pub topic_name: String,
    /// Qualifying days (total > 0), newest first.
    pub days: Vec<DaySummary>,
}

impl TopicHistory {
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.days.len() * 2);
        for day in &self.days {
            lines.push(format!(
                "**{}**: {}条 (热榜{}, RSS{})",
                day.date, day.stats.total, day.stats.hotlist, day.stats.rss
            ));
            if let Some(notes) = &day.notes {
                let one_line = notes.split_whitespace().collect::<Vec<_>>().join(" ");
                lines.push(format!(
                    "  > 备注: {}",
                    truncate_chars(&one_line, NOTE_EXCERPT_CHARS)
                ));
            }
        }
        format!("### {}\n\n{}\n", self.topic_name, lines.join("\n"))
    }
}

/// Reads the archive; never writes and never fails.
#[derive(Debug, Clone)]
pub struct HistorySummarizer {
    archive: TopicArchive,
    utc_offset_hours: i32,
}

impl HistorySummarizer {
    pub fn new(archive: TopicArchive) -> Self {
        Self {
            archive,
            utc_offset_hours: DEFAULT_UTC_OFFSET_HOURS,
        }
    }

    pub fn with_utc_offset(mut self, hours: i32) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    /// Qualifying history of one topic over `window`; `None` if no day has items.
    /// The display name comes from the newest qualifying record, else the topic id.
    pub fn topic_history(&self, topic_id: &str, window: &[NaiveDate]) -> Option<TopicHistory> {
        let mut name = None;
        let mut days = Vec::new();
        for &date in window {
            let Some(parsed) = self.archive.read_parsed(topic_id, date) else {
                continue;
            };
            if parsed.stats.total == 0 {
                debug!(topic = %topic_id, %date, "record without items, skipped");
                continue;
            }
            if days.is_empty() {
                name = parsed.topic_name.clone();
            }
            days.push(DaySummary {
                date,
                stats: parsed.stats,
                notes: parsed.notes_text(),
            });
        }
        if days.is_empty() {
            return None;
        }
        Some(TopicHistory {
            topic_id: topic_id.to_string(),
            topic_name: name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| topic_id.to_string()),
            days,
        })
    }

    /// Digest of the `days` days before `current_date`, at most `max_tokens * 1.5` chars
    /// plus one truncation notice. Empty when nothing qualifies.
    pub fn summarize(&self, days: u32, current_date: NaiveDate, max_tokens: usize) -> String {
        let window = date_window(current_date, days);
        let (Some(newest), Some(oldest)) = (window.first(), window.last()) else {
            return String::new();
        };
        let max_chars = char_budget(max_tokens);

        let header = format!(
            "## 📊 最近{}天同主题历史\n\n> 时间范围: {} 至 {}\n\n",
            window.len(),
            oldest,
            newest
        );
        let mut out = String::new();
        let mut used = header.chars().count();
        let mut included = 0usize;

        for topic_id in self.archive.list_topics() {
            let Some(history) = self.topic_history(&topic_id, &window) else {
                continue;
            };
            if out.is_empty() {
                if used > max_chars {
                    return TRUNCATION_NOTICE.trim_start().to_string();
                }
                out.push_str(&header);
            }

            let mut piece = history.render();
            if included > 0 {
                piece.insert(0, '\n');
            }
            let len = piece.chars().count();
            if used + len > max_chars {
                debug!(topic = %topic_id, used, max_chars, "history digest truncated");
                out.push_str(TRUNCATION_NOTICE);
                break;
            }
            out.push_str(&piece);
            used += len;
            included += 1;
        }
        out
    }

    /// Same as [`summarize`](Self::summarize) with today's date at the configured UTC offset.
    pub fn summarize_recent(&self, days: u32, max_tokens: usize) -> String {
        self.summarize(days, today_at_offset(self.utc_offset_hours), max_tokens)
    }
}
