// src/archive/document.rs
//! Archive record model: one Markdown document per (topic, date).
//!
//! Layout (sections located by their literal heading lines, never by line offsets):
//!
//! ```text
//! # {topic_name} - {date}
//! ## 📊 统计摘要        derived
//! ## 📰 内容列表        derived
//! ---
//! ## 🖊️ 人工备注        human-editable
//! ## ⭐ 重要度标记      human-editable
//! ```
//!
//! Rendering and parsing both go through [`Section`] and [`STAT_LABELS`], so the two
//! paths share a single schema.

use std::collections::HashSet;

use crate::ingest::types::{ClassifiedItem, ItemDetail, SourceType};
use crate::ingest::{normalize_text, single_line, truncate_chars};

pub const NOTES_PLACEHOLDER: &str = "<!-- 在此添加你的分析和思考 -->";
pub const IMPORTANCE_PLACEHOLDER: &str =
    "<!-- 1-5星，数字越大越重要 -->\n重要度: ☐ 1星 ☐ 2星 ☐ 3星 ☐ 4星 ☐ 5星";
pub const SEPARATOR: &str = "---";

const HOTLIST_HEADING: &str = "### 热榜新闻";
const RSS_HEADING: &str = "### RSS订阅";
const MAX_RANKS_SHOWN: usize = 5;
const MAX_SUMMARY_CHARS: usize = 200;

/// Ordered, named sections of an archive record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Stats,
    Content,
    HumanNotes,
    Importance,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Stats,
        Section::Content,
        Section::HumanNotes,
        Section::Importance,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            Section::Stats => "## 📊 统计摘要",
            Section::Content => "## 📰 内容列表",
            Section::HumanNotes => "## 🖊️ 人工备注",
            Section::Importance => "## ⭐ 重要度标记",
        }
    }

    /// Text a fresh record carries in this section, if the section is human-editable.
    pub fn placeholder(self) -> Option<&'static str> {
        match self {
            Section::HumanNotes => Some(NOTES_PLACEHOLDER),
            Section::Importance => Some(IMPORTANCE_PLACEHOLDER),
            _ => None,
        }
    }

    fn from_heading(line: &str) -> Option<Section> {
        let line = line.trim_end();
        Section::ALL.into_iter().find(|s| s.heading() == line)
    }
}

/// Stats line labels: total, hotlist, rss.
pub const STAT_LABELS: [&str; 3] = ["总条目", "热榜来源", "RSS来源"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: u32,
    pub hotlist: u32,
    pub rss: u32,
}

impl Stats {
    fn render(&self) -> String {
        let values = [self.total, self.hotlist, self.rss];
        STAT_LABELS
            .iter()
            .zip(values)
            .map(|(label, v)| format!("- {label}: {v} 条"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Tolerant parse: accepts `- 总条目: 5 条` and the bold `- **总条目**: 5 条`.
    fn parse<'a>(lines: impl Iterator<Item = &'a str>) -> Stats {
        let mut stats = Stats::default();
        for line in lines {
            for (i, label) in STAT_LABELS.iter().enumerate() {
                if !line.contains(label) {
                    continue;
                }
                let Some(value) = parse_stat_value(line) else {
                    continue;
                };
                match i {
                    0 => stats.total = value,
                    1 => stats.hotlist = value,
                    _ => stats.rss = value,
                }
                break;
            }
        }
        stats
    }
}

fn parse_stat_value(line: &str) -> Option<u32> {
    let (_, rest) = line.split_once([':', '：'])?;
    let number = rest.split('条').next()?;
    number.replace('*', "").trim().parse().ok()
}

/// A human-editable region; `None` means "still the placeholder".
fn normalize_region(text: &str, placeholder: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let squash = |s: &str| {
        s.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    };
    if squash(trimmed) == squash(placeholder) {
        return None;
    }
    Some(trimmed.to_string())
}

/// Full archive record, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDocument {
    pub topic_name: String,
    pub date: String,
    pub stats: Stats,
    items: Vec<ClassifiedItem>,
    pub human_notes: Option<String>,
    pub importance: Option<String>,
}

impl ArchiveDocument {
    /// Fresh record from `items`. Repeated `(source_type, source_id, title)` entries are kept once.
    pub fn from_items(topic_name: &str, date: &str, items: &[ClassifiedItem]) -> Self {
        let mut seen: HashSet<(SourceType, &str, &str)> = HashSet::new();
        let items: Vec<ClassifiedItem> = items
            .iter()
            .filter(|i| seen.insert((i.source_type(), i.source_id.as_str(), i.title.as_str())))
            .cloned()
            .collect();

        let hotlist = items
            .iter()
            .filter(|i| i.source_type() == SourceType::Hotlist)
            .count() as u32;
        let rss = items.len() as u32 - hotlist;

        Self {
            topic_name: topic_name.to_string(),
            date: date.to_string(),
            stats: Stats {
                total: items.len() as u32,
                hotlist,
                rss,
            },
            items,
            human_notes: None,
            importance: None,
        }
    }

    /// Carry the human-editable regions of a previously stored record.
    pub fn with_human_regions(mut self, previous: &ParsedArchive) -> Self {
        self.human_notes = previous.human_notes.clone();
        self.importance = previous.importance.clone();
        self
    }

    pub fn items(&self) -> &[ClassifiedItem] {
        &self.items
    }

    pub fn render(&self) -> String {
        let mut out: Vec<String> = Vec::new();
        out.push(format!("# {} - {}", single_line(&self.topic_name), self.date));

        out.push(Section::Stats.heading().to_string());
        out.push(self.stats.render());

        out.push(Section::Content.heading().to_string());
        let hot: Vec<&ClassifiedItem> = self
            .items
            .iter()
            .filter(|i| i.source_type() == SourceType::Hotlist)
            .collect();
        if !hot.is_empty() {
            out.push(HOTLIST_HEADING.to_string());
            out.extend(hot.iter().enumerate().map(|(n, i)| render_item(n + 1, i)));
        }
        let rss: Vec<&ClassifiedItem> = self
            .items
            .iter()
            .filter(|i| i.source_type() == SourceType::Rss)
            .collect();
        if !rss.is_empty() {
            out.push(RSS_HEADING.to_string());
            out.extend(rss.iter().enumerate().map(|(n, i)| render_item(n + 1, i)));
        }

        out.push(SEPARATOR.to_string());
        for section in [Section::HumanNotes, Section::Importance] {
            out.push(section.heading().to_string());
            let region = match section {
                Section::HumanNotes => self.human_notes.as_deref(),
                _ => self.importance.as_deref(),
            };
            out.push(
                region
                    .or(section.placeholder())
                    .unwrap_or_default()
                    .to_string(),
            );
        }

        let mut text = out.join("\n\n");
        text.push('\n');
        text
    }
}

// Feed fields are folded to one line so they can never start a heading line of their own.
fn item_heading(n: usize, item: &ClassifiedItem) -> String {
    let title = single_line(&item.title);
    match item.url.as_deref().map(single_line) {
        Some(url) => format!("{n}. **[{title}]({url})**"),
        None => format!("{n}. **{title}**"),
    }
}

fn render_item(n: usize, item: &ClassifiedItem) -> String {
    let mut lines = vec![item_heading(n, item)];
    match &item.detail {
        ItemDetail::Hotlist {
            ranks,
            appearance_count,
            first_seen,
            last_seen,
            ..
        } => {
            lines.push(format!(
                "   - 来源: {} | 出现 {} 次",
                single_line(&item.source_id),
                appearance_count
            ));
            if !ranks.is_empty() {
                let mut shown = ranks
                    .iter()
                    .take(MAX_RANKS_SHOWN)
                    .map(|r| format!("#{r}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                if ranks.len() > MAX_RANKS_SHOWN {
                    shown.push_str("...");
                }
                lines.push(format!("   - 排名: {shown}"));
            }
            let (first_seen, last_seen) = (single_line(first_seen), single_line(last_seen));
            if !first_seen.is_empty() {
                let span = if last_seen.is_empty() || first_seen == last_seen {
                    first_seen
                } else {
                    format!("{first_seen} ~ {last_seen}")
                };
                lines.push(format!("   - 时间: {span}"));
            }
        }
        ItemDetail::Rss {
            published_at,
            summary,
            author,
        } => {
            lines.push(format!("   - 来源: {}", single_line(&item.source_id)));
            let (published_at, author) = (single_line(published_at), single_line(author));
            if !published_at.is_empty() {
                lines.push(format!("   - 发布时间: {published_at}"));
            }
            if !author.is_empty() {
                lines.push(format!("   - 作者: {author}"));
            }
            let summary = normalize_text(summary);
            if !summary.is_empty() {
                lines.push(format!(
                    "   - 摘要: {}",
                    truncate_chars(&summary, MAX_SUMMARY_CHARS)
                ));
            }
        }
    }
    lines.join("\n")
}

/// What can be recovered from a stored record. Every field is optional: the file may have
/// been edited by hand or written by an older version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArchive {
    pub topic_name: Option<String>,
    pub date: Option<String>,
    pub stats: Stats,
    pub human_notes: Option<String>,
    pub importance: Option<String>,
}

impl ParsedArchive {
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().collect();

        let (topic_name, date) = lines
            .iter()
            .find(|l| l.starts_with("# "))
            .and_then(|l| l.trim_start_matches('#').trim().rsplit_once(" - "))
            .map(|(name, date)| (Some(name.trim().to_string()), Some(date.trim().to_string())))
            .unwrap_or((None, None));

        // Derived sections sit above the first `---`, human regions below it. Anything a
        // human pastes into the notes stays there: notes run to the first importance heading
        // after them, importance runs to the end of the file.
        let separator = lines.iter().position(|l| l.trim_end() == SEPARATOR);
        let human_from = separator.map_or(0, |i| i + 1);
        let find = |section: Section, from: usize| -> Option<usize> {
            lines[from..]
                .iter()
                .position(|l| Section::from_heading(l) == Some(section))
                .map(|i| i + from)
        };

        let derived = &lines[..separator.unwrap_or(lines.len())];
        let stats = match derived
            .iter()
            .position(|l| Section::from_heading(l) == Some(Section::Stats))
        {
            Some(start) => Stats::parse(
                derived[start + 1..]
                    .iter()
                    .take_while(|l| Section::from_heading(l).is_none())
                    .copied(),
            ),
            None => Stats::parse(derived.iter().copied()),
        };

        let notes_start = find(Section::HumanNotes, human_from);
        let importance_start = find(
            Section::Importance,
            notes_start.map_or(human_from, |i| i + 1),
        );
        let human_notes = notes_start
            .map(|start| lines[start + 1..importance_start.unwrap_or(lines.len())].join("\n"))
            .and_then(|r| normalize_region(&r, NOTES_PLACEHOLDER));
        let importance = importance_start
            .map(|start| lines[start + 1..].join("\n"))
            .and_then(|r| normalize_region(&r, IMPORTANCE_PLACEHOLDER));

        Self {
            topic_name,
            date,
            stats,
            human_notes,
            importance,
        }
    }

    /// Human notes as plain text for digests: placeholder and comment markers removed.
    pub fn notes_text(&self) -> Option<String> {
        let notes = self.human_notes.as_deref()?;
        let cleaned = notes
            .replace(NOTES_PLACEHOLDER, "")
            .replace("<!--", "")
            .replace("-->", "");
        let cleaned = cleaned.trim();
        (!cleaned.is_empty()).then(|| cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{HotlistEntry, RssEntry};

    fn hot(title: &str, url: Option<&str>) -> ClassifiedItem {
        ClassifiedItem::from_hotlist(
            "weibo",
            title,
            &HotlistEntry {
                url: url.map(String::from),
                ranks: vec![1, 3, 5, 7, 9, 11],
                count: 2,
                first_time: "09:00".into(),
                last_time: "10:00".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn fresh_record_renders_all_sections_in_order() {
        let rss = ClassifiedItem::from_rss(
            "hn",
            "RSS title",
            &RssEntry {
                summary: "<p>Long &amp; winding</p>".into(),
                author: "ann".into(),
                ..Default::default()
            },
        );
        let doc = ArchiveDocument::from_items("AI科技", "2026-01-20", &[hot("A", Some("http://x/1")), rss]);
        let text = doc.render();

        assert!(text.starts_with("# AI科技 - 2026-01-20\n"));
        assert!(text.contains("- 总条目: 2 条"));
        assert!(text.contains("- 热榜来源: 1 条"));
        assert!(text.contains("- RSS来源: 1 条"));
        assert!(text.contains("1. **[A](http://x/1)**"));
        assert!(text.contains("   - 排名: #1, #3, #5, #7, #9..."));
        assert!(text.contains("   - 时间: 09:00 ~ 10:00"));
        assert!(text.contains("   - 摘要: Long & winding"));
        assert!(text.contains(NOTES_PLACEHOLDER));
        assert!(text.ends_with("重要度: ☐ 1星 ☐ 2星 ☐ 3星 ☐ 4星 ☐ 5星\n"));

        let positions: Vec<usize> = Section::ALL
            .iter()
            .map(|s| text.find(s.heading()).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn parse_reads_back_what_render_wrote() {
        let mut doc = ArchiveDocument::from_items("Name - with dash", "2026-01-20", &[hot("A", None)]);
        doc.human_notes = Some("关注后续\n## 小结\n继续观察".into());
        doc.importance = Some("重要度: ★★★".into());
        let parsed = ParsedArchive::parse(&doc.render());

        assert_eq!(parsed.topic_name.as_deref(), Some("Name - with dash"));
        assert_eq!(parsed.date.as_deref(), Some("2026-01-20"));
        assert_eq!(parsed.stats, Stats { total: 1, hotlist: 1, rss: 0 });
        assert_eq!(parsed.human_notes.as_deref(), Some("关注后续\n## 小结\n继续观察"));
        assert_eq!(parsed.importance.as_deref(), Some("重要度: ★★★"));
    }

    #[test]
    fn placeholders_parse_as_empty_regions() {
        let doc = ArchiveDocument::from_items("T", "2026-01-20", &[]);
        let parsed = ParsedArchive::parse(&doc.render());
        assert_eq!(parsed.human_notes, None);
        assert_eq!(parsed.importance, None);
        assert_eq!(parsed.stats.total, 0);
    }

    #[test]
    fn headings_above_separator_are_not_human_regions() {
        let text = format!(
            "# T - 2026-01-20\n\n## 📊 统计摘要\n\n- 总条目: 1 条\n\n## 📰 内容列表\n\n\
             1. **AI 快讯\n## 🖊️ 人工备注\n尾巴**\n\n---\n\n## 🖊️ 人工备注\n\n{NOTES_PLACEHOLDER}\n\n\
             ## ⭐ 重要度标记\n\n{IMPORTANCE_PLACEHOLDER}\n"
        );
        let parsed = ParsedArchive::parse(&text);
        assert_eq!(parsed.human_notes, None);
        assert_eq!(parsed.importance, None);
        assert_eq!(parsed.stats.total, 1);
    }

    #[test]
    fn legacy_bold_stats_are_accepted() {
        let text = "# T - 2026-01-01\n\n## 📊 统计摘要\n\n- **总条目**: 5 条\n- **热榜来源**: 3 条\n- **RSS来源**: 2 条\n";
        let parsed = ParsedArchive::parse(text);
        assert_eq!(parsed.stats, Stats { total: 5, hotlist: 3, rss: 2 });
    }

    #[test]
    fn notes_text_strips_placeholder_comment() {
        let parsed = ParsedArchive {
            human_notes: Some(format!("{NOTES_PLACEHOLDER}\n值得关注")),
            ..Default::default()
        };
        assert_eq!(parsed.notes_text().as_deref(), Some("值得关注"));
    }

    #[test]
    fn duplicate_items_are_written_once() {
        let doc = ArchiveDocument::from_items("T", "2026-01-20", &[hot("A", None), hot("A", None)]);
        assert_eq!(doc.stats.total, 1);
        assert_eq!(doc.items().len(), 1);
    }
}
