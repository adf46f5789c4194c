// src/ingest/types.rs
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Treat `""` as absent.
fn empty_as_none<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v: Option<String> = Option::deserialize(d)?;
    Ok(v.filter(|s| !s.trim().is_empty()))
}

fn default_count() -> u32 {
    1
}

/// Attributes of one ranked/trending title as deposited by the feed producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotlistEntry {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub url: Option<String>,
    #[serde(default, alias = "mobileUrl", deserialize_with = "empty_as_none")]
    pub mobile_url: Option<String>,
    #[serde(default)]
    pub ranks: Vec<u32>,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub first_time: String,
    #[serde(default)]
    pub last_time: String,
}

// Same defaults as deserializing `{}`: a title seen once.
impl Default for HotlistEntry {
    fn default() -> Self {
        Self {
            url: None,
            mobile_url: None,
            ranks: Vec::new(),
            count: default_count(),
            first_time: String::new(),
            last_time: String::new(),
        }
    }
}

/// Attributes of one RSS entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RssEntry {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub author: String,
}

/// All titles reported by one source, in feed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBatch<T> {
    pub source_id: String,
    pub items: Vec<(String, T)>,
}

/// Normalized feed: `source -> title -> attributes`, insertion order preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed<T> {
    pub sources: Vec<SourceBatch<T>>,
}

pub type HotlistFeed = Feed<HotlistEntry>;
pub type RssFeed = Feed<RssEntry>;

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
        }
    }
}

impl<T> Feed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `title` under `source_id`; a repeated title within a source replaces the earlier
    /// attributes in place (mapping semantics).
    pub fn push(&mut self, source_id: impl Into<String>, title: impl Into<String>, entry: T) {
        let source_id = source_id.into();
        let title = title.into();
        let idx = match self.sources.iter().position(|b| b.source_id == source_id) {
            Some(i) => i,
            None => {
                self.sources.push(SourceBatch {
                    source_id,
                    items: Vec::new(),
                });
                self.sources.len() - 1
            }
        };
        let batch = &mut self.sources[idx];
        match batch.items.iter_mut().find(|(t, _)| *t == title) {
            Some(slot) => slot.1 = entry,
            None => batch.items.push((title, entry)),
        }
    }

    pub fn with(mut self, source_id: impl Into<String>, title: impl Into<String>, entry: T) -> Self {
        self.push(source_id, title, entry);
        self
    }

    pub fn len(&self) -> usize {
        self.sources.iter().map(|b| b.items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(source_id, title, entry)` in feed order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &T)> {
        self.sources.iter().flat_map(|b| {
            b.items
                .iter()
                .map(move |(t, e)| (b.source_id.as_str(), t.as_str(), e))
        })
    }
}

impl<T: for<'de> Deserialize<'de>> Feed<T> {
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Map visitor that keeps document order (serde_json's own map type sorts keys).
struct OrderedMap<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMap<V> {
    type Value = Vec<(String, V)>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<String, V>()? {
            out.push((k, v));
        }
        Ok(out)
    }
}

struct Titles<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Titles<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_map(OrderedMap(PhantomData)).map(Titles)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Feed<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw: Vec<(String, Titles<T>)> = d.deserialize_map(OrderedMap(PhantomData))?;
        let mut feed = Feed::new();
        for (source_id, titles) in raw {
            for (title, entry) in titles.0 {
                feed.push(source_id.clone(), title, entry);
            }
        }
        Ok(feed)
    }
}

/// Where a classified item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Hotlist,
    Rss,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Hotlist => "hotlist",
            SourceType::Rss => "rss",
        }
    }
}

/// Source-specific payload of a classified item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "lowercase")]
pub enum ItemDetail {
    Hotlist {
        mobile_url: Option<String>,
        ranks: Vec<u32>,
        appearance_count: u32,
        first_seen: String,
        last_seen: String,
    },
    Rss {
        published_at: String,
        summary: String,
        author: String,
    },
}

/// An item routed to a topic. Immutable once built; cloned into every matching topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedItem {
    pub title: String,
    pub source_id: String,
    pub url: Option<String>,
    #[serde(flatten)]
    pub detail: ItemDetail,
}

impl ClassifiedItem {
    pub fn from_hotlist(source_id: &str, title: &str, e: &HotlistEntry) -> Self {
        Self {
            title: title.to_string(),
            source_id: source_id.to_string(),
            url: e.url.clone(),
            detail: ItemDetail::Hotlist {
                mobile_url: e.mobile_url.clone(),
                ranks: e.ranks.clone(),
                appearance_count: e.count,
                first_seen: e.first_time.clone(),
                last_seen: e.last_time.clone(),
            },
        }
    }

    pub fn from_rss(source_id: &str, title: &str, e: &RssEntry) -> Self {
        Self {
            title: title.to_string(),
            source_id: source_id.to_string(),
            url: e.url.clone(),
            detail: ItemDetail::Rss {
                published_at: e.published_at.clone(),
                summary: e.summary.clone(),
                author: e.author.clone(),
            },
        }
    }

    pub fn source_type(&self) -> SourceType {
        match self.detail {
            ItemDetail::Hotlist { .. } => SourceType::Hotlist,
            ItemDetail::Rss { .. } => SourceType::Rss,
        }
    }
}

/// One row read from a raw feed database (legacy router input).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    pub title: String,
    pub url: Option<String>,
    /// `YYYY-MM-DD`, taken from the feed file name.
    pub date: String,
    pub source: String,
    pub summary: Option<String>,
}
