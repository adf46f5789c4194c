// src/ingest/mod.rs
pub mod feed_db;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize feed text for display: decode entities, strip tags, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace (summaries end up on a single Markdown list line)
    single_line(&out)
}

/// Collapse every whitespace run (newlines included) to one space and trim.
/// Used for any feed field interpolated into a single Markdown line.
pub fn single_line(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}

/// Keep at most `max` chars; append `...` when something was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let mut out: String = s.chars().take(max).collect();
        out.push_str("...");
        out
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_strips_markup_and_whitespace() {
        let s = "  <p>Hello,&nbsp;&amp;\n\n <b>world</b></p>  ";
        assert_eq!(normalize_text(s), "Hello, & world");
    }

    #[test]
    fn single_line_folds_newlines() {
        assert_eq!(single_line(" a\n## b\r\n\tc "), "a ## b c");
        assert_eq!(single_line("\n\n"), "");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("人工智能", 2), "人工...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
