// src/ingest/feed_db.rs
//! Reader for the raw feed producer's per-day SQLite files (`<feed_dir>/YYYY-MM-DD.db`).

use anyhow::{anyhow, Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::ingest::types::Trend;

const TRENDS_QUERY: &str = "
    SELECT ni.title, ni.url, ni.first_crawl_time, p.name
    FROM news_items ni
    JOIN platforms p ON ni.platform_id = p.id
    ORDER BY ni.first_crawl_time DESC";

/// `*.db` files in `dir`, newest file name first.
fn list_db_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("reading feed directory {}", dir.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("db"))
        .collect();
    files.sort();
    files.reverse();
    Ok(files)
}

/// Read every row of one feed file. The date comes from the file stem.
pub fn read_trends_file(path: &Path) -> Result<Vec<Trend>> {
    let date = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("opening {}", path.display()))?;
    let mut stmt = conn.prepare(TRENDS_QUERY)?;
    let rows = stmt.query_map([], |row| {
        let title: String = row.get(0)?;
        let url: Option<String> = row.get(1)?;
        let source: String = row.get(3)?;
        Ok((title, url, source))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (title, url, source) = row?;
        out.push(Trend {
            title,
            url: url.filter(|u| !u.trim().is_empty()),
            date: date.clone(),
            source,
            summary: None,
        });
    }
    Ok(out)
}

/// Read all feed files in `dir`. A file that fails to read is logged and skipped;
/// a missing directory or one without any `.db` file is an error.
pub fn load_all_trends(dir: &Path) -> Result<Vec<Trend>> {
    if !dir.exists() {
        return Err(anyhow!("feed directory not found: {}", dir.display()));
    }
    let files = list_db_files(dir)?;
    if files.is_empty() {
        return Err(anyhow!("no feed database files in {}", dir.display()));
    }

    let mut all = Vec::new();
    for file in &files {
        match read_trends_file(file) {
            Ok(mut rows) => {
                info!(file = %file.display(), rows = rows.len(), "feed file read");
                all.append(&mut rows);
            }
            Err(e) => warn!(file = %file.display(), error = ?e, "feed file skipped"),
        }
    }
    info!(files = files.len(), trends = all.len(), "feed directory loaded");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_db(path: &Path, rows: &[(&str, Option<&str>, &str, &str)]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE platforms (id TEXT PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE news_items (
                 id INTEGER PRIMARY KEY, title TEXT, url TEXT,
                 platform_id TEXT, first_crawl_time TEXT);",
        )
        .unwrap();
        for (title, url, platform, time) in rows {
            conn.execute(
                "INSERT OR IGNORE INTO platforms (id, name) VALUES (?1, ?1)",
                [platform],
            )
            .unwrap();
            conn.execute(
                "INSERT INTO news_items (title, url, platform_id, first_crawl_time)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![title, url, platform, time],
            )
            .unwrap();
        }
    }

    #[test]
    fn reads_files_newest_first_and_rows_by_crawl_time() {
        let dir = tempfile::tempdir().unwrap();
        write_db(
            &dir.path().join("2026-01-19.db"),
            &[("old", Some("http://o"), "weibo", "08:00")],
        );
        write_db(
            &dir.path().join("2026-01-20.db"),
            &[
                ("early", Some("http://e"), "zhihu", "08:00"),
                ("late", Some(""), "zhihu", "11:00"),
            ],
        );
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let trends = load_all_trends(dir.path()).unwrap();
        let titles: Vec<_> = trends.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["late", "early", "old"]);
        assert_eq!(trends[0].date, "2026-01-20");
        assert_eq!(trends[0].url, None);
        assert_eq!(trends[2].source, "weibo");
    }

    #[test]
    fn broken_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2026-01-21.db"), "not sqlite").unwrap();
        write_db(
            &dir.path().join("2026-01-20.db"),
            &[("ok", None, "x", "09:00")],
        );
        let trends = load_all_trends(dir.path()).unwrap();
        assert_eq!(trends.len(), 1);
    }

    #[test]
    fn missing_or_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_all_trends(&dir.path().join("nope")).is_err());
        assert!(load_all_trends(dir.path()).is_err());
    }
}
