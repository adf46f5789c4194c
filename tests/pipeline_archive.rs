// tests/pipeline_archive.rs
//
// TopicPipeline::archive_day driven by feed JSON as the producer writes it.
//
// Covered:
// - one record per matched topic, fan-out across topics
// - hotlist and RSS both counted
// - a failing topic does not stop the others
// - missing topics file means nothing is archived

use chrono::NaiveDate;
use std::fs;

use topic_archive::{HotlistFeed, RssFeed, SaveMode, Settings, TopicPipeline};

const HOTLIST_JSON: &str = r#"{
    "weibo": {
        "OpenAI发布新模型": {"url": "http://x/1", "ranks": [1, 2], "count": 2},
        "AI芯片出口新规": {"url": "http://x/2", "ranks": [5]},
        "WAIT for it": {"url": "http://x/3"}
    }
}"#;

const RSS_JSON: &str = r#"{
    "hn": {
        "GPU prices fall": {"url": "http://r/1", "summary": "<b>Cheaper</b> cards", "published_at": "2026-01-20T08:00:00Z"}
    }
}"#;

fn settings_in(root: &std::path::Path, topics_yaml: Option<&str>) -> Settings {
    let topics_file = root.join("topics.yaml");
    if let Some(yaml) = topics_yaml {
        fs::write(&topics_file, yaml).expect("write topics");
    }
    Settings {
        topics_file,
        archive_dir: root.join("topics"),
        timeline_dir: root.join("index"),
        feed_dir: root.join("news"),
        ..Default::default()
    }
}

const TOPICS: &str = "topics:
  - id: ai-tech
    name: AI科技
    keywords: [AI]
  - id: chips
    name: 芯片
    keywords: [芯片, GPU]
";

#[test]
fn archive_day_writes_one_record_per_topic() {
    let root = tempfile::tempdir().expect("tempdir");
    let pipeline = TopicPipeline::from_settings(settings_in(root.path(), Some(TOPICS)));
    let hot = HotlistFeed::from_json_str(HOTLIST_JSON).expect("hotlist json");
    let rss = RssFeed::from_json_str(RSS_JSON).expect("rss json");
    let day = NaiveDate::from_ymd_opt(2026, 1, 20).expect("date");

    let report = pipeline.archive_day(day, &hot, &rss, SaveMode::Merge);
    assert!(report.failed.is_empty());
    let saved: Vec<&str> = report.saved.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(saved, vec!["ai-tech", "chips"]);

    let ai = pipeline.archive().read_parsed("ai-tech", day).expect("ai record");
    assert_eq!((ai.stats.total, ai.stats.hotlist, ai.stats.rss), (2, 2, 0));
    assert_eq!(ai.topic_name.as_deref(), Some("AI科技"));

    let chips_text = pipeline.archive().read("chips", day).expect("chips record");
    assert!(chips_text.contains("AI芯片出口新规"));
    assert!(chips_text.contains("GPU prices fall"));
    assert!(chips_text.contains("Cheaper cards"));
    assert!(!chips_text.contains("<b>"));
    assert!(chips_text.contains("总条目: 2 条"));
}

#[test]
fn failing_topic_does_not_block_others() {
    let root = tempfile::tempdir().expect("tempdir");
    let pipeline = TopicPipeline::from_settings(settings_in(root.path(), Some(TOPICS)));
    let day = NaiveDate::from_ymd_opt(2026, 1, 20).expect("date");

    // A plain file where the chips directory should be.
    fs::create_dir_all(root.path().join("topics")).expect("archive dir");
    fs::write(root.path().join("topics").join("chips"), "not a dir").expect("blocker");

    let hot = HotlistFeed::from_json_str(HOTLIST_JSON).expect("hotlist json");
    let report = pipeline.archive_day(day, &hot, &RssFeed::new(), SaveMode::Merge);

    let saved: Vec<&str> = report.saved.iter().map(|(id, _)| id.as_str()).collect();
    let failed: Vec<&str> = report.failed.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(saved, vec!["ai-tech"]);
    assert_eq!(failed, vec!["chips"]);
}

#[test]
fn missing_topics_file_archives_nothing() {
    let root = tempfile::tempdir().expect("tempdir");
    let pipeline = TopicPipeline::from_settings(settings_in(root.path(), None));
    let hot = HotlistFeed::from_json_str(HOTLIST_JSON).expect("hotlist json");
    let day = NaiveDate::from_ymd_opt(2026, 1, 20).expect("date");

    let report = pipeline.archive_day(day, &hot, &RssFeed::new(), SaveMode::Merge);
    assert!(report.saved.is_empty());
    assert!(pipeline.archive().list_topics().is_empty());
}

#[test]
fn history_context_uses_configured_window() {
    let root = tempfile::tempdir().expect("tempdir");
    let mut settings = settings_in(root.path(), Some(TOPICS));
    settings.history.days = 2;
    let pipeline = TopicPipeline::from_settings(settings);
    let hot = HotlistFeed::from_json_str(HOTLIST_JSON).expect("hotlist json");

    let old = NaiveDate::from_ymd_opt(2026, 1, 17).expect("date");
    let recent = NaiveDate::from_ymd_opt(2026, 1, 19).expect("date");
    pipeline.archive_day(old, &hot, &RssFeed::new(), SaveMode::Merge);
    pipeline.archive_day(recent, &hot, &RssFeed::new(), SaveMode::Merge);

    let ctx = pipeline.history_context(NaiveDate::from_ymd_opt(2026, 1, 20).expect("date"));
    assert!(ctx.starts_with("## 📊 最近2天同主题历史"));
    assert!(ctx.contains("**2026-01-19**"));
    assert!(!ctx.contains("**2026-01-17**"));
}
