//! topic-archive: binary entrypoint
//! Thin CLI over the library: archive a day's feed, run the legacy router, print a digest.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use topic_archive::archive::store::DATE_FORMAT;
use topic_archive::{HotlistFeed, RssFeed, SaveMode, Settings, TopicPipeline};

#[derive(Parser, Debug)]
#[command(author, version, about = "Topic archive for news feeds", long_about = None)]
struct Cli {
    /// Settings file (defaults to $TOPIC_ARCHIVE_CONFIG_PATH or config/topic_archive.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one day's feed (JSON: source -> title -> attributes) and write archive records.
    Archive {
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        hotlist: PathBuf,
        #[arg(long)]
        rss: Option<PathBuf>,
        /// Replace existing records instead of keeping their human notes.
        #[arg(long)]
        overwrite: bool,
    },
    /// Route feed databases into per-topic timelines.
    Route,
    /// Print the history digest for a date (default: today).
    Digest {
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        max_tokens: Option<usize>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("topic_archive=info,warn"));
    // LOG_FORMAT=json for log shippers; compact text otherwise.
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn parse_date(raw: Option<&str>, settings: &Settings) -> Result<NaiveDate> {
    match raw {
        Some(s) => NaiveDate::parse_from_str(s, DATE_FORMAT)
            .with_context(|| format!("invalid date `{s}`, expected YYYY-MM-DD")),
        None => Ok(settings.today()),
    }
}

fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => {
            let mut s = Settings::load_from(path)?;
            s.apply_env_overrides();
            s
        }
        None => Settings::load()?,
    };

    match cli.command {
        Commands::Archive {
            date,
            hotlist,
            rss,
            overwrite,
        } => {
            let date = parse_date(date.as_deref(), &settings)?;
            let hot = fs::read_to_string(&hotlist)
                .with_context(|| format!("reading {}", hotlist.display()))?;
            let hot = HotlistFeed::from_json_str(&hot)?;
            let rss = match rss {
                Some(p) => {
                    let raw = fs::read_to_string(&p)
                        .with_context(|| format!("reading {}", p.display()))?;
                    RssFeed::from_json_str(&raw)?
                }
                None => RssFeed::new(),
            };
            let mode = if overwrite {
                SaveMode::Overwrite
            } else {
                SaveMode::Merge
            };

            let pipeline = TopicPipeline::from_settings(settings);
            let report = pipeline.archive_day(date, &hot, &rss, mode);
            for (topic, path) in &report.saved {
                println!("{topic}\t{}", path.display());
            }
            for (topic, e) in &report.failed {
                warn!(topic = %topic, error = ?e, "save failed");
            }
            if !report.failed.is_empty() {
                anyhow::bail!("{} topic(s) failed to save", report.failed.len());
            }
        }
        Commands::Route => {
            let pipeline = TopicPipeline::from_settings(settings);
            let report = pipeline.route_timelines()?;
            for (topic, update) in &report.updates {
                println!(
                    "{topic}\t+{}\t(dup {})\t{}",
                    update.added,
                    update.deduped,
                    update.path.display()
                );
            }
            info!(trends = report.trends, failed = report.failed.len(), "route finished");
        }
        Commands::Digest {
            date,
            days,
            max_tokens,
        } => {
            let date = parse_date(date.as_deref(), &settings)?;
            let days = days.unwrap_or(settings.history.days);
            let max_tokens = max_tokens.unwrap_or(settings.history.max_tokens);
            let pipeline = TopicPipeline::from_settings(settings);
            let digest = pipeline.summarizer().summarize(days, date, max_tokens);
            if digest.is_empty() {
                info!(%date, days, "no history to summarize");
            } else {
                println!("{digest}");
            }
        }
    }
    Ok(())
}
