//! CLI parsing and orchestration: chapter list -> chapter files -> EPUB -> cleanup.
//! Maps errors to exit codes.

use crate::config::{self, Config};
use crate::epub::{epub_file_name, write_epub, EpubError, EpubOptions, EpubVersion};
use crate::model::{Book, ChapterLink};
use crate::scraper::{
    category_url, download_series, fetch_chapter_list, is_excluded, EmptyChapterBehavior,
    PoliteClient, ScrapeOptions, ScraperError, CATEGORY_URL, DEFAULT_SKIP_KEYWORDS,
};
use crate::workdir::{WorkDir, WorkDirError};
use clap::Parser;
use serde::Serialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn, Level};

const DEFAULT_TEMP_DIR: &str = "tmp/";
const DEFAULT_AUTHOR: &str = "Unknown";
const DEFAULT_LANGUAGE: &str = "it";

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Epub(#[from] EpubError),

    #[error("{0}")]
    WorkDir(#[from] WorkDirError),

    #[error("{0}")]
    Output(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Epub(_) | CliRunError::WorkDir(_) | CliRunError::Output(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "nlscrape")]
#[command(about = "Download a novelleleggere.com series and write it as EPUB")]
#[command(
    after_help = "Config file keys (output_dir, temp_dir, user_agent, request_delay_secs, timeout_secs, toc_page, language, author, base_url, empty_chapters, skip_keywords) are read from ./nlscrape.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Name of the series on novelleleggere. Several words are joined with spaces.
    #[arg(required = true, value_name = "NAME")]
    pub name: Vec<String>,

    /// Path where to store temporary files (default: tmp/).
    #[arg(short, long, value_name = "path/to/dir")]
    pub path: Option<PathBuf>,

    /// Output path. Default: ./{series-name}.epub.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Set logging level to "error".
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Set logging level to "debug" and print the error cause chain.
    #[arg(short, long)]
    pub verbose: bool,

    /// EPUB author (overrides config; default "Unknown").
    #[arg(long)]
    pub author: Option<String>,

    /// Category URL prefix the series slug is appended to (overrides config).
    #[arg(long)]
    pub base_url: Option<String>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Delay between requests in seconds (overrides config; default 2).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (overrides config; default 5).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Download only listing entries in this range (1-based inclusive), e.g. 1-10.
    #[arg(long, value_parser = parse_chapter_range)]
    pub chapters: Option<(u32, u32)>,

    /// How to handle chapters without post content: skip (default), placeholder, or fail.
    #[arg(long, value_parser = parse_empty_chapter_behavior)]
    pub empty_chapters: Option<EmptyChapterBehavior>,

    /// Generate EPUB 2 instead of EPUB 3.
    #[arg(long)]
    pub epub_2: bool,

    /// Include toc.ncx in EPUB 3 output for legacy readers.
    #[arg(long)]
    pub ncx: bool,

    /// Keep the downloaded chapter files after writing the EPUB.
    #[arg(long)]
    pub keep_temp: bool,

    /// Print the chapter listing as JSON and exit without downloading chapters.
    #[arg(long)]
    pub list: bool,
}

impl Args {
    pub fn series_name(&self) -> String {
        self.name.join(" ").trim().to_string()
    }

    pub fn log_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else if self.verbose {
            Level::DEBUG
        } else {
            Level::INFO
        }
    }
}

fn parse_chapter_range(s: &str) -> Result<(u32, u32), String> {
    let s = s.trim();
    let (from_str, to_str) = s.split_once('-').ok_or_else(|| {
        format!(
            "Invalid --chapters: expected 'from-to' (e.g. 1-10), got '{}'",
            s
        )
    })?;
    let from_str = from_str.trim();
    let to_str = to_str.trim();
    let from: u32 = from_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid start chapter number",
            from_str
        )
    })?;
    let to: u32 = to_str.parse().map_err(|_| {
        format!(
            "Invalid --chapters: '{}' is not a valid end chapter number",
            to_str
        )
    })?;
    if from == 0 || from > to {
        return Err(format!(
            "Invalid --chapters: need 1 <= start <= end, got {}-{}",
            from, to
        ));
    }
    Ok((from, to))
}

fn parse_empty_chapter_behavior(s: &str) -> Result<EmptyChapterBehavior, String> {
    match s.to_lowercase().as_str() {
        "skip" => Ok(EmptyChapterBehavior::Skip),
        "placeholder" => Ok(EmptyChapterBehavior::Placeholder),
        "fail" => Ok(EmptyChapterBehavior::Fail),
        _ => Err(format!(
            "Invalid --empty-chapters value: '{}'. Use skip, placeholder, or fail.",
            s
        )),
    }
}

fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )));
        }
    }
    Ok(())
}

fn output_path(args: &Args, config: &Config, name: &str) -> PathBuf {
    match &args.output {
        Some(p) => p.clone(),
        None => config
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(epub_file_name(name)),
    }
}

fn build_client(args: &Args, config: &Config) -> Result<PoliteClient, CliRunError> {
    let mut builder = PoliteClient::builder();
    if let Some(delay) = args.delay.or(config.request_delay_secs) {
        builder = builder.delay_secs(delay);
    }
    if let Some(timeout) = args.timeout.or(config.timeout_secs) {
        builder = builder.timeout_secs(timeout);
    }
    if let Some(ua) = args.user_agent.clone().or_else(|| config.user_agent.clone()) {
        builder = builder.user_agent(ua);
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

#[derive(Serialize)]
struct ListingEntry<'a> {
    position: usize,
    #[serde(flatten)]
    link: &'a ChapterLink,
    excluded: bool,
}

/// Pretty JSON array of the listing, 1-based positions, with the skip-keyword verdict.
fn listing_json(links: &[ChapterLink], skip_keywords: &[String]) -> Result<String, CliRunError> {
    let entries: Vec<ListingEntry<'_>> = links
        .iter()
        .enumerate()
        .map(|(i, link)| ListingEntry {
            position: i + 1,
            link,
            excluded: is_excluded(&link.title, skip_keywords),
        })
        .collect();
    serde_json::to_string_pretty(&entries)
        .map_err(|e| CliRunError::Output(format!("Failed to write JSON: {}", e)))
}

/// CLI flag first, then config. An unknown config value is an input error, not a silent default.
fn resolve_empty_chapter_behavior(
    args: &Args,
    config: &Config,
) -> Result<EmptyChapterBehavior, CliRunError> {
    match (args.empty_chapters, config.empty_chapters.as_deref()) {
        (Some(behavior), _) => Ok(behavior),
        (None, Some(value)) => parse_empty_chapter_behavior(value).map_err(|_| {
            CliRunError::InvalidInput(format!(
                "Invalid empty_chapters value in config: '{}'. Use skip, placeholder, or fail.",
                value
            ))
        }),
        (None, None) => Ok(EmptyChapterBehavior::Skip),
    }
}

fn new_progress_bar(total: u32) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(total as u64);
    if let Ok(style) = indicatif::ProgressStyle::default_bar()
        .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
    {
        bar.set_style(
            style
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
    }
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    debug!("args: {:?}", args);
    let name = args.series_name();
    if name.is_empty() {
        return Err(CliRunError::InvalidInput(
            "Series name is empty.".to_string(),
        ));
    }

    let config = config::load_config()
        .map_err(CliRunError::InvalidInput)?
        .unwrap_or_default();
    let empty_chapter_behavior = resolve_empty_chapter_behavior(args, &config)?;

    let base = args
        .base_url
        .as_deref()
        .or(config.base_url.as_deref())
        .unwrap_or(CATEGORY_URL);
    let url = category_url(base, &name);
    let skip_keywords: Vec<String> = config.skip_keywords.clone().unwrap_or_else(|| {
        DEFAULT_SKIP_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .collect()
    });
    let mut client = build_client(args, &config)?;

    info!("Getting chapters list of {}, url: {}", name, url);
    if args.list {
        let links = fetch_chapter_list(&mut client, &url)?;
        println!("{}", listing_json(&links, &skip_keywords)?);
        return Ok(());
    }

    let output_path = output_path(args, &config, &name);
    validate_output_path(&output_path)?;

    let work_path = args
        .path
        .clone()
        .or_else(|| config.temp_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_DIR));
    let workdir =
        WorkDir::create(&work_path).map_err(|e| CliRunError::InvalidInput(e.to_string()))?;

    // Per-chapter debug logs replace the bar under -v.
    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| new_progress_bar(total));
        pb.set_position(n as u64);
        pb.set_message(format!("Fetching chapter {}/{}", n, total));
    };
    let show_progress = !args.quiet && !args.verbose;
    let progress: Option<&dyn Fn(u32, u32)> = if show_progress {
        Some(&progress_cb)
    } else {
        None
    };

    let scrape_opts = ScrapeOptions {
        progress,
        chapter_range: args.chapters,
        empty_chapter_behavior,
        skip_keywords: &skip_keywords,
    };
    let result = download_series(&mut client, &url, &workdir, &scrape_opts);

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    let summary = match result {
        Ok(s) => s,
        Err(e) => {
            warn!("Chapter files left in {}", workdir.path().display());
            return Err(e.into());
        }
    };
    info!(
        "Downloaded {} of {} listed chapters",
        summary.written, summary.listed
    );

    info!("Building Epub");
    let book = Book {
        title: name,
        author: args
            .author
            .clone()
            .or_else(|| config.author.clone())
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
        language: config
            .language
            .clone()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        identifier: Some(url),
        chapters: workdir.read_chapters()?,
    };
    let epub_options = EpubOptions {
        version: if args.epub_2 {
            EpubVersion::Epub2
        } else {
            EpubVersion::Epub3
        },
        include_ncx: args.ncx,
        include_toc_page: config.toc_page.unwrap_or(true),
    };
    if let Err(e) = write_epub(&book, &output_path, epub_options) {
        warn!("Chapter files left in {}", workdir.path().display());
        return Err(e.into());
    }

    if args.keep_temp {
        info!("Chapter files kept in {}", workdir.path().display());
    } else {
        workdir.remove()?;
    }

    info!("Wrote {}", output_path.display());
    Ok(())
}
