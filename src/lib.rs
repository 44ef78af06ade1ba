//! nlscrape: CLI scraper for novelleleggere.com series, outputting EPUB.

pub mod clean;
pub mod cli;
pub mod config;
pub mod epub;
pub mod logging;
pub mod model;
pub mod scraper;
pub mod workdir;

// Re-exports for CLI and consumers.
pub use epub::{epub_file_name, write_epub, EpubError, EpubOptions, EpubVersion};
pub use scraper::{
    category_url, download_series, fetch_chapter_list, DownloadSummary, EmptyChapterBehavior,
    PoliteClient, PoliteClientBuilder, ScrapeOptions, ScraperError,
};
pub use workdir::{WorkDir, WorkDirError};
