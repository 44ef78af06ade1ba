//! Shared error type for the scraper.

use crate::workdir::WorkDirError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    #[error("Invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("Could not parse chapter list on category page: {reason}")]
    ChapterListParse { reason: String },

    #[error("Category page has no chapters (wrong series name?).")]
    EmptyChapterList,

    #[error("Could not parse chapter {title:?}: missing post content at {url}.")]
    ParseChapter { title: String, url: String },

    #[error("No chapters could be retrieved (all skipped, missing, or failed).")]
    NoChaptersRetrieved,

    #[error(transparent)]
    WorkDir(#[from] WorkDirError),
}
