//! Series download: category page, then each chapter page, cleaned into the work directory.

mod client;
mod error;

pub mod chapter;
pub mod listing;

pub use client::{
    PoliteClient, PoliteClientBuilder, DEFAULT_DELAY_SECS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USER_AGENT,
};
pub use error::ScraperError;

use crate::model::ChapterLink;
use crate::workdir::{index_width, WorkDir};
use reqwest::Url;
use scraper::Selector;
use tracing::{debug, error, info, warn};

pub const CATEGORY_URL: &str = "https://www.novelleleggere.com/category/";

/// Listing entries whose title contains one of these (case-insensitive) are not downloaded.
pub const DEFAULT_SKIP_KEYWORDS: &[&str] = &["spoiler", "non editato"];

/// Parse a CSS selector or return an error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, ScraperError> {
    Selector::parse(sel).map_err(|e| ScraperError::Selector {
        selector: sel.to_string(),
        reason: e.to_string(),
    })
}

/// How to handle chapter pages without a post content container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyChapterBehavior {
    /// Skip the chapter (default).
    Skip,
    /// Write a placeholder body under the chapter's title.
    Placeholder,
    /// Fail the download.
    Fail,
}

/// Options for a download run.
pub struct ScrapeOptions<'a> {
    pub progress: Option<&'a dyn Fn(u32, u32)>,
    /// 1-based inclusive range of listing positions to consider.
    pub chapter_range: Option<(u32, u32)>,
    pub empty_chapter_behavior: EmptyChapterBehavior,
    pub skip_keywords: &'a [String],
}

impl Default for ScrapeOptions<'_> {
    fn default() -> Self {
        Self {
            progress: None,
            chapter_range: None,
            empty_chapter_behavior: EmptyChapterBehavior::Skip,
            skip_keywords: &[],
        }
    }
}

/// Counts reported after a download run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Links on the category page.
    pub listed: usize,
    /// Chapter files written to the work directory.
    pub written: usize,
    /// Links excluded by keyword, out of range, or that failed to download.
    pub skipped: usize,
}

/// Category page URL for a series: `base` + name lower-cased with spaces as dashes.
pub fn category_url(base: &str, name: &str) -> String {
    let slug = name.trim().replace(' ', "-").to_lowercase();
    if base.ends_with('/') {
        format!("{}{}", base, slug)
    } else {
        format!("{}/{}", base, slug)
    }
}

/// True when the title matches one of the skip keywords.
pub fn is_excluded(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords
        .iter()
        .any(|k| !k.is_empty() && title.contains(&k.to_lowercase()))
}

/// Fetch and parse the category page.
pub fn fetch_chapter_list(
    client: &mut PoliteClient,
    url: &str,
) -> Result<Vec<ChapterLink>, ScraperError> {
    let page_url = Url::parse(url).map_err(|e| ScraperError::InvalidUrl {
        input: url.to_string(),
        reason: e.to_string(),
    })?;
    let response = client.get(url).map_err(|e| ScraperError::Network {
        url: url.to_string(),
        source: e,
    })?;
    let status = response.status();
    let body = response
        .text()
        .map_err(|e| ScraperError::BodyRead { source: e })?;
    if !status.is_success() {
        error!("{}", body);
        return Err(ScraperError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    listing::parse_chapter_list(&body, &page_url)
}

/// Download every chapter of the series at `url` into `workdir`.
///
/// Chapter files are numbered from 0 in listing order; excluded or failed chapters
/// do not consume a number. The zero-padding width follows the full listing length.
pub fn download_series(
    client: &mut PoliteClient,
    url: &str,
    workdir: &WorkDir,
    options: &ScrapeOptions<'_>,
) -> Result<DownloadSummary, ScraperError> {
    let links = fetch_chapter_list(client, url)?;
    info!("Getting {} chapters", links.len());

    let width = index_width(links.len());
    let selected: Vec<&ChapterLink> = links
        .iter()
        .enumerate()
        .filter(|(i, _)| match options.chapter_range {
            Some((from, to)) => {
                let position = *i as u32 + 1;
                position >= from && position <= to
            }
            None => true,
        })
        .map(|(_, link)| link)
        .collect();

    let total = selected.len() as u32;
    let mut written = 0usize;
    for (done, link) in selected.into_iter().enumerate() {
        if let Some(progress) = options.progress {
            progress(done as u32 + 1, total);
        }
        if is_excluded(&link.title, options.skip_keywords) {
            debug!("Skipping {:?} (excluded by title)", link.title);
            continue;
        }

        debug!("Downloading and cleaning {}", link.url);
        let response = match client.get(&link.url) {
            Ok(r) => r,
            Err(e) => {
                error!("Connection error for {} at {}: {}. Skipped.", link.title, link.url, e);
                continue;
            }
        };
        if !response.status().is_success() {
            warn!(
                "HTTP {} for {} at {}. Skipped.",
                response.status().as_u16(),
                link.title,
                link.url
            );
            continue;
        }
        let html = match response.text() {
            Ok(t) => t,
            Err(e) => {
                warn!("Failed to read {}: {}. Skipped.", link.url, e);
                continue;
            }
        };

        let body = match chapter::extract_chapter(&html)? {
            Some(body) => body,
            None => match options.empty_chapter_behavior {
                EmptyChapterBehavior::Skip => {
                    warn!("No post content for {} at {}. Skipped.", link.title, link.url);
                    continue;
                }
                EmptyChapterBehavior::Placeholder => {
                    warn!("No post content for {} at {}. Writing placeholder.", link.title, link.url);
                    chapter::PLACEHOLDER_BODY.to_string()
                }
                EmptyChapterBehavior::Fail => {
                    return Err(ScraperError::ParseChapter {
                        title: link.title.clone(),
                        url: link.url.clone(),
                    });
                }
            },
        };

        debug!("Writing html file for {}", link.title);
        workdir.write_chapter(written, width, &link.title, &body)?;
        written += 1;
    }

    if written == 0 {
        return Err(ScraperError::NoChaptersRetrieved);
    }
    Ok(DownloadSummary {
        listed: links.len(),
        written,
        skipped: links.len() - written,
    })
}
