//! Category page parsing: the `display-posts-listing` block holds one anchor per chapter.

use crate::model::ChapterLink;
use crate::scraper::error::ScraperError;
use crate::scraper::parse_selector;
use reqwest::Url;
use scraper::Html;
use tracing::warn;

/// Extract chapter links in listing order. Relative hrefs are resolved against `page_url`.
pub fn parse_chapter_list(html: &str, page_url: &Url) -> Result<Vec<ChapterLink>, ScraperError> {
    let doc = Html::parse_document(html);
    let listing_sel = parse_selector(".display-posts-listing")?;
    let a_sel = parse_selector("a")?;

    let listing = doc
        .select(&listing_sel)
        .next()
        .ok_or_else(|| ScraperError::ChapterListParse {
            reason: "display-posts-listing not found (layout may have changed)".to_string(),
        })?;

    let mut links = Vec::new();
    for a in listing.select(&a_sel) {
        let title = a.text().collect::<String>().trim().to_string();
        let Some(href) = a.value().attr("href") else {
            warn!("Chapter link {:?} has no href. Skipped.", title);
            continue;
        };
        let url = page_url
            .join(href.trim())
            .map_err(|e| ScraperError::InvalidUrl {
                input: href.to_string(),
                reason: e.to_string(),
            })?;
        links.push(ChapterLink {
            title,
            url: url.to_string(),
        });
    }

    if links.is_empty() {
        return Err(ScraperError::EmptyChapterList);
    }
    Ok(links)
}
