//! Chapter page parsing. The story text lives in the first `div.post-content`.

use crate::clean::clean_post_content;
use crate::scraper::error::ScraperError;
use crate::scraper::parse_selector;
use scraper::Html;

/// Body written in place of a chapter whose page has no post content.
pub const PLACEHOLDER_BODY: &str = "<div><p>This chapter returned no content.</p></div>";

/// Return the cleaned chapter body, or `None` when the page has no post content container.
pub fn extract_chapter(html: &str) -> Result<Option<String>, ScraperError> {
    let doc = Html::parse_document(html);
    let content_sel = parse_selector("div.post-content")?;
    Ok(doc.select(&content_sel).next().map(clean_post_content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_cleaned_post_content() -> Result<(), ScraperError> {
        let html = r#"<!DOCTYPE html><html><head><title>Capitolo 1</title></head><body>
<article><h1 class="post-title">Capitolo 1</h1>
<div class="post-content entry"><p>Era una notte buia.</p><div class="code-block"><ins class="adsbygoogle"></ins></div><p>Fine.</p></div>
</article></body></html>"#;
        let body = extract_chapter(html)?;
        assert_eq!(
            body.as_deref(),
            Some("<div><p>Era una notte buia.</p><p>Fine.</p></div>")
        );
        Ok(())
    }

    #[test]
    fn missing_container_is_none() -> Result<(), ScraperError> {
        let body = extract_chapter("<html><body><p>Pagina vuota</p></body></html>")?;
        assert!(body.is_none());
        Ok(())
    }
}
