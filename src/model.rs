//! Data passed between the scraper, the work directory and the EPUB writer.

use serde::{Deserialize, Serialize};

/// One anchor from a series category page, in listing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterLink {
    pub title: String,
    pub url: String,
}

/// One chapter read back from the work directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    /// 1-based reading order.
    pub index: u32,
    /// XHTML-safe markup, ready to embed in a chapter document.
    pub body: String,
}

/// A series ready to be packaged.
#[derive(Debug, Clone)]
pub struct Book {
    /// Series name as given on the command line.
    pub title: String,
    pub author: String,
    /// BCP 47 tag written to `dc:language`.
    pub language: String,
    /// Unique identifier for the package; the category URL when known.
    pub identifier: Option<String>,
    pub chapters: Vec<Chapter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_link_serializes_title_and_url() -> Result<(), serde_json::Error> {
        let link = ChapterLink {
            title: "Capitolo 1".to_string(),
            url: "https://www.novelleleggere.com/capitolo-1/".to_string(),
        };
        let value = serde_json::to_value(&link)?;
        assert_eq!(value["title"], "Capitolo 1");
        assert_eq!(value["url"], "https://www.novelleleggere.com/capitolo-1/");
        Ok(())
    }
}
