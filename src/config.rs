//! Optional config file loading. Search order: ./nlscrape.toml, then
//! $XDG_CONFIG_HOME/nlscrape/config.toml (or ~/.config/nlscrape/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Directory for the EPUB when -o is not set. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// Work directory for chapter files when -p is not set (default "tmp/").
    pub temp_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Include a visible table-of-contents page in the EPUB (default: true).
    pub toc_page: Option<bool>,
    /// dc:language of the EPUB (default "it").
    pub language: Option<String>,
    /// dc:creator of the EPUB.
    pub author: Option<String>,
    /// Category URL prefix the series slug is appended to.
    pub base_url: Option<String>,
    /// How to handle chapters without post content: skip (default), placeholder, or fail.
    pub empty_chapters: Option<String>,
    /// Listing titles containing any of these (case-insensitive) are not downloaded.
    pub skip_keywords: Option<Vec<String>>,
}

/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("nlscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("nlscrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            tracing::debug!("Loaded config from {}", path.display());
            return Ok(Some(config));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.output_dir.is_none());
        assert!(c.temp_dir.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.request_delay_secs.is_none());
        assert!(c.base_url.is_none());
        assert!(c.skip_keywords.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            output_dir = "out"
            temp_dir = "cache/tmp"
            user_agent = "Custom/1.0"
            request_delay_secs = 3
            timeout_secs = 10
            toc_page = false
            language = "en"
            author = "Traduttore"
            base_url = "http://localhost:8080/category/"
            empty_chapters = "placeholder"
            skip_keywords = ["spoiler", "bozza"]
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.output_dir.as_deref(), Some(std::path::Path::new("out")));
        assert_eq!(c.temp_dir.as_deref(), Some(std::path::Path::new("cache/tmp")));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.request_delay_secs, Some(3));
        assert_eq!(c.timeout_secs, Some(10));
        assert_eq!(c.toc_page, Some(false));
        assert_eq!(c.language.as_deref(), Some("en"));
        assert_eq!(c.author.as_deref(), Some("Traduttore"));
        assert_eq!(c.base_url.as_deref(), Some("http://localhost:8080/category/"));
        assert_eq!(c.empty_chapters.as_deref(), Some("placeholder"));
        assert_eq!(
            c.skip_keywords,
            Some(vec!["spoiler".to_string(), "bozza".to_string()])
        );
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("output_dir = [").is_err());
    }
}
