use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Scraper settings, optionally loaded from a TOML file.
///
/// Every field has a default so a config file only needs the keys it changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Search endpoint, without query string.
    pub search_url: String,
    /// Fixed query parameters appended after `q=<keyword>`.
    pub query_params: String,
    /// User-Agent sent when fetching the search results page.
    pub page_user_agent: String,
    /// User-Agent sent when fetching individual images.
    pub image_user_agent: String,
    /// Root directory for downloaded images (one subdirectory per keyword).
    pub save_dir: PathBuf,
    /// Directory receiving the `raw_html_<keyword>.txt` dumps.
    pub raw_html_dir: PathBuf,
    /// Whether to append each fetched results page to its raw html dump.
    pub save_raw_html: bool,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            search_url: "https://www.google.com/search".to_string(),
            query_params: "tbas=0&tbs=isz:m&tbm=isch&tbas=0&source=lnt&sa=X\
                &ved=0ahUKEwi9oL63yKrWAhXIaRQKHW_HBjsQpwUIHA&biw=1920&bih=947&dpr=1"
                .to_string(),
            page_user_agent: "Mozilla/5.0 (X11; Linux i686) AppleWebKit/537.17 \
                (KHTML, like Gecko) Chrome/24.0.1312.27 Safari/537.17"
                .to_string(),
            image_user_agent: "Mozilla/5.0".to_string(),
            save_dir: PathBuf::from("scraped"),
            raw_html_dir: PathBuf::from("scraped"),
            save_raw_html: true,
        }
    }
}

impl ScrapeConfig {
    /// Load configuration from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ScrapeError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let data = fs::read_to_string(path)?;
        let cfg: ScrapeConfig = toml::from_str(&data)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(cfg)
    }

    /// Send both the images and the raw html dumps to `dir`
    pub fn set_output_dir(&mut self, dir: PathBuf) {
        self.raw_html_dir = dir.clone();
        self.save_dir = dir;
    }
}
