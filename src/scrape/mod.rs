//! Search-engine image scraping: build the results URL, pull candidate
//! links out of the raw page, and download them.

use crate::config::ScrapeConfig;
use crate::utils::files::append_raw_html;
use crate::utils::http::{fetch_page, search_url};
use reqwest::Client;
use std::fmt;
use std::time::Instant;

pub mod download;
pub mod extract;

pub use download::{download_all, DownloadReport};
pub use extract::{LinkExtractor, QuotedJpgExtractor};

/// Placeholder standing in for a space inside a query string
const ENCODED_SPACE: &str = "%20";

/// A single search term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchKeyword(String);

impl SearchKeyword {
    pub fn new(word: &str) -> Self {
        Self(word.replace(' ', ENCODED_SPACE))
    }

    /// Form used in the search URL and the raw html dump name
    pub fn query_form(&self) -> &str {
        &self.0
    }

    /// Form used as a directory name
    pub fn folder_name(&self) -> String {
        self.0.replace(ENCODED_SPACE, "_")
    }
}

impl fmt::Display for SearchKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A URL believed to point at a JPEG. Nothing beyond the pattern match is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLink(String);

impl ImageLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Text after the last `.` of the URL, taken verbatim
    pub fn extension(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for ImageLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keywords to search for and how many images to keep per keyword
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub keywords: Vec<String>,
    /// `None` downloads every link found
    pub max_count: Option<usize>,
}

impl SearchRequest {
    /// Build a request from a space-separated query as typed at the prompt
    pub fn from_query(query: &str, max_count: Option<usize>) -> Self {
        Self {
            keywords: query.split_whitespace().map(str::to_string).collect(),
            max_count,
        }
    }
}

#[derive(Debug)]
pub struct KeywordSummary {
    pub keyword: SearchKeyword,
    pub links_found: usize,
    pub report: DownloadReport,
}

/// Run the full scrape for every keyword of the request, one after another.
///
/// Nothing here is fatal: a page that cannot be fetched is treated as empty,
/// and a keyword whose download directory cannot be created is skipped.
pub async fn run_search(
    config: &ScrapeConfig,
    request: &SearchRequest,
    extractor: &dyn LinkExtractor,
) -> Vec<KeywordSummary> {
    let started = Instant::now();
    let client = Client::new();
    let mut summaries = Vec::with_capacity(request.keywords.len());

    for word in &request.keywords {
        println!("Looking for {}...\n", word);
        let keyword = SearchKeyword::new(word);

        let url = search_url(config, &keyword);
        tracing::debug!("fetching {}", url);
        let body = match fetch_page(&client, &url, &config.page_user_agent).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("failed to fetch results page for {}: {}", keyword, e);
                String::new()
            }
        };

        if config.save_raw_html {
            if let Err(e) = append_raw_html(&config.raw_html_dir, keyword.query_form(), &body) {
                tracing::warn!("failed to save raw html for {}: {}", keyword, e);
            }
        }

        let links = extractor.extract(&body);
        println!("Total Image Links = {}\n", links.len());

        let max_count = request.max_count.unwrap_or(links.len());
        match download_all(
            &client,
            &links,
            &keyword,
            &config.save_dir,
            max_count,
            &config.image_user_agent,
        )
        .await
        {
            Ok(report) => {
                println!(
                    "Downloaded {}/{} images to {}",
                    report.saved(),
                    report.attempted(),
                    report.directory.display()
                );
                summaries.push(KeywordSummary {
                    keyword,
                    links_found: links.len(),
                    report,
                });
            }
            Err(e) => {
                tracing::warn!("failed to prepare download directory for {}: {}", keyword, e);
            }
        }
    }

    println!(
        "Total time taken: {} Seconds",
        started.elapsed().as_secs_f64()
    );
    summaries
}
