use crate::scrape::ImageLink;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// A double-quoted string starting with `http` and ending in `.jpg`.
    static ref RE_QUOTED_JPG: Regex = Regex::new(r#""http[^"]*\.jpg""#).unwrap();
}

/// Turns a raw results page into candidate image links.
pub trait LinkExtractor {
    fn extract(&self, body: &str) -> Vec<ImageLink>;
}

/// Matches every quoted `http...jpg` string in the page, wherever it appears.
///
/// This is a heuristic tied to the markup of the results page, not an HTML
/// parse: a markup change yields no links rather than an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuotedJpgExtractor;

impl LinkExtractor for QuotedJpgExtractor {
    fn extract(&self, body: &str) -> Vec<ImageLink> {
        extract_links(body)
    }
}

/// Extract all quoted `.jpg` URLs from `body`, in document order, quotes stripped
pub fn extract_links(body: &str) -> Vec<ImageLink> {
    RE_QUOTED_JPG
        .find_iter(body)
        .map(|m| ImageLink::new(m.as_str().replace('"', "")))
        .collect()
}
