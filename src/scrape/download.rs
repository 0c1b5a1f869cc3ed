use crate::error::ScrapeError;
use crate::scrape::{ImageLink, SearchKeyword};
use crate::utils::files::{ensure_keyword_dir, image_file_path};
use crate::utils::http;
use futures::stream::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// What happened to one attempted link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    Saved { bytes: u64 },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// 1-based position of the link, also used in the file name
    pub index: usize,
    pub link: ImageLink,
    pub path: PathBuf,
    pub status: DownloadStatus,
}

impl DownloadOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self.status, DownloadStatus::Saved { .. })
    }
}

/// Per-link outcomes of one `download_all` call, in link order
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    pub directory: PathBuf,
    pub outcomes: Vec<DownloadOutcome>,
}

impl DownloadReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_saved()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.saved()
    }
}

/// Download up to `max_count` links into `save_dir/<keyword folder>/`.
///
/// Links are fetched one at a time in order. The index advances for every
/// attempted link, so a failed link leaves a gap in the numbering; failures
/// are neither retried nor replaced by later links.
pub async fn download_all(
    client: &Client,
    links: &[ImageLink],
    keyword: &SearchKeyword,
    save_dir: &Path,
    max_count: usize,
    user_agent: &str,
) -> io::Result<DownloadReport> {
    let folder = keyword.folder_name();
    let directory = ensure_keyword_dir(save_dir, &folder)?;
    let stem = folder.to_lowercase();

    let to_attempt = links.len().min(max_count);
    let pb = ProgressBar::new(to_attempt as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut outcomes = Vec::with_capacity(to_attempt);
    for (offset, link) in links.iter().take(to_attempt).enumerate() {
        let index = offset + 1;
        let path = image_file_path(&directory, &stem, index, link.extension());

        let status = match save_image(client, link, &path, user_agent).await {
            Ok(bytes) => DownloadStatus::Saved { bytes },
            Err(e) => {
                tracing::debug!("skipping {}: {}", link, e);
                DownloadStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        outcomes.push(DownloadOutcome {
            index,
            link: link.clone(),
            path,
            status,
        });
        pb.inc(1);
        if pb.is_hidden() {
            println!("{}/{}", index, to_attempt);
        }
    }

    pb.finish();

    Ok(DownloadReport {
        directory,
        outcomes,
    })
}

/// Stream one image to `path`. A partially written file is removed on failure.
async fn save_image(
    client: &Client,
    link: &ImageLink,
    path: &Path,
    user_agent: &str,
) -> Result<u64, ScrapeError> {
    let response = http::get(client, link.as_str(), user_agent).await?;

    let result = stream_to_file(response, path).await;
    if result.is_err() && fs::try_exists(path).await.unwrap_or(false) {
        if let Err(cleanup_err) = fs::remove_file(path).await {
            tracing::warn!(
                "failed to clean up partial file {}: {}",
                path.display(),
                cleanup_err
            );
        }
    }
    result
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> Result<u64, ScrapeError> {
    let mut file = fs::File::create(path).await?;
    let mut written = 0u64;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}
