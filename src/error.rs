use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for URL: {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid matrix shape: {0}")]
    Shape(String),

    #[error("Expected {expected} class labels, got {got}")]
    LabelMismatch { expected: usize, got: usize },
}
