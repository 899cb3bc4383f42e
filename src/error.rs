use thiserror::Error;

/// One variant per pipeline step that can fail. Every failure is terminal
/// for the current invocation; only the bounded 400-expansion loop in the
/// metadata query retries anything.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid post URL: {0}")]
    InvalidUrl(String),
    #[error("No extractor found for URL: {0}")]
    NoExtractor(String),
    #[error("Failed to fetch post page {url}: status {status}")]
    PageFetch { url: String, status: u16 },
    #[error("Failed to fetch redirect target {url}: status {status}")]
    RedirectFetch { url: String, status: u16 },
    #[error("Authentication request to {url} failed: status {status}")]
    Auth { url: String, status: u16 },
    #[error("No main script bundle found in page for {0}")]
    AssetNotFound(String),
    #[error("Failed to fetch script bundle {url}: status {status}")]
    AssetFetch { url: String, status: u16 },
    #[error("No bearer token found in script bundle {0}")]
    TokenNotFound(String),
    #[error("No guest token in activation response from {0}")]
    GuestTokenNotFound(String),
    #[error("Error response for {url} is not valid JSON: {body}")]
    MalformedErrorResponse { url: String, body: String },
    #[error("Error response for {url} has no errors array")]
    UnrecognizedErrorShape { url: String },
    #[error("Failed to fetch post metadata for {url}: status {status}")]
    MetadataFetch { url: String, status: u16 },
    #[error("Download stream for {url} failed: {message}")]
    DownloadStream { url: String, message: String },
    #[error("Template store error: {0}")]
    Template(#[from] serde_json::Error),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
