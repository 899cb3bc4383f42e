mod twitter;
mod types;

pub use twitter::{collect_video_urls, TokenPatterns, TwitterExtractor};
pub use types::{Credentials, MediaVariant};

use crate::error::FetchError;
use crate::template::TemplateStore;
use url::Url;

/// Resolve the downloadable media URLs of a post, one per media item, in
/// source order.
pub async fn extract_video_urls(
    store: TemplateStore,
    url_str: &str,
) -> Result<Vec<String>, FetchError> {
    let url = Url::parse(url_str).map_err(|_| FetchError::InvalidUrl(url_str.to_string()))?;

    if !TwitterExtractor::matches(&url) {
        return Err(FetchError::NoExtractor(url_str.to_string()));
    }

    let mut extractor = TwitterExtractor::new(store)?;
    extractor.extract(url_str).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_unparseable_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::load_from(dir.path().join("template.json")).unwrap();
        let err = extract_video_urls(store, "not a url").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn test_rejects_foreign_host() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::load_from(dir.path().join("template.json")).unwrap();
        let err = extract_video_urls(store, "https://youtube.com/watch?v=abc")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoExtractor(_)));
    }
}
