mod downloader;
mod error;
mod extractor;
mod template;

pub use downloader::{output_file_names, SimpleDownloader};
pub use error::FetchError;
pub use extractor::{
    collect_video_urls, extract_video_urls, Credentials, MediaVariant, TokenPatterns,
    TwitterExtractor,
};
pub use template::{RequestTemplate, TemplateStore};

use std::path::{Path, PathBuf};
use tracing::info;

/// Downloads every video/GIF variant of the post at `post_url` into
/// `output_dir`, naming files after `file_name`. Returns the written paths
/// in media-item order. All steps run strictly one after another, from
/// token acquisition through the individual file transfers.
pub async fn download_video(
    post_url: &str,
    file_name: Option<&str>,
    output_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, FetchError> {
    let store = TemplateStore::load()?;
    let video_urls = extract_video_urls(store, post_url).await?;

    if video_urls.is_empty() {
        info!("no downloadable media on {post_url}");
        return Ok(Vec::new());
    }

    let names = output_file_names(file_name, video_urls.len());
    let downloader = SimpleDownloader::new();
    let mut written = Vec::with_capacity(video_urls.len());

    for (i, (url, name)) in video_urls.iter().zip(&names).enumerate() {
        let path = output_dir.as_ref().join(name);
        downloader.download(url, &path).await?;
        info!("video {} saved to {}", i + 1, path.display());
        written.push(path);
    }

    Ok(written)
}
