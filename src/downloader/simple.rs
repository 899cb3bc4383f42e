use crate::error::FetchError;
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub struct SimpleDownloader {
    client: Client,
}

impl SimpleDownloader {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:84.0) Gecko/20100101 Firefox/84.0")
                .build()
                .unwrap_or_default(),
        }
    }

    /// Streams `url` into `output_path` chunk by chunk, never holding the
    /// whole body in memory. A partially written file is left in place if
    /// the stream fails.
    pub async fn download(&self, url: &str, output_path: &Path) -> Result<(), FetchError> {
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::DownloadStream {
                url: url.to_string(),
                message: format!("status {}", response.status()),
            });
        }

        let mut file = File::create(output_path).await?;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| FetchError::DownloadStream {
                url: url.to_string(),
                message: e.to_string(),
            })?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(())
    }
}

impl Default for SimpleDownloader {
    fn default() -> Self {
        Self::new()
    }
}
