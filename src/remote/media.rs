//! Media file downloads over HTTP

use super::traits::MediaDownloader;
use crate::config::{DownloadConfig, FileCollisionAction, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::with_retry;
use crate::types::ItemMeta;
use crate::utils::{get_unique_path, media_extension, sanitize_filename};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Streams media files into the download directory
///
/// Files are named `<author_id>_<note_id>_<n>.<ext>` and written through a
/// `.part` file that is renamed once the body is complete. Each file is fetched
/// under the retry policy, courtesy delay included.
pub struct HttpMediaDownloader {
    client: reqwest::Client,
    download_dir: PathBuf,
    file_collision: FileCollisionAction,
    retry: RetryConfig,
}

impl HttpMediaDownloader {
    /// Create a downloader writing into `config.download_dir`
    pub fn new(client: reqwest::Client, config: &DownloadConfig, retry: &RetryConfig) -> Self {
        Self {
            client,
            download_dir: config.download_dir.clone(),
            file_collision: config.file_collision,
            retry: retry.clone(),
        }
    }

    async fn fetch_one(&self, url: &str, meta: &ItemMeta, index: usize) -> Result<PathBuf> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let extension = media_extension(content_type.as_deref(), url);
        let file_name = format!(
            "{}_{}_{}.{}",
            sanitize_filename(&meta.author_id),
            sanitize_filename(&meta.note_id),
            index,
            extension
        );

        let desired = self.download_dir.join(file_name);
        let Some(target) = get_unique_path(&desired, self.file_collision)? else {
            tracing::debug!(note_id = %meta.note_id, index, "File already present, not downloading again");
            return Ok(desired);
        };

        let part = part_path(&target);
        if let Err(e) = write_body(response, &part).await {
            tokio::fs::remove_file(&part).await.ok();
            return Err(e);
        }
        tokio::fs::rename(&part, &target).await?;

        Ok(target)
    }
}

#[async_trait]
impl MediaDownloader for HttpMediaDownloader {
    async fn download(&self, urls: &[String], meta: &ItemMeta) -> Result<Vec<bool>> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        self.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let mut results = Vec::with_capacity(urls.len());
        for (i, url) in urls.iter().enumerate() {
            match with_retry(&self.retry, || self.fetch_one(url, meta, i + 1)).await {
                Ok(path) => {
                    tracing::debug!(note_id = %meta.note_id, path = %path.display(), "Media file saved");
                    results.push(true);
                }
                Err(e) => {
                    tracing::warn!(note_id = %meta.note_id, url = %url, error = %e, "Media file download failed");
                    results.push(false);
                }
            }
        }
        Ok(results)
    }
}

fn part_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_body(mut response: reqwest::Response, part: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(part).await?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}
