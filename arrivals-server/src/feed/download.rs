//! Conditional download of the static feed archive.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::StaticFeedConfig;

use super::error::FeedError;

/// Whole-archive downloads are tens of megabytes.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// What we remember about the last successful download.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ArchiveMeta {
    last_modified: Option<String>,
}

/// Keeps the local archive in step with the published one.
#[derive(Debug, Clone)]
pub struct FeedDownloader {
    http: reqwest::Client,
}

impl FeedDownloader {
    pub fn new() -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()?;
        Ok(Self { http })
    }

    /// Fetch `url` into `path` unless the server says our copy is current.
    ///
    /// Returns whether a new archive was written.
    pub async fn refresh(&self, url: &str, path: &Path) -> Result<bool, FeedError> {
        let meta_path = meta_path(path);
        let meta = read_meta(&meta_path).await;

        let mut request = self.http.get(url);
        // Only trust the remembered date while the archive it describes exists
        let have_archive = tokio::fs::try_exists(path).await.unwrap_or(false);
        if let (Some(last_modified), true) = (&meta.last_modified, have_archive) {
            debug!(%last_modified, "conditional feed request");
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            info!(url, "static feed not modified");
            return Ok(false);
        }
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Write beside the target so the final rename stays on one filesystem
        let partial = partial_path(path);
        let io_err = |source| FeedError::Io {
            path: partial.clone(),
            source,
        };
        let mut file = tokio::fs::File::create(&partial).await.map_err(io_err)?;
        let mut stream = response.bytes_stream();
        let mut total_bytes: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(e.into());
                }
            };
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk).await.map_err(io_err)?;
        }
        file.flush().await.map_err(io_err)?;
        drop(file);

        tokio::fs::rename(&partial, path)
            .await
            .map_err(|source| FeedError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        info!(
            url,
            size_kb = total_bytes / 1024,
            last_modified = last_modified.as_deref().unwrap_or("-"),
            "downloaded static feed"
        );

        let meta = ArchiveMeta { last_modified };
        match serde_json::to_vec(&meta) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(&meta_path, bytes).await {
                    warn!(path = %meta_path.display(), error = %e, "could not record feed metadata");
                }
            }
            Err(e) => warn!(error = %e, "could not encode feed metadata"),
        }

        Ok(true)
    }
}

/// Make sure a static archive is present at `config.path`, downloading it
/// when a URL is configured.
///
/// A failed download is only fatal when there is no local copy to fall
/// back to.
pub async fn ensure_archive(config: &StaticFeedConfig) -> Result<PathBuf, FeedError> {
    let Some(url) = &config.url else {
        return Ok(config.path.clone());
    };

    let result = match FeedDownloader::new() {
        Ok(downloader) => downloader.refresh(url, &config.path).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => Ok(config.path.clone()),
        Err(e) if tokio::fs::try_exists(&config.path).await.unwrap_or(false) => {
            warn!(
                error = %e,
                path = %config.path.display(),
                "static feed download failed; using local copy"
            );
            Ok(config.path.clone())
        }
        Err(e) => Err(e),
    }
}

fn meta_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn partial_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn read_meta(path: &Path) -> ArchiveMeta {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unreadable feed metadata");
            ArchiveMeta::default()
        }),
        Err(_) => ArchiveMeta::default(),
    }
}
