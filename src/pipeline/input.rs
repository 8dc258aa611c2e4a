//! Input resolution: normalise a user-supplied path or URL to a
//! [`SourceDocument`].
//!
//! The digitization capability wants bytes plus a media type, so the whole
//! payload is read into memory (note photos are a few megabytes at most).
//! The media type is sniffed from magic bytes rather than trusted from file
//! extensions or `Content-Type` headers — phone cameras and chat exports
//! routinely mislabel both. Unsupported payloads are rejected here so
//! callers get a meaningful error rather than a confusing capability
//! failure downstream.

use crate::capability::SourceDocument;
use crate::error::ChapterError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a [`SourceDocument`].
///
/// If the input is a URL, download it (bounded by `timeout_secs`).
/// If the input is a local file, read it. Either way the payload's media
/// type is sniffed from its magic bytes.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourceDocument, ChapterError> {
    let bytes = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };

    let media_type = sniff_media_type(&bytes).ok_or_else(|| {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        ChapterError::UnsupportedMediaType {
            input: input.to_string(),
            magic,
        }
    })?;

    debug!("Resolved input '{}' as {} ({} bytes)", input, media_type, bytes.len());
    Ok(SourceDocument::new(bytes, media_type))
}

/// Read a local file, mapping I/O errors to meaningful variants.
async fn read_local(path_str: &str) -> Result<Vec<u8>, ChapterError> {
    let path = PathBuf::from(path_str);

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(ChapterError::PermissionDenied { path })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ChapterError::FileNotFound { path })
        }
        Err(_) => Err(ChapterError::InvalidInput {
            input: path_str.to_string(),
        }),
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ChapterError> {
    info!("Downloading source document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ChapterError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ChapterError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ChapterError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ChapterError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ChapterError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}

/// Sniff the media type from magic bytes. Returns `None` for unsupported
/// payloads.
pub fn sniff_media_type(bytes: &[u8]) -> Option<String> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png".into())
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg".into())
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp".into())
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif".into())
    } else if bytes.starts_with(b"%PDF") {
        Some("application/pdf".into())
    } else {
        None
    }
}
