use crate::error::{RelayError, Result};
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempPath};

/// A downloaded image on disk, owned by one request. The file is removed
/// when the artifact is dropped, whichever way the request ends.
pub struct TemporaryArtifact {
    path: Option<TempPath>,
}

impl TemporaryArtifact {
    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(self.path()).await.map_err(|e| {
            RelayError::Download(format!("Failed to read downloaded image: {}", e))
        })
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let display: PathBuf = path.to_path_buf();
            match path.close() {
                Ok(()) => log::info!("🧹 Temporary file removed: {}", display.display()),
                Err(e) => log::warn!(
                    "Failed to remove temporary file {}: {}",
                    display.display(),
                    e
                ),
            }
        }
    }
}

/// Fetches `url` and stores the body in a fresh temporary file under `dir`
/// (the system temp directory when `None`).
pub async fn download_to_temp(
    http: &Client,
    url: &str,
    dir: Option<&Path>,
) -> Result<TemporaryArtifact> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| RelayError::Download(format!("Failed to download image: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::Download(format!(
            "Failed to download image: HTTP {}",
            status.as_u16()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| RelayError::Download(format!("Failed to download image: {}", e)))?;

    let mut builder = Builder::new();
    builder.prefix("generated_image_").suffix(".jpg");
    let file = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(|e| RelayError::Download(format!("Failed to create temporary file: {}", e)))?;

    // Convert first so a failed write still removes the file.
    let (mut handle, path) = file.into_parts();
    let artifact = TemporaryArtifact { path: Some(path) };
    handle
        .write_all(&bytes)
        .and_then(|_| handle.flush())
        .map_err(|e| RelayError::Download(format!("Failed to write temporary file: {}", e)))?;

    log::info!(
        "Image saved temporarily at: {} ({} bytes)",
        artifact.path().display(),
        bytes.len()
    );
    Ok(artifact)
}
