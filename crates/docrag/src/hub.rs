//! Model artifact fetching from the Hugging Face Hub
//!
//! Artifacts are downloaded once into the configured cache directory and
//! reused across restarts; only the in-memory state is lost on exit.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// URL of a file within a Hub repository
pub fn hub_url(repo: &str, file: &str) -> String {
    format!("https://huggingface.co/{}/resolve/main/{}", repo, file)
}

/// Local directory for a repository's artifacts
pub fn model_dir(cache_dir: &Path, repo: &str) -> PathBuf {
    cache_dir.join(repo.replace('/', "--"))
}

/// Download a file unless it is already cached
pub async fn ensure_file(url: &str, path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!("Downloading {}", url);

    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::ModelDownload(format!("request to {} failed: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(Error::ModelDownload(format!(
            "HTTP {} for {}",
            response.status(),
            url
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::ModelDownload(format!("failed to read body of {}: {}", url, e)))?;

    std::fs::write(path, &bytes)?;
    tracing::info!("Downloaded {} ({} bytes)", path.display(), bytes.len());

    Ok(())
}

/// Download the first of several candidate files into `path`
///
/// Repositories are not consistent about where they place ONNX exports, so
/// callers pass the known locations in preference order.
pub async fn ensure_any(urls: &[String], path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    let mut last_error = None;
    for url in urls {
        match ensure_file(url, path).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::debug!("candidate {} not usable: {}", url, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| Error::ModelDownload("no candidate URLs given".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_url_is_well_formed() {
        assert_eq!(
            hub_url("google/flan-t5-base", "config.json"),
            "https://huggingface.co/google/flan-t5-base/resolve/main/config.json"
        );
        assert_eq!(
            hub_url("sentence-transformers/all-MiniLM-L6-v2", "onnx/model.onnx"),
            "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/onnx/model.onnx"
        );
    }

    #[test]
    fn model_dir_flattens_repo_names() {
        let dir = model_dir(Path::new("/cache"), "google/flan-t5-base");
        assert_eq!(dir, PathBuf::from("/cache/google--flan-t5-base"));
    }

    #[tokio::test]
    async fn ensure_file_skips_existing_files() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"cached").unwrap();

        // An unreachable URL must not matter when the file is cached.
        ensure_file("http://invalid.invalid/model.onnx", file.path())
            .await
            .unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), b"cached");
    }
}
