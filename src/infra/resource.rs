// ============================================================
// Layer 6 — Dataset Resource Resolver
// ============================================================
// Turns a dataset location into a local file:
//
//   https://host/path/corpus.json → downloaded once into
//                                   {download_dir}/{sanitised url}
//   data/corpus.json              → used as-is, must exist
//
// Downloads are not retried. A half-written download is never
// left behind under the final name: the body is written to a
// .part file and renamed.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::domain::traits::ResourceResolver;

pub struct CachedPathResolver {
    download_dir: PathBuf,
}

impl CachedPathResolver {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self { download_dir: download_dir.into() }
    }

    /// Where a URL lands inside the download directory.
    pub fn download_path(&self, url: &str) -> PathBuf {
        let stripped = url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let name: String = stripped
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        self.download_dir.join(name)
    }

    fn download(&self, url: &str, target: &Path) -> Result<()> {
        fs::create_dir_all(&self.download_dir)
            .with_context(|| format!("Cannot create '{}'", self.download_dir.display()))?;

        tracing::info!("Downloading dataset from {}", url);
        let resp = reqwest::blocking::get(url)
            .with_context(|| format!("Request to '{url}' failed"))?
            .error_for_status()
            .with_context(|| format!("Server rejected '{url}'"))?;
        let body = resp
            .bytes()
            .with_context(|| format!("Cannot read body of '{url}'"))?;

        let partial = target.with_extension("part");
        fs::write(&partial, &body)
            .with_context(|| format!("Cannot write '{}'", partial.display()))?;
        fs::rename(&partial, target)
            .with_context(|| format!("Cannot move download to '{}'", target.display()))?;

        tracing::debug!("Saved {} bytes to '{}'", body.len(), target.display());
        Ok(())
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

impl ResourceResolver for CachedPathResolver {
    fn resolve(&self, location: &str) -> Result<PathBuf> {
        if is_url(location) {
            let target = self.download_path(location);
            if target.is_file() {
                tracing::debug!("Using downloaded copy '{}'", target.display());
            } else {
                self.download(location, &target)?;
            }
            return Ok(target);
        }

        let path = PathBuf::from(location);
        anyhow::ensure!(
            path.is_file(),
            "Dataset file '{}' does not exist",
            path.display()
        );
        Ok(path)
    }
}
