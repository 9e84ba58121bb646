//! Source-archive management: download, verify, extract.
//!
//! Archives are fetched into a per-user cache and verified against the
//! recipe's checksum before anything is extracted or built. A mismatch is
//! terminal; mirrors are only fallbacks for download failures, never for
//! verification failures.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use url::Url;

use crate::recipe::Recipe;
use crate::util::diagnostic::ChecksumMismatchError;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::hash::sha256_file;
use crate::util::shell::Shell;

/// Fetches and unpacks recipe source archives into a cache directory.
pub struct SourceFetcher {
    cache_dir: PathBuf,
}

impl SourceFetcher {
    /// Create a fetcher rooted at the given cache directory.
    pub fn new(cache_dir: PathBuf) -> Self {
        SourceFetcher { cache_dir }
    }

    /// Where the recipe's archive lives in the cache.
    pub fn archive_path(&self, recipe: &Recipe) -> PathBuf {
        self.cache_dir.join("archives").join(recipe.archive_name())
    }

    /// Where the recipe's sources are extracted.
    pub fn extract_dir(&self, recipe: &Recipe) -> PathBuf {
        self.cache_dir
            .join("src")
            .join(format!("{}-{}", recipe.name, recipe.version))
    }

    /// Ensure a verified archive is present in the cache.
    ///
    /// A cached archive that fails verification is discarded and
    /// re-downloaded once; a fresh download that fails verification is an
    /// error.
    pub fn fetch(&self, recipe: &Recipe, shell: &Shell) -> Result<PathBuf> {
        let archive = self.archive_path(recipe);
        ensure_dir(archive.parent().expect("archive path has a parent"))?;

        if archive.exists() {
            if self.verify(recipe, &archive).is_ok() {
                tracing::debug!("using cached archive {}", archive.display());
                return Ok(archive);
            }
            shell.warn(format!(
                "cached archive {} failed verification; re-downloading",
                archive.display()
            ));
            std::fs::remove_file(&archive)
                .with_context(|| format!("failed to remove {}", archive.display()))?;
        }

        self.download(recipe, &archive, shell)?;
        self.verify(recipe, &archive)?;
        Ok(archive)
    }

    /// Download the archive, trying the primary URL then each mirror.
    fn download(&self, recipe: &Recipe, dest: &Path, shell: &Shell) -> Result<()> {
        let mut last_err = None;

        for source in std::iter::once(&recipe.url).chain(recipe.mirrors.iter()) {
            let url = Url::parse(source)
                .with_context(|| format!("recipe `{}` has an invalid URL: {}", recipe.name, source))?;

            shell.status(crate::util::shell::Status::Fetching, &url);
            match self.download_one(&url, dest, shell) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!("download from {} failed: {:#}", url, e);
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(e.context(format!(
                "all download sources failed for `{}`",
                recipe.name
            ))),
            None => bail!("recipe `{}` declares no download URL", recipe.name),
        }
    }

    fn download_one(&self, url: &Url, dest: &Path, shell: &Shell) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("slipway/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        let mut response = client
            .get(url.clone())
            .send()
            .with_context(|| format!("request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("server error fetching {}", url))?;

        let total = response.content_length().unwrap_or(0);
        let progress = shell.download_progress(total);

        let mut file = File::create(dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;

        let mut buffer = [0u8; 65536];
        loop {
            let read = response.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            file.write_all(&buffer[..read])?;
            progress.inc(read as u64);
        }
        progress.finish_and_clear();

        Ok(())
    }

    /// Verify the archive against the recipe checksum.
    pub fn verify(&self, recipe: &Recipe, archive: &Path) -> Result<()> {
        let actual = sha256_file(archive)?;
        if actual != recipe.sha256 {
            return Err(ChecksumMismatchError {
                archive: archive.display().to_string(),
                expected: recipe.sha256.clone(),
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// Extract a verified archive, replacing any previous extraction.
    pub fn extract(&self, recipe: &Recipe, archive: &Path) -> Result<PathBuf> {
        let dest = self.extract_dir(recipe);
        remove_dir_all_if_exists(&dest)?;
        ensure_dir(&dest)?;

        let file = File::open(archive)
            .with_context(|| format!("failed to open {}", archive.display()))?;
        let decoder = GzDecoder::new(file);
        let mut tar = tar::Archive::new(decoder);
        tar.unpack(&dest)
            .with_context(|| format!("failed to extract {}", archive.display()))?;

        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hash::sha256_bytes;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    fn test_recipe(sha256: String) -> Recipe {
        let mut recipe = Recipe::vtk();
        recipe.sha256 = sha256;
        recipe
    }

    #[test]
    fn test_verify_accepts_matching_checksum() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("a.tar.gz");
        std::fs::write(&archive, b"payload").unwrap();

        let recipe = test_recipe(sha256_bytes(b"payload"));
        let fetcher = SourceFetcher::new(tmp.path().to_path_buf());
        fetcher.verify(&recipe, &archive).unwrap();
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("a.tar.gz");
        std::fs::write(&archive, b"tampered").unwrap();

        let recipe = test_recipe(sha256_bytes(b"payload"));
        let fetcher = SourceFetcher::new(tmp.path().to_path_buf());

        let err = fetcher.verify(&recipe, &archive).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }

    #[test]
    fn test_extract_tarball() {
        let tmp = TempDir::new().unwrap();

        // Build a tiny .tar.gz with one file in a top-level dir.
        let archive_path = tmp.path().join("src.tar.gz");
        let encoder = GzEncoder::new(File::create(&archive_path).unwrap(), Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        let contents = b"cmake_minimum_required(VERSION 3.10)";
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "VTK-7.0.0/CMakeLists.txt", &contents[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let recipe = Recipe::vtk();
        let fetcher = SourceFetcher::new(tmp.path().join("cache"));
        let dest = fetcher.extract(&recipe, &archive_path).unwrap();

        assert!(dest.join("VTK-7.0.0/CMakeLists.txt").exists());
    }

    #[test]
    fn test_cache_layout() {
        let fetcher = SourceFetcher::new(PathBuf::from("/cache"));
        let recipe = Recipe::vtk();

        assert_eq!(
            fetcher.archive_path(&recipe),
            PathBuf::from("/cache/archives/VTK-7.0.0.tar.gz")
        );
        assert_eq!(
            fetcher.extract_dir(&recipe),
            PathBuf::from("/cache/src/vtk-7.0.0")
        );
    }
}
