use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::domain::asset_provisioner::AssetProvisioner;
use crate::models::domain::model_descriptor::ModelSource;
use crate::models::infrastructure::hash_verifier::{validate_hash, validate_source};

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Downloads missing assets over HTTP and verifies them against their
/// CRC32 digest files.
#[derive(Default)]
pub struct HttpAssetProvisioner {
    progress: Option<ProgressFn>,
}

impl HttpAssetProvisioner {
    pub fn new() -> Self {
        Self { progress: None }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    fn download_missing(&self, sources: &[ModelSource]) {
        for source in sources.iter().filter(|s| !s.path.exists()) {
            log::info!("Downloading {} to {}", source.url, source.path.display());
            if let Err(e) = download(&source.url, &source.path, self.progress.as_ref()) {
                log::error!("{e}");
            }
        }
    }
}

impl AssetProvisioner for HttpAssetProvisioner {
    fn conditional_download_hashes(&self, hashes: &[ModelSource]) -> bool {
        self.download_missing(hashes);

        let mut all_valid = true;
        for hash in hashes {
            if !validate_hash(&hash.path) {
                log::error!("Validating hash {} failed", hash.path.display());
                let _ = fs::remove_file(&hash.path);
                all_valid = false;
            }
        }
        all_valid
    }

    fn conditional_download_sources(&self, sources: &[ModelSource]) -> bool {
        self.download_missing(sources);

        let mut all_valid = true;
        for source in sources {
            if !validate_source(&source.path, &source.hash_path()) {
                log::error!("Validating source {} failed", source.path.display());
                let _ = fs::remove_file(&source.path);
                all_valid = false;
            }
        }
        all_valid
    }
}

fn download(url: &str, dest: &Path, progress: Option<&ProgressFn>) -> Result<(), ProvisionError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| ProvisionError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let temp_path = dest.with_extension("part");
    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<&ProgressFn>,
) -> Result<(), ProvisionError> {
    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ProvisionError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let write_err = |e| ProvisionError::Write {
        path: temp_path.to_path_buf(),
        source: e,
    };
    let mut file = fs::File::create(temp_path).map_err(write_err)?;

    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err)?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err)?;
        downloaded += n as u64;
        if let Some(cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err)?;
    drop(file);

    fs::rename(temp_path, dest).map_err(|e| ProvisionError::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}
