use crate::config::{
    DOWNLOAD_BACKOFF_BASE_SECS, DOWNLOAD_MAX_RETRIES, DOWNLOAD_TIMEOUT_SECS, DRKG_ARCHIVE,
    DRKG_SENTINEL, DRKG_URL,
};
use crate::error::PrepError;
use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use futures::StreamExt;
use indicatif::ProgressBar;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

pub struct FetchOptions {
    pub data_dir: PathBuf,
    pub url: String,
    pub archive_name: String,
    pub sentinel: String,
    pub max_retries: u32,
}

impl FetchOptions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            url: DRKG_URL.to_string(),
            archive_name: DRKG_ARCHIVE.to_string(),
            sentinel: DRKG_SENTINEL.to_string(),
            max_retries: DOWNLOAD_MAX_RETRIES,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The sentinel file already exists; nothing was done.
    AlreadyPresent,
    /// The archive was unpacked (downloading it first if needed).
    Extracted,
}

/// Ensures the dataset is present under the data directory.
///
/// Tries to unpack the local archive first; if that fails the archive is
/// treated as absent or corrupt (a partial download from a killed process
/// looks the same), deleted, and re-downloaded before the next unpack
/// attempt. Retries are bounded, with exponential backoff between attempts.
pub async fn fetch_dataset(opts: &FetchOptions) -> Result<FetchOutcome> {
    let sentinel = opts.data_dir.join(&opts.sentinel);
    if sentinel.exists() {
        info!(path = ?sentinel, "Dataset already extracted");
        return Ok(FetchOutcome::AlreadyPresent);
    }

    fs::create_dir_all(&opts.data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", opts.data_dir))?;

    let archive_path = opts.data_dir.join(&opts.archive_name);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")?;

    let mut backoff = Duration::from_secs(DOWNLOAD_BACKOFF_BASE_SECS);
    let mut attempt = 0u32;

    loop {
        match unpack_archive(&archive_path, &opts.data_dir, &sentinel) {
            Ok(()) => {
                info!(path = ?sentinel, "Dataset extracted");
                return Ok(FetchOutcome::Extracted);
            }
            Err(e) => {
                attempt += 1;
                if attempt > opts.max_retries {
                    return Err(PrepError::DownloadFailed {
                        url: opts.url.clone(),
                        attempts: opts.max_retries,
                        reason: format!("{e:#}"),
                    }
                    .into());
                }
                warn!(
                    error = %e,
                    attempt,
                    max = opts.max_retries,
                    "Archive missing or unreadable, downloading"
                );
                if attempt > 1 {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                if archive_path.exists() {
                    fs::remove_file(&archive_path).with_context(|| {
                        format!("Failed to remove stale archive: {:?}", archive_path)
                    })?;
                }
                if let Err(e) = download(&client, &opts.url, &archive_path, attempt).await {
                    // A bad HTTP status will not get better on retry; transient
                    // network failures are charged against the retry budget by
                    // the next unpack attempt.
                    if e.downcast_ref::<PrepError>().is_some() {
                        return Err(e);
                    }
                    warn!(error = %e, attempt, "Download attempt failed");
                }
            }
        }
    }
}

/// Unpacks a gzipped tar archive into `dest` and verifies the sentinel file
/// came out of it.
fn unpack_archive(archive_path: &Path, dest: &Path, sentinel: &Path) -> Result<()> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {:?}", archive_path))?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);
    archive
        .unpack(dest)
        .with_context(|| format!("Failed to unpack archive: {:?}", archive_path))?;

    if !sentinel.exists() {
        bail!("Archive did not contain expected file: {:?}", sentinel);
    }
    Ok(())
}

/// Streams the archive to `<path>.part` and renames it into place, so a
/// partial download never occupies the final path.
async fn download(client: &reqwest::Client, url: &str, path: &Path, attempt: u32) -> Result<()> {
    info!(url, path = ?path, "Downloading dataset archive");

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    if !response.status().is_success() {
        return Err(PrepError::DownloadFailed {
            url: url.to_string(),
            attempts: attempt,
            reason: format!("HTTP status {}", response.status()),
        }
        .into());
    }

    let pb = match response.content_length() {
        Some(len) => ProgressBar::new(len),
        None => ProgressBar::new_spinner(),
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("archive");
    let part_path = path.with_file_name(format!("{file_name}.part"));
    let mut file = tokio::fs::File::create(&part_path)
        .await
        .with_context(|| format!("Failed to create download file: {:?}", part_path))?;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.with_context(|| format!("Download stream from {} failed", url))?;
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write download file: {:?}", part_path))?;
        pb.inc(chunk.len() as u64);
    }
    file.flush().await?;
    drop(file);
    pb.finish_and_clear();

    fs::rename(&part_path, path)
        .with_context(|| format!("Failed to move download into place: {:?}", path))?;

    info!(path = ?path, "Download finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::TempDir;

    /// Builds a gzipped tar containing `drkg/drkg.tsv` with the given body.
    fn create_archive(path: &Path, tsv_body: &str) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::fast());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_size(tsv_body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "drkg/drkg.tsv", tsv_body.as_bytes())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn unpack_extracts_sentinel() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("drkg.tar.gz");
        create_archive(&archive, "drug::A\ttreats\tdisease::X\n");

        let sentinel = dir.path().join("drkg/drkg.tsv");
        unpack_archive(&archive, dir.path(), &sentinel).unwrap();

        let body = fs::read_to_string(&sentinel).unwrap();
        assert!(body.contains("drug::A"));
    }

    #[test]
    fn unpack_fails_on_truncated_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("drkg.tar.gz");
        let mut file = File::create(&archive).unwrap();
        // First half of a gzip magic header, as a killed download would leave.
        file.write_all(&[0x1f]).unwrap();

        let sentinel = dir.path().join("drkg/drkg.tsv");
        assert!(unpack_archive(&archive, dir.path(), &sentinel).is_err());
    }

    #[test]
    fn unpack_fails_on_missing_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("nope.tar.gz");
        let sentinel = dir.path().join("drkg/drkg.tsv");
        assert!(unpack_archive(&archive, dir.path(), &sentinel).is_err());
    }

    #[tokio::test]
    async fn fetch_skips_when_sentinel_present() {
        let dir = TempDir::new().unwrap();
        let sentinel_dir = dir.path().join("drkg");
        fs::create_dir_all(&sentinel_dir).unwrap();
        fs::write(sentinel_dir.join("drkg.tsv"), "x\ty\tz\n").unwrap();

        let opts = FetchOptions::new(dir.path());
        let outcome = fetch_dataset(&opts).await.unwrap();
        assert_eq!(outcome, FetchOutcome::AlreadyPresent);
    }

    #[tokio::test]
    async fn fetch_unpacks_existing_archive_without_network() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("drkg.tar.gz");
        create_archive(&archive, "drug::A\ttreats\tdisease::X\n");

        let opts = FetchOptions::new(dir.path());
        let outcome = fetch_dataset(&opts).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Extracted);
        assert!(dir.path().join("drkg/drkg.tsv").exists());
    }

    #[tokio::test]
    async fn fetch_gives_up_after_bounded_retries() {
        let dir = TempDir::new().unwrap();
        let mut opts = FetchOptions::new(dir.path());
        // Nothing is listening on this port, so every download attempt fails
        // and the retry bound is what terminates the loop.
        opts.url = "http://127.0.0.1:9/drkg.tar.gz".to_string();
        opts.max_retries = 1;

        let err = fetch_dataset(&opts).await.unwrap_err();
        assert!(err.to_string().contains("127.0.0.1"));
    }
}
