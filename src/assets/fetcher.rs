//! Image asset downloader with candidate fallback
//!
//! For each item the extractor supplies an ordered list of candidate URLs
//! (highest-resolution variant first). The fetcher tries them in order and
//! stops at the first real image: a success status, a completed transfer
//! within the timeout, and a payload above the minimum byte floor. The floor
//! rejects placeholder responses that return 200 with a tiny stub body.

use crate::config::{ImageConfig, UserAgentConfig};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Downloads item images into a stable directory, one file per identifier
#[derive(Debug, Clone)]
pub struct AssetFetcher {
    client: Client,
    directory: PathBuf,
    min_bytes: u64,
    freshness: Duration,
}

impl AssetFetcher {
    /// Creates a fetcher writing into the configured image directory
    ///
    /// The directory is created if missing. The HTTP client carries the
    /// same identifying user agent as the page fetcher.
    pub fn new(config: &ImageConfig, user_agent: &UserAgentConfig) -> crate::Result<Self> {
        let directory = PathBuf::from(&config.directory);
        std::fs::create_dir_all(&directory)?;

        // Format: CrawlerName/Version (+ContactURL; ContactEmail)
        let agent = format!(
            "{}/{} (+{}; {})",
            user_agent.crawler_name,
            user_agent.crawler_version,
            user_agent.contact_url,
            user_agent.contact_email
        );

        let client = Client::builder()
            .user_agent(agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            directory,
            min_bytes: config.min_bytes,
            freshness: Duration::from_secs(u64::from(config.freshness_days) * 24 * 60 * 60),
        })
    }

    /// Local file path for the given identifier
    pub fn destination(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.jpg", key))
    }

    /// Tries each candidate URL in order, stopping at the first success
    ///
    /// Returns true if a usable image file exists at the destination
    /// afterwards (freshly downloaded or served from the local cache).
    /// Any partially-written file from a failed candidate is deleted before
    /// the next candidate is tried.
    pub async fn fetch(&self, candidates: &[Url], key: &str) -> bool {
        let dest = self.destination(key);

        if self.is_fresh(&dest) {
            tracing::debug!("Image for {} is fresh in cache, skipping download", key);
            return true;
        }

        for candidate in candidates {
            match self.try_candidate(candidate, &dest).await {
                Ok(bytes) => {
                    tracing::debug!("Downloaded {} bytes for {} from {}", bytes, key, candidate);
                    return true;
                }
                Err(reason) => {
                    tracing::debug!("Image candidate {} failed for {}: {}", candidate, key, reason);
                    // Remove any partial local data before the next attempt
                    let _ = std::fs::remove_file(&dest);
                }
            }
        }

        tracing::debug!("All {} image candidates failed for {}", candidates.len(), key);
        false
    }

    /// Downloads one candidate and validates it against the size floor
    async fn try_candidate(&self, url: &Url, dest: &Path) -> Result<u64, String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| classify_error(&e))?;

        std::fs::write(dest, &body).map_err(|e| format!("write failed: {}", e))?;

        let len = body.len() as u64;
        if len < self.min_bytes {
            return Err(format!(
                "payload {} bytes below the {} byte floor",
                len, self.min_bytes
            ));
        }

        Ok(len)
    }

    /// Returns true if a cached copy exists and is younger than the
    /// freshness horizon
    fn is_fresh(&self, dest: &Path) -> bool {
        let Ok(metadata) = std::fs::metadata(dest) else {
            return false;
        };
        let Ok(modified) = metadata.modified() else {
            return false;
        };
        match modified.elapsed() {
            Ok(age) => age < self.freshness,
            // Clock skew puts the mtime in the future; treat as fresh
            Err(_) => true,
        }
    }
}

/// Short failure description for retry-path logging
fn classify_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout".to_string()
    } else if e.is_connect() {
        "connection refused".to_string()
    } else {
        e.to_string()
    }
}
