//! Remote download of shared score tables.
//!
//! The analysis core never talks to the network: a [`RemoteFetcher`] hands back raw bytes,
//! which are checked for markup (permission or warning pages served instead of the file)
//! before being parsed into a [`ScoreTable`].

use crate::error::{AnalysisError, Result};
use crate::table::ScoreTable;
use log::{debug, info};
use std::time::Duration;

pub trait RemoteFetcher {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP download, a single attempt
pub struct HttpFetcher {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(base_url: &str) -> Result<HttpFetcher> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| AnalysisError::RemoteFetchFailed(format!("cannot build HTTP client: {}", e)))?;
        Ok(HttpFetcher { base_url: base_url.trim_end_matches('/').to_string(), client })
    }

    pub fn url_for(&self, file_id: &str) -> String {
        format!("{}?id={}&export=download", self.base_url, file_id.trim())
    }
}

impl RemoteFetcher for HttpFetcher {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        let url = self.url_for(file_id);
        info!("Downloading score table from {}...", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| AnalysisError::RemoteFetchFailed(format!("download error: {}", e)))?;

        if !response.status().is_success() {
            return Err(AnalysisError::RemoteFetchFailed(format!("HTTP {}", response.status())));
        }

        let bytes = response
            .bytes()
            .map_err(|e| AnalysisError::RemoteFetchFailed(format!("download interrupted: {}", e)))?;
        debug!("Downloaded {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Rejects payloads whose first line is an HTML page instead of a table
pub fn sniff_markup(bytes: &[u8]) -> Result<()> {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let first_line = String::from_utf8_lossy(first_line).to_lowercase();
    if first_line.contains("<html") || first_line.contains("<!doctype") {
        return Err(AnalysisError::RemoteFetchFailed(
            "received an HTML page instead of a table: the file is probably not shared with 'anyone with the link'".to_string(),
        ));
    }
    Ok(())
}

/// Downloads, checks and parses a remote score table
pub fn load_remote<F: RemoteFetcher + ?Sized>(fetcher: &F, file_id: &str) -> Result<ScoreTable> {
    if file_id.trim().is_empty() {
        return Err(AnalysisError::RemoteFetchFailed("empty file identifier".to_string()));
    }
    let bytes = fetcher.fetch(file_id)?;
    sniff_markup(&bytes)?;
    ScoreTable::from_bytes(&bytes)
        .map_err(|e| AnalysisError::RemoteFetchFailed(format!("downloaded file is not a readable table: {}", e)))
}
