// Durable storage for crawled pages and reflection findings

use crate::error::{Result, ScanError};
use crate::result::Finding;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

pub const FINDINGS_FILE: &str = "reflected_parameters.txt";
const INDEX_PAGE: &str = "index.html";
const MAX_FILE_NAME: usize = 200;

pub trait ResultSink: Send + Sync {
    /// Human readable location of the stored output.
    fn destination(&self) -> String;

    /// Store a fetched page. Pages sharing a path overwrite each other.
    fn save_page(&self, url: &Url, body: &str) -> Result<()>;

    /// Append one finding. Called once per distinct finding URL.
    fn append_finding(&self, finding: &Finding) -> Result<()>;
}

/// Writes everything for one target under `<root>/<host_with_underscores>/`.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Creates the target folder. Failing here means the target cannot be scanned.
    pub fn create(root: &Path, host: &str) -> Result<Self> {
        let dir = root.join(folder_name(host));
        fs::create_dir_all(&dir).map_err(|e| ScanError::persistence(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn findings_path(&self) -> PathBuf {
        self.dir.join(FINDINGS_FILE)
    }
}

impl ResultSink for FileSink {
    fn destination(&self) -> String {
        self.dir.display().to_string()
    }

    fn save_page(&self, url: &Url, body: &str) -> Result<()> {
        let path = self.dir.join(page_file_name(url));
        fs::write(&path, body).map_err(|e| ScanError::persistence(&path, e))
    }

    fn append_finding(&self, finding: &Finding) -> Result<()> {
        let path = self.findings_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| ScanError::persistence(&path, e))?;
        writeln!(file, "{}", finding.url).map_err(|e| ScanError::persistence(&path, e))
    }
}

/// `example.com` -> `example_com`
pub fn folder_name(host: &str) -> String {
    host.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Filesystem-safe file name for a page, derived from its path only.
pub fn page_file_name(url: &Url) -> String {
    let trimmed = url.path().trim_matches('/');
    if trimmed.is_empty() {
        return INDEX_PAGE.to_string();
    }

    let mut name: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME)
        .collect();

    if name.chars().all(|c| c == '.') {
        return INDEX_PAGE.to_string();
    }
    if name == FINDINGS_FILE {
        name.insert_str(0, "page_");
    }
    name
}
