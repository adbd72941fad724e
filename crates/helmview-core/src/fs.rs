//! The chart filesystem interface
//!
//! The engine never talks to the network itself; it reads chart files
//! through this trait. The repo crate provides the GitHub-API and
//! HTTP-mirror implementations, and `MemoryFilesystem` backs tests.

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

/// A single entry from a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Base name of the entry
    pub name: String,

    /// Full path relative to the filesystem root
    pub path: String,

    /// True for files, false for directories
    pub is_file: bool,
}

/// Errors raised by a chart filesystem
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Filesystem request failed: {message}")]
    Request { message: String },

    #[error("Invalid directory listing for {path}: {message}")]
    InvalidListing { path: String, message: String },
}

pub type FsResult<T> = std::result::Result<T, FsError>;

/// Read-only access to chart files by path
#[async_trait]
pub trait ChartFilesystem: Send + Sync {
    /// List the entries directly under `path`
    async fn list(&self, path: &str) -> FsResult<Vec<FileEntry>>;

    /// Fetch a file's contents, or `None` if it does not exist
    async fn get(&self, path: &str) -> FsResult<Option<String>>;
}

/// In-memory filesystem for tests and fixtures
///
/// Directories are implicit: `list` derives them from the stored paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    files: IndexMap<String, String>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file at `path`
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }
}

#[async_trait]
impl ChartFilesystem for MemoryFilesystem {
    async fn list(&self, path: &str) -> FsResult<Vec<FileEntry>> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut entries: Vec<FileEntry> = Vec::new();

        for key in self.files.keys() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            let (name, is_file) = match rest.split_once('/') {
                Some((dir, _)) => (dir, false),
                None => (rest, true),
            };
            if entries.iter().any(|e| e.name == name) {
                continue;
            }
            entries.push(FileEntry {
                name: name.to_string(),
                path: format!("{}{}", prefix, name),
                is_file,
            });
        }

        Ok(entries)
    }

    async fn get(&self, path: &str) -> FsResult<Option<String>> {
        Ok(self.files.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MemoryFilesystem {
        let mut fs = MemoryFilesystem::new();
        fs.insert("stable/redis/Chart.yaml", "name: redis");
        fs.insert("stable/redis/values.yaml", "replicas: 3");
        fs.insert("stable/redis/templates/deployment.yaml", "kind: Deployment");
        fs.insert("stable/nginx/Chart.yaml", "name: nginx");
        fs
    }

    #[tokio::test]
    async fn test_list_derives_directories() {
        let fs = fixture();
        let entries = fs.list("stable").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| !e.is_file));
        assert_eq!(entries[0].name, "redis");
        assert_eq!(entries[0].path, "stable/redis");
    }

    #[tokio::test]
    async fn test_list_mixed_entries() {
        let fs = fixture();
        let entries = fs.list("stable/redis").await.unwrap();

        let chart = entries.iter().find(|e| e.name == "Chart.yaml").unwrap();
        assert!(chart.is_file);
        let templates = entries.iter().find(|e| e.name == "templates").unwrap();
        assert!(!templates.is_file);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let fs = fixture();
        assert!(fs.get("stable/redis/Chart.yaml").await.unwrap().is_some());
        assert!(fs.get("stable/redis/NOTES.txt").await.unwrap().is_none());
    }
}
