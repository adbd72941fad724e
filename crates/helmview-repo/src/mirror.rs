//! git-http-mirror-backed chart filesystem
//!
//! The mirror serves plain files at `{hostname}/{alias}/{path}` and marks
//! directory responses with an `is-dir-listing: true` header whose body is
//! a JSON array of child names. Classifying each child as file or
//! directory takes one extra request per entry, which is what the protocol
//! offers.

use async_trait::async_trait;
use helmview_core::fs::{ChartFilesystem, FileEntry, FsError, FsResult};
use tracing::debug;

use crate::github::trim_base;
use crate::request_error;

const DIR_LISTING_HEADER: &str = "is-dir-listing";

pub struct HttpMirrorFilesystem {
    /// Mirror alias of the mirrored repository
    alias: String,
    hostname: String,
    client: reqwest::Client,
}

impl HttpMirrorFilesystem {
    pub fn new(alias: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            hostname: trim_base(hostname.into()),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.hostname, self.alias, path)
    }

    async fn is_directory(&self, path: &str) -> FsResult<bool> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(request_error)?;
        Ok(header_value(&response, DIR_LISTING_HEADER) == Some("true".to_string()))
    }
}

#[async_trait]
impl ChartFilesystem for HttpMirrorFilesystem {
    async fn list(&self, path: &str) -> FsResult<Vec<FileEntry>> {
        let url = self.url(path);
        debug!(%url, "listing mirror directory");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(request_error)?;

        if header_value(&response, DIR_LISTING_HEADER) != Some("true".to_string()) {
            return Ok(Vec::new());
        }

        let names: Vec<String> = response.json().await.map_err(|e| FsError::InvalidListing {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let child = format!("{path}/{name}");
            let is_file = !self.is_directory(&child).await?;
            entries.push(FileEntry {
                name,
                path: child,
                is_file,
            });
        }
        Ok(entries)
    }

    async fn get(&self, path: &str) -> FsResult<Option<String>> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(request_error)?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.text().await.map_err(request_error)?))
    }
}

fn header_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
