//! GitHub-backed chart filesystem
//!
//! Listings go through the contents API, file reads through the raw
//! content host on the `master` branch. A missing directory lists as
//! empty and a missing file reads as `None`; only transport problems and
//! unexpected statuses surface as errors.

use async_trait::async_trait;
use helmview_core::fs::{ChartFilesystem, FileEntry, FsError, FsResult};
use serde::Deserialize;
use tracing::debug;

use crate::request_error;

const API_BASE: &str = "https://api.github.com";
const RAW_BASE: &str = "https://raw.githubusercontent.com";

/// One entry of a contents-API listing
#[derive(Debug, Deserialize)]
struct ContentsEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

pub struct GitHubFilesystem {
    /// `owner/name` of the GitHub repository
    repo: String,
    client: reqwest::Client,
    api_base: String,
    raw_base: String,
}

impl GitHubFilesystem {
    pub fn new(repo: impl Into<String>) -> Self {
        Self::with_bases(repo, API_BASE, RAW_BASE)
    }

    /// Point both endpoints somewhere else, for tests
    pub fn with_bases(
        repo: impl Into<String>,
        api_base: impl Into<String>,
        raw_base: impl Into<String>,
    ) -> Self {
        Self {
            repo: repo.into(),
            client: reqwest::Client::new(),
            api_base: trim_base(api_base.into()),
            raw_base: trim_base(raw_base.into()),
        }
    }

    /// Path of the first entry under `folder` whose name starts with
    /// `prefix`, if any
    pub async fn query_start(&self, folder: &str, prefix: &str) -> FsResult<Option<String>> {
        let entries = self.list(folder).await?;
        Ok(entries
            .into_iter()
            .find(|e| e.name.starts_with(prefix))
            .map(|e| e.path))
    }

    /// Paths of all entries under `folder` whose names start with
    /// `prefix`, up to `limit` (0 means unlimited)
    pub async fn query_start_all(
        &self,
        folder: &str,
        prefix: &str,
        limit: usize,
    ) -> FsResult<Vec<String>> {
        let entries = self.list(folder).await?;
        let matching = entries
            .into_iter()
            .filter(|e| e.name.starts_with(prefix))
            .map(|e| e.path);
        Ok(if limit == 0 {
            matching.collect()
        } else {
            matching.take(limit).collect()
        })
    }
}

#[async_trait]
impl ChartFilesystem for GitHubFilesystem {
    async fn list(&self, path: &str) -> FsResult<Vec<FileEntry>> {
        let url = format!("{}/repos/{}/contents/{}", self.api_base, self.repo, path);
        debug!(%url, "listing directory");

        let response = self.client.get(&url).send().await.map_err(request_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(FsError::Request {
                message: format!("GET {url} returned {}", response.status()),
            });
        }

        let entries: Vec<ContentsEntry> =
            response.json().await.map_err(|e| FsError::InvalidListing {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        Ok(entries
            .into_iter()
            .map(|e| FileEntry {
                is_file: e.kind != "dir",
                name: e.name,
                path: e.path,
            })
            .collect())
    }

    async fn get(&self, path: &str) -> FsResult<Option<String>> {
        let url = format!("{}/{}/master/{}", self.raw_base, self.repo, path);
        debug!(%url, "fetching file");

        let response = self.client.get(&url).send().await.map_err(request_error)?;
        if !response.status().is_success() {
            return Ok(None);
        }
        Ok(Some(response.text().await.map_err(request_error)?))
    }
}

pub(crate) fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with_listing() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/helm/charts/contents/stable/redis"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "Chart.yaml", "path": "stable/redis/Chart.yaml", "type": "file"},
                {"name": "templates", "path": "stable/redis/templates", "type": "dir"},
                {"name": "values.yaml", "path": "stable/redis/values.yaml", "type": "file"},
            ])))
            .mount(&server)
            .await;
        server
    }

    fn fs(server: &MockServer) -> GitHubFilesystem {
        GitHubFilesystem::with_bases("helm/charts", server.uri(), server.uri())
    }

    #[tokio::test]
    async fn test_list_maps_contents_entries() {
        let server = server_with_listing().await;
        let entries = fs(&server).list("stable/redis").await.unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_file);
        assert_eq!(entries[1].name, "templates");
        assert!(!entries[1].is_file);
        assert_eq!(entries[2].path, "stable/redis/values.yaml");
    }

    #[tokio::test]
    async fn test_missing_directory_lists_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let entries = fs(&server).list("stable/nope").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_a_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(fs(&server).list("stable/redis").await.is_err());
    }

    #[tokio::test]
    async fn test_get_reads_raw_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/helm/charts/master/stable/redis/Chart.yaml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("name: redis\n"))
            .mount(&server)
            .await;

        let content = fs(&server).get("stable/redis/Chart.yaml").await.unwrap();
        assert_eq!(content.as_deref(), Some("name: redis\n"));
    }

    #[tokio::test]
    async fn test_get_missing_file_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(fs(&server).get("stable/redis/nope.yaml").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_start() {
        let server = server_with_listing().await;
        let fs = fs(&server);

        let hit = fs.query_start("stable/redis", "Chart").await.unwrap();
        assert_eq!(hit.as_deref(), Some("stable/redis/Chart.yaml"));
        assert!(fs.query_start("stable/redis", "zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_query_start_all_respects_limit() {
        let server = server_with_listing().await;
        let fs = fs(&server);

        let all = fs.query_start_all("stable/redis", "", 0).await.unwrap();
        assert_eq!(all.len(), 3);
        let capped = fs.query_start_all("stable/redis", "", 2).await.unwrap();
        assert_eq!(capped.len(), 2);
    }
}
