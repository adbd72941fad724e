//! Helmview Repo - Remote chart filesystems
//!
//! Two `ChartFilesystem` implementations the renderer can read charts
//! through without anything installed locally:
//! - `GitHubFilesystem`: a repository's default branch, listed through the
//!   GitHub contents API and fetched through raw.githubusercontent.com
//! - `HttpMirrorFilesystem`: a git-http-mirror instance, using its
//!   `is-dir-listing` header protocol

pub mod github;
pub mod mirror;

pub use github::GitHubFilesystem;
pub use mirror::HttpMirrorFilesystem;

use helmview_core::fs::FsError;

pub(crate) fn request_error(err: reqwest::Error) -> FsError {
    FsError::Request {
        message: err.to_string(),
    }
}
