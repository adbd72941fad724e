//! CLI commands

pub mod compat;
pub mod render;

use helmview_core::ChartFilesystem;
use helmview_repo::{GitHubFilesystem, HttpMirrorFilesystem};

/// Pick the chart source: a git-http-mirror when both mirror flags are
/// set, GitHub otherwise
pub fn filesystem(
    github: &str,
    mirror_alias: Option<String>,
    mirror_host: Option<String>,
) -> Box<dyn ChartFilesystem> {
    match (mirror_alias, mirror_host) {
        (Some(alias), Some(host)) => Box::new(HttpMirrorFilesystem::new(alias, host)),
        _ => Box::new(GitHubFilesystem::new(github)),
    }
}
