//! Chart loading and rendering
//!
//! Resolves a `repo/name` reference against a `ChartFilesystem`, loads the
//! chart metadata and values, then renders every template file.
//! `_helpers.tpl` goes first so its named templates are registered before
//! the manifests that use them; each file gets a fresh variable scope but
//! shares the chart's template registry.
//!
//! Render errors are fatal only for the file that produced them: failed
//! files are recorded by name and their siblings still render.

use helmview_core::{ChartFilesystem, HelmChart};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::interpreter::{Interpreter, TemplateRegistry};

pub const HELPERS_FILE: &str = "_helpers.tpl";

/// The outcome of rendering one chart
#[derive(Debug)]
pub struct RenderedChart {
    pub chart: HelmChart,

    /// Rendered manifests by template file name, in listing order.
    /// Files whose output is only whitespace are left out.
    pub manifests: IndexMap<String, String>,

    /// Per-file render errors, by template file name
    pub failures: IndexMap<String, String>,
}

impl RenderedChart {
    /// True when every template file rendered cleanly
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One line of a batch compatibility check
#[derive(Debug)]
pub struct CompatReport {
    pub reference: String,
    pub compatible: bool,

    /// Load error or per-file failures, for display
    pub detail: Vec<String>,
}

/// Renders charts read through a `ChartFilesystem`
pub struct ChartRenderer<'a> {
    fs: &'a dyn ChartFilesystem,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(fs: &'a dyn ChartFilesystem) -> Self {
        Self { fs }
    }

    /// Render the chart at `repo/name` with its default values
    pub async fn render(&self, reference: &str) -> Result<RenderedChart> {
        let (repo, name) = parse_reference(reference)?;
        let chart_dir = self.find_chart_dir(&repo, &name).await?;
        info!(chart = %chart_dir, "rendering chart");

        let chart_yaml = self.require_file(&format!("{chart_dir}/Chart.yaml")).await?;
        let values_yaml = self
            .require_file(&format!("{chart_dir}/values.yaml"))
            .await?;
        let chart = HelmChart::from_sources(&chart_yaml, &values_yaml)?;
        let context = chart.evaluation_context();

        let registry = TemplateRegistry::default();
        let templates_dir = format!("{chart_dir}/templates");
        let mut manifests = IndexMap::new();
        let mut failures = IndexMap::new();

        // Helpers first, so every manifest sees the named templates.
        if let Some(source) = self
            .fs
            .get(&format!("{templates_dir}/{HELPERS_FILE}"))
            .await?
        {
            let mut interpreter = Interpreter::with_registry(context.clone(), registry.clone());
            if let Err(err) = interpreter.render(&source) {
                warn!(file = HELPERS_FILE, %err, "helpers failed to render");
                failures.insert(HELPERS_FILE.to_string(), err.to_string());
            }
        }

        for entry in self.fs.list(&templates_dir).await? {
            if !entry.is_file || entry.name == HELPERS_FILE {
                continue;
            }
            let Some(source) = self.fs.get(&entry.path).await? else {
                continue;
            };

            let mut interpreter = Interpreter::with_registry(context.clone(), registry.clone());
            match interpreter.render(&source) {
                Ok(rendered) if rendered.trim().is_empty() => {
                    debug!(file = %entry.name, "template rendered empty, skipping");
                }
                Ok(rendered) => {
                    manifests.insert(entry.name, rendered);
                }
                Err(err) => {
                    warn!(file = %entry.name, %err, "template failed to render");
                    failures.insert(entry.name, err.to_string());
                }
            }
        }

        Ok(RenderedChart {
            chart,
            manifests,
            failures,
        })
    }

    /// Render every reference independently and report which charts come
    /// out clean. One broken chart never affects the others.
    pub async fn check_charts(&self, references: &[String]) -> Vec<CompatReport> {
        let mut reports = Vec::with_capacity(references.len());
        for reference in references {
            let report = match self.render(reference).await {
                Ok(rendered) => CompatReport {
                    reference: reference.clone(),
                    compatible: rendered.is_clean(),
                    detail: rendered
                        .failures
                        .iter()
                        .map(|(file, err)| format!("{file}: {err}"))
                        .collect(),
                },
                Err(err) => CompatReport {
                    reference: reference.clone(),
                    compatible: false,
                    detail: vec![err.to_string()],
                },
            };
            reports.push(report);
        }
        reports
    }

    /// Locate the chart directory under `repo`, matching case-insensitively
    async fn find_chart_dir(&self, repo: &str, name: &str) -> Result<String> {
        let entries = self.fs.list(repo).await?;
        entries
            .into_iter()
            .find(|e| !e.is_file && e.name.to_lowercase() == name)
            .map(|e| e.path)
            .ok_or_else(|| EngineError::ChartNotFound {
                repo: repo.to_string(),
                chart: name.to_string(),
            })
    }

    async fn require_file(&self, path: &str) -> Result<String> {
        self.fs
            .get(path)
            .await?
            .ok_or_else(|| EngineError::MissingChartFile {
                path: path.to_string(),
            })
    }
}

/// Split a `repo/name` reference, lower-casing the chart name
fn parse_reference(reference: &str) -> Result<(String, String)> {
    match reference.split_once('/') {
        Some((repo, name)) if !repo.is_empty() && !name.is_empty() => {
            Ok((repo.to_string(), name.to_lowercase()))
        }
        _ => Err(EngineError::InvalidChartReference {
            reference: reference.to_string(),
        }),
    }
}
