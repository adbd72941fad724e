//! Engine error taxonomy
//!
//! Parse and evaluation errors are fatal for the file that produced them;
//! the chart renderer catches them per file and continues with siblings.
//! Load errors (missing chart files, unknown chart) abort the whole render.

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    /// Structural template problems: unmatched `end`, malformed directives
    #[error("Parse error in `{{{{ {statement} }}}}`: {message}")]
    #[diagnostic(code(helmview::engine::parse))]
    Parse { statement: String, message: String },

    /// Problems found while evaluating an otherwise well-formed statement
    #[error("Evaluation error: {message}")]
    #[diagnostic(code(helmview::engine::eval))]
    Evaluation { message: String },

    #[error("Chart `{chart}` not found under `{repo}`")]
    #[diagnostic(code(helmview::engine::chart_not_found))]
    ChartNotFound { repo: String, chart: String },

    #[error("Chart is missing required file: {path}")]
    #[diagnostic(code(helmview::engine::missing_file))]
    MissingChartFile { path: String },

    #[error("Invalid chart reference `{reference}`: expected repo/name")]
    #[diagnostic(code(helmview::engine::bad_reference))]
    InvalidChartReference { reference: String },

    #[error(transparent)]
    Core(#[from] helmview_core::CoreError),

    #[error(transparent)]
    Filesystem(#[from] helmview_core::fs::FsError),
}

impl EngineError {
    /// Shorthand for an evaluation error with a formatted message
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Shorthand for a parse error tied to a statement's directive text
    pub fn parse(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            statement: statement.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
