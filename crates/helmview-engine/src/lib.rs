//! Helmview Engine - Helm-style template rendering without a cluster
//!
//! The pipeline runs in three layers:
//! - `tokenizer`: turns a template document into a tree of text spans and
//!   `{{ ... }}` statements, with `if`/`range`/`define` blocks nested
//! - `interpreter`: walks the tree against a chart's evaluation context,
//!   with `condition` deciding `if` guards and `functions` providing the
//!   builtin catalogue
//! - `renderer`: loads a chart through a `ChartFilesystem` and renders all
//!   of its template files into manifests
//!
//! Template semantics deliberately cover the subset of Go templates and
//! Sprig that public charts actually use, favoring a defensive preview
//! (placeholders, empty strings) over hard failures.

pub mod condition;
pub mod error;
pub mod functions;
pub mod interpreter;
pub mod renderer;
pub mod token;
pub mod tokenizer;

pub use error::{EngineError, Result};
pub use interpreter::{Interpreter, TemplateRegistry};
pub use renderer::{ChartRenderer, CompatReport, RenderedChart};
pub use token::{Statement, Token};
pub use tokenizer::tokenize;
