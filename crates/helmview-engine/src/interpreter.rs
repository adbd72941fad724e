//! Statement interpreter
//!
//! Walks the token tree and produces rendered text. Each template file gets
//! its own `Interpreter` (fresh variable scope), while the named-template
//! registry is shared across all files of a chart so `_helpers.tpl`
//! definitions are visible everywhere.
//!
//! A statement is either a comment, a variable assignment, a control block
//! (`if`/`range`/`define`, handled here), or a pipeline of expression
//! stages. Pipelines split on top-level `|`; the previous stage's output is
//! appended to the next stage as its final argument.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::token::{lex_args, RawArg, Statement, Token};
use crate::tokenizer::tokenize;

/// Named templates collected by `define`, shared across a chart's files
pub type TemplateRegistry = Arc<Mutex<IndexMap<String, String>>>;

pub struct Interpreter {
    context: JsonValue,
    variables: HashMap<String, JsonValue>,
    registry: TemplateRegistry,
}

impl Interpreter {
    /// Interpreter with a private template registry
    pub fn new(context: JsonValue) -> Self {
        Self::with_registry(context, TemplateRegistry::default())
    }

    /// Interpreter sharing a registry with other files of the same chart
    pub fn with_registry(context: JsonValue, registry: TemplateRegistry) -> Self {
        Self {
            context,
            variables: HashMap::new(),
            registry,
        }
    }

    /// Render a whole template document
    pub fn render(&mut self, document: &str) -> Result<String> {
        let tokens = tokenize(document)?;
        self.render_tokens(&tokens)
    }

    pub(crate) fn render_tokens(&mut self, tokens: &[Token]) -> Result<String> {
        let mut out = String::new();
        for token in tokens {
            match token {
                Token::Text(text) => out.push_str(text),
                Token::Statement(stmt) => out.push_str(&self.eval_statement(stmt)?),
            }
        }
        Ok(out)
    }

    fn eval_statement(&mut self, stmt: &Statement) -> Result<String> {
        let data = stmt.data.trim();
        if data.starts_with("/*") {
            return Ok(String::new());
        }

        match stmt.keyword().as_str() {
            "if" => self.eval_if(stmt),
            "range" => self.eval_range(stmt),
            "define" => self.eval_define(stmt),
            // A stray `end` is inert; a stray `else` is a real mistake.
            "end" => Ok(String::new()),
            "else" => Err(EngineError::eval("`else` outside of an `if` block")),
            _ => self.eval_pipeline(data),
        }
    }

    /// Evaluate a pipeline expression: stages split on top-level `|`,
    /// with an optional leading `$name :=` assignment
    pub(crate) fn eval_pipeline(&mut self, data: &str) -> Result<String> {
        let args = lex_args(data)?;
        let mut stages = split_stages(&args, data)?;

        let mut assign = None;
        let target = match stages[0].as_slice() {
            [RawArg::Word(name), RawArg::Word(walrus), ..] if walrus == ":=" => {
                Some(name.clone())
            }
            _ => None,
        };
        if let Some(target) = target {
            let Some(name) = target.strip_prefix('$') else {
                return Err(EngineError::eval(format!(
                    "cannot assign to `{target}`: variable names start with `$`"
                )));
            };
            assign = Some(name.to_string());
            stages[0].drain(..2);
            if stages[0].is_empty() {
                return Err(EngineError::eval(format!(
                    "assignment to `${name}` has no value"
                )));
            }
        }

        // A plain reference or variable assignment keeps its structure so
        // the target can still be ranged over later.
        if let Some(name) = &assign {
            if let [stage] = stages.as_slice() {
                if let [RawArg::Word(w)] = stage.as_slice() {
                    let value = if w.starts_with('.') {
                        Some(self.lookup_path(w).unwrap_or(JsonValue::Null))
                    } else if w.starts_with('$') {
                        Some(self.variable(w).unwrap_or(JsonValue::Null))
                    } else {
                        None
                    };
                    if let Some(value) = value {
                        self.variables.insert(name.clone(), value);
                        return Ok(String::new());
                    }
                }
            }
        }

        let mut value: Option<String> = None;
        for stage in &stages {
            let mut stage = stage.clone();
            if let Some(prev) = value.take() {
                stage.push(RawArg::Quoted(prev));
            }
            value = Some(self.eval_stage(&stage)?);
        }
        let out = value.unwrap_or_default();

        if let Some(name) = assign {
            self.variables.insert(name, JsonValue::String(out));
            return Ok(String::new());
        }
        Ok(out)
    }

    fn eval_stage(&mut self, args: &[RawArg]) -> Result<String> {
        match args {
            [] => Err(EngineError::eval("empty pipeline stage")),
            [RawArg::Quoted(text)] => Ok(text.clone()),
            [RawArg::Paren(inner)] => self.eval_pipeline(inner),
            [RawArg::Word(word), rest @ ..] => {
                if crate::functions::is_builtin(word) {
                    return self.call_builtin(word, rest);
                }
                if crate::condition::is_condition_keyword(word) {
                    return Ok(self.eval_condition(args)?.to_string());
                }
                if word.starts_with('.') {
                    let value = self.lookup_path(word).unwrap_or(JsonValue::Null);
                    Ok(value_to_string(&value))
                } else if let Some(name) = word.strip_prefix('$') {
                    Ok(self
                        .variables
                        .get(name)
                        .map(value_to_string)
                        .unwrap_or_default())
                } else {
                    Err(EngineError::eval(format!("unknown function `{word}`")))
                }
            }
            _ => Err(EngineError::eval(
                "a quoted string or group cannot take arguments",
            )),
        }
    }

    fn eval_if(&mut self, stmt: &Statement) -> Result<String> {
        let condition = directive_rest(&stmt.data);
        if self.eval_condition_text(condition)? {
            return self.render_tokens(stmt.inner.as_deref().unwrap_or(&[]));
        }
        for branch in &stmt.branches {
            let taken = match &branch.guard {
                Some(guard) => self.eval_condition_text(guard)?,
                None => true,
            };
            if taken {
                return self.render_tokens(&branch.body);
            }
        }
        Ok(String::new())
    }

    /// `range .coll`, `range $v := .coll`, or `range $k, $v := .coll`:
    /// arrays iterate in index order with a numeric key, mappings in
    /// insertion order. With no bindings the body just repeats per entry.
    /// Bindings persist after the loop.
    fn eval_range(&mut self, stmt: &Statement) -> Result<String> {
        let args = lex_args(directive_rest(&stmt.data))?;

        let mut names = Vec::new();
        let mut idx = 0;
        // A lone argument is always the collection, never a binding.
        if args.len() > 1 {
            while let Some(RawArg::Word(word)) = args.get(idx) {
                let Some(name) = word.strip_prefix('$') else {
                    break;
                };
                names.push(name.trim_end_matches(',').to_string());
                idx += 1;
            }
            if names.len() > 2 {
                return Err(EngineError::eval(
                    "range binds at most `$key, $value`",
                ));
            }
            if !names.is_empty() {
                match args.get(idx) {
                    Some(RawArg::Word(word)) if word == ":=" => idx += 1,
                    _ => {
                        return Err(EngineError::eval(
                            "range bindings must be followed by `:=`",
                        ))
                    }
                }
            }
        }

        let collection = match args.get(idx) {
            Some(RawArg::Word(word)) if word.starts_with('.') => {
                self.lookup_path(word).unwrap_or(JsonValue::Null)
            }
            Some(RawArg::Word(word)) if word.starts_with('$') => self
                .variables
                .get(word.trim_start_matches('$'))
                .cloned()
                .unwrap_or(JsonValue::Null),
            _ => {
                return Err(EngineError::eval(
                    "range needs a reference or variable to iterate",
                ))
            }
        };

        let body = stmt.inner.as_deref().unwrap_or(&[]);
        let mut out = String::new();
        match collection {
            JsonValue::Null => {}
            JsonValue::Array(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    self.bind_range(&names, JsonValue::from(i), item);
                    out.push_str(&self.render_tokens(body)?);
                }
            }
            JsonValue::Object(map) => {
                for (key, value) in map {
                    self.bind_range(&names, JsonValue::String(key), value);
                    out.push_str(&self.render_tokens(body)?);
                }
            }
            other => {
                return Err(EngineError::eval(format!(
                    "cannot range over {}",
                    value_type_name(&other)
                )))
            }
        }
        Ok(out)
    }

    fn bind_range(&mut self, names: &[String], key: JsonValue, value: JsonValue) {
        if let [key_name, value_name] = names {
            self.variables.insert(key_name.clone(), key);
            self.variables.insert(value_name.clone(), value);
        } else if let [value_name] = names {
            self.variables.insert(value_name.clone(), value);
        }
    }

    /// `define "name"`: render the body now and record it in the shared
    /// registry. The statement itself emits nothing.
    fn eval_define(&mut self, stmt: &Statement) -> Result<String> {
        let args = lex_args(directive_rest(&stmt.data))?;
        let name = match args.first() {
            Some(RawArg::Quoted(name)) => name.clone(),
            _ => {
                return Err(EngineError::eval(
                    "define expects a quoted template name",
                ))
            }
        };

        let body = self.render_tokens(stmt.inner.as_deref().unwrap_or(&[]))?;
        debug!(template = %name, "registering named template");
        self.lock_registry()?.insert(name, body);
        Ok(String::new())
    }

    /// Resolve a dot-path against the evaluation context
    pub(crate) fn lookup_path(&self, path: &str) -> Option<JsonValue> {
        let mut current = &self.context;
        for part in path.split('.').filter(|p| !p.is_empty()) {
            current = match current {
                JsonValue::Object(map) => map.get(part)?,
                JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current.clone())
    }

    pub(crate) fn variable(&self, name: &str) -> Option<JsonValue> {
        self.variables.get(name.trim_start_matches('$')).cloned()
    }

    pub(crate) fn lock_registry(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, IndexMap<String, String>>> {
        self.registry
            .lock()
            .map_err(|_| EngineError::eval("template registry lock poisoned"))
    }
}

/// Directive text after its first word
pub(crate) fn directive_rest(data: &str) -> &str {
    data.trim()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim())
        .unwrap_or("")
}

fn split_stages(args: &[RawArg], data: &str) -> Result<Vec<Vec<RawArg>>> {
    let mut stages = vec![Vec::new()];
    for arg in args {
        if matches!(arg, RawArg::Word(w) if w == "|") {
            stages.push(Vec::new());
        } else if let Some(stage) = stages.last_mut() {
            stage.push(arg.clone());
        }
    }
    if stages.iter().any(|s| s.is_empty()) && stages.len() > 1 {
        return Err(EngineError::eval(format!("malformed pipeline in `{data}`")));
    }
    Ok(stages)
}

/// Scalar rendering of a context value: null is empty, strings are bare,
/// collections fall back to compact JSON
pub(crate) fn value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Truthiness used by conditions, `default`, and `empty`
pub(crate) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        JsonValue::String(s) => !s.is_empty() && s != "false" && s != "0",
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}

fn value_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "a mapping",
    }
}
