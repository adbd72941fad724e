//! Builtin template functions
//!
//! Every builtin receives its raw arguments with parenthesized groups
//! pre-evaluated to literals, and takes its subject as the LAST argument
//! so piped values (`.Values.x | b64enc`) land in the right place.
//!
//! `env` and `uuidv4` render stable placeholders: previews have no target
//! environment, and a random id would make output non-reproducible.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::interpreter::{is_truthy, value_to_string, Interpreter};
use crate::token::{Argument, RawArg};

/// Names dispatched to the builtin catalogue
pub(crate) fn is_builtin(word: &str) -> bool {
    matches!(
        word,
        "default"
            | "quote"
            | "printf"
            | "trunc"
            | "indent"
            | "toYaml"
            | "template"
            | "include"
            | "replace"
            | "trimSuffix"
            | "b64enc"
            | "env"
            | "uuidv4"
    )
}

impl Interpreter {
    pub(crate) fn call_builtin(&mut self, name: &str, raw: &[RawArg]) -> Result<String> {
        match name {
            "default" => self.fn_default(raw),
            "quote" => {
                let text = self.arg_string(raw, 0)?;
                serde_json::to_string(&text).map_err(|e| EngineError::eval(e.to_string()))
            }
            "printf" => self.fn_printf(raw),
            "trunc" => {
                let n = self.arg_count(raw, "trunc")?;
                let text = self.arg_string(raw, raw.len() - 1)?;
                Ok(text.chars().take(n).collect())
            }
            "indent" => self.fn_indent(raw),
            "toYaml" => self.fn_to_yaml(raw),
            "template" | "include" => {
                let name = self.arg_string(raw, 0)?;
                Ok(self.lock_registry()?.get(&name).cloned().unwrap_or_default())
            }
            "replace" => {
                let needle = self.arg_string(raw, 0)?;
                let replacement = self.arg_string(raw, 1)?;
                let haystack = self.arg_string(raw, 2)?;
                Ok(haystack.replace(&needle, &replacement))
            }
            "trimSuffix" => self.fn_trim_suffix(raw),
            "b64enc" => {
                let text = self.arg_string(raw, 0)?;
                Ok(BASE64.encode(text))
            }
            "env" => {
                let name = self.arg_string(raw, 0)?;
                Ok(format!("<{name} env>"))
            }
            "uuidv4" => Ok("<uuidv4>".to_string()),
            other => Err(EngineError::eval(format!("unknown function `{other}`"))),
        }
    }

    /// Raw argument with paren groups pre-evaluated to literals
    pub(crate) fn eval_arg(&mut self, raw: &RawArg) -> Result<Argument> {
        match raw {
            RawArg::Quoted(text) => Ok(Argument::Literal(text.clone())),
            RawArg::Paren(inner) => Ok(Argument::Literal(self.eval_pipeline(inner)?)),
            RawArg::Word(word) => Ok(Argument::from_word(word)),
        }
    }

    fn arg_value(&mut self, raw: &RawArg) -> Result<JsonValue> {
        let value = match self.eval_arg(raw)? {
            Argument::Literal(text) => JsonValue::String(text),
            Argument::Reference(path) => self.lookup_path(&path).unwrap_or(JsonValue::Null),
            Argument::Variable(name) => self.variable(&name).unwrap_or(JsonValue::Null),
            Argument::Bare(word) => JsonValue::String(word),
        };
        Ok(value)
    }

    fn arg_string(&mut self, raw: &[RawArg], index: usize) -> Result<String> {
        let arg = raw
            .get(index)
            .ok_or_else(|| EngineError::eval("missing argument"))?;
        Ok(value_to_string(&self.arg_value(arg)?))
    }

    fn arg_count(&mut self, raw: &[RawArg], name: &str) -> Result<usize> {
        self.arg_string(raw, 0)?
            .parse()
            .map_err(|_| EngineError::eval(format!("`{name}` expects a count argument")))
    }

    /// Last truthy argument wins, scanning right to left; `-` flags are
    /// skipped; with nothing truthy the result is empty, never an error
    fn fn_default(&mut self, raw: &[RawArg]) -> Result<String> {
        for arg in raw.iter().rev() {
            if matches!(self.eval_arg(arg)?, Argument::Bare(w) if w == "-") {
                continue;
            }
            let value = self.arg_value(arg)?;
            if is_truthy(&value) {
                return Ok(value_to_string(&value));
            }
        }
        Ok(String::new())
    }

    fn fn_printf(&mut self, raw: &[RawArg]) -> Result<String> {
        let format = match raw.first().map(|a| self.eval_arg(a)).transpose()? {
            Some(Argument::Literal(text)) => text,
            _ => return Err(EngineError::eval("printf expects a quoted format string")),
        };
        let values = raw[1..]
            .iter()
            .map(|a| self.arg_value(a))
            .collect::<Result<Vec<_>>>()?;
        sprintf(&format, &values)
    }

    fn fn_indent(&mut self, raw: &[RawArg]) -> Result<String> {
        let n = self.arg_count(raw, "indent")?;
        let text = self.arg_string(raw, raw.len() - 1)?;
        let pad = " ".repeat(n);
        Ok(text
            .lines()
            .map(|line| format!("{pad}{line}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn fn_to_yaml(&mut self, raw: &[RawArg]) -> Result<String> {
        let last = raw.len().saturating_sub(1);
        let arg = raw
            .get(last)
            .ok_or_else(|| EngineError::eval("toYaml expects an argument"))?;
        let value = self.arg_value(arg)?;
        match value {
            JsonValue::Null => Ok("null".to_string()),
            JsonValue::Bool(b) => Ok(b.to_string()),
            other => serde_yaml::to_string(&other)
                .map(|s| s.trim_end().to_string())
                .map_err(|e| EngineError::eval(e.to_string())),
        }
    }

    /// Strips every leading and trailing occurrence of the needle
    fn fn_trim_suffix(&mut self, raw: &[RawArg]) -> Result<String> {
        let needle = self.arg_string(raw, 0)?;
        let mut text = self.arg_string(raw, raw.len() - 1)?;
        if needle.is_empty() {
            return Ok(text);
        }
        while let Some(stripped) = text.strip_prefix(&needle) {
            text = stripped.to_string();
        }
        while let Some(stripped) = text.strip_suffix(&needle) {
            text = stripped.to_string();
        }
        Ok(text)
    }
}

/// Minimal sprintf: `%s`, `%v`, `%d`, `%f`, and `%%`
fn sprintf(format: &str, values: &[JsonValue]) -> Result<String> {
    let mut out = String::new();
    let mut chars = format.chars();
    let mut next = 0usize;

    let mut take = |next: &mut usize| -> Result<&JsonValue> {
        let value = values
            .get(*next)
            .ok_or_else(|| EngineError::eval("printf: not enough arguments"))?;
        *next += 1;
        Ok(value)
    };

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') | Some('v') => out.push_str(&value_to_string(take(&mut next)?)),
            Some('d') => {
                let value = take(&mut next)?;
                let n = match value {
                    JsonValue::Number(n) => n.as_f64(),
                    JsonValue::String(s) => s.parse().ok(),
                    _ => None,
                }
                .ok_or_else(|| EngineError::eval("printf: %d expects a number"))?;
                out.push_str(&(n as i64).to_string());
            }
            Some('f') => {
                let value = take(&mut next)?;
                let f = match value {
                    JsonValue::Number(n) => n.as_f64(),
                    JsonValue::String(s) => s.parse().ok(),
                    _ => None,
                }
                .ok_or_else(|| EngineError::eval("printf: %f expects a number"))?;
                out.push_str(&format!("{f:.6}"));
            }
            Some(other) => {
                return Err(EngineError::eval(format!(
                    "printf: unsupported verb `%{other}`"
                )))
            }
            None => return Err(EngineError::eval("printf: trailing `%`")),
        }
    }
    Ok(out)
}
