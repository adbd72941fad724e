//! Condition evaluation for `if` guards
//!
//! Conditions are prefix expressions: a keyword followed by its operands
//! (`eq .a .b`, `and .a (not .b)`), or a single reference whose truthiness
//! decides the branch. Parenthesized operands of `and`/`or`/`not` recurse
//! as sub-conditions; operands of comparisons evaluate as value
//! expressions.

use semver::Version;
use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::interpreter::{is_truthy, value_to_string, Interpreter};
use crate::token::{lex_args, RawArg};

/// Keywords understood in condition position
pub(crate) fn is_condition_keyword(word: &str) -> bool {
    matches!(
        word,
        "eq" | "ne"
            | "lt"
            | "gt"
            | "and"
            | "or"
            | "not"
            | "contains"
            | "empty"
            | "semverCompare"
            | "include"
    )
}

impl Interpreter {
    pub(crate) fn eval_condition_text(&mut self, text: &str) -> Result<bool> {
        let args = lex_args(text)?;
        self.eval_condition(&args)
    }

    pub(crate) fn eval_condition(&mut self, args: &[RawArg]) -> Result<bool> {
        let Some(first) = args.first() else {
            return Err(EngineError::eval("empty condition"));
        };

        if let RawArg::Word(word) = first {
            match word.as_str() {
                "and" | "or" => return self.eval_junction(word == "and", &args[1..]),
                "not" => return Ok(!self.eval_condition(&args[1..])?),
                "eq" | "ne" | "lt" | "gt" => return self.eval_comparison(word, &args[1..]),
                "contains" => return self.eval_contains(&args[1..]),
                "empty" => return self.eval_empty(&args[1..]),
                "semverCompare" => return self.eval_semver_compare(&args[1..]),
                "include" => return self.eval_include_truth(&args[1..]),
                _ => {}
            }
        }

        // Fallback: a single reference, quoted string, or group decides by
        // truthiness. Anything else in leading position is a mistake.
        match args {
            [RawArg::Paren(inner)] => self.eval_condition_text(inner),
            [RawArg::Quoted(text)] => Ok(is_truthy(&JsonValue::String(text.clone()))),
            [RawArg::Word(word)] if word.starts_with('.') => {
                let value = self.lookup_path(word).unwrap_or(JsonValue::Null);
                Ok(is_truthy(&value))
            }
            _ => Err(EngineError::eval(format!(
                "cannot evaluate condition starting with `{}`",
                raw_arg_text(first)
            ))),
        }
    }

    fn eval_junction(&mut self, conjunctive: bool, operands: &[RawArg]) -> Result<bool> {
        if operands.is_empty() {
            return Err(EngineError::eval("`and`/`or` expect at least one operand"));
        }
        let mut acc = conjunctive;
        for operand in operands {
            let truth = self.operand_truth(operand)?;
            acc = if conjunctive { acc && truth } else { acc || truth };
        }
        Ok(acc)
    }

    fn eval_comparison(&mut self, op: &str, operands: &[RawArg]) -> Result<bool> {
        if operands.len() < 2 {
            return Err(EngineError::eval(format!("`{op}` expects two operands")));
        }
        let values = operands
            .iter()
            .map(|o| self.operand_value(o))
            .collect::<Result<Vec<_>>>()?;

        Ok(values.windows(2).all(|pair| match op {
            "eq" => values_equal(&pair[0], &pair[1]),
            "ne" => !values_equal(&pair[0], &pair[1]),
            "lt" => values_less(&pair[0], &pair[1]),
            _ => values_less(&pair[1], &pair[0]),
        }))
    }

    /// `contains haystack needle`: the first operand must contain the second
    fn eval_contains(&mut self, operands: &[RawArg]) -> Result<bool> {
        let [haystack, needle] = operands else {
            return Err(EngineError::eval("`contains` expects two operands"));
        };
        let haystack = value_to_string(&self.operand_value(haystack)?);
        let needle = value_to_string(&self.operand_value(needle)?);
        Ok(haystack.contains(&needle))
    }

    /// True when any operand stringifies to the empty string
    fn eval_empty(&mut self, operands: &[RawArg]) -> Result<bool> {
        if operands.is_empty() {
            return Err(EngineError::eval("`empty` expects at least one operand"));
        }
        for operand in operands {
            if value_to_string(&self.operand_value(operand)?).is_empty() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Version equality between two operands; anything unparseable is false
    fn eval_semver_compare(&mut self, operands: &[RawArg]) -> Result<bool> {
        let [a, b] = operands else {
            return Err(EngineError::eval("`semverCompare` expects two operands"));
        };
        let a = value_to_string(&self.operand_value(a)?);
        let b = value_to_string(&self.operand_value(b)?);

        match (
            Version::parse(a.trim_start_matches('v')),
            Version::parse(b.trim_start_matches('v')),
        ) {
            (Ok(a), Ok(b)) => Ok(a == b),
            _ => Ok(false),
        }
    }

    /// Truthiness of a named template's rendered content
    fn eval_include_truth(&mut self, operands: &[RawArg]) -> Result<bool> {
        let Some(name) = operands.first() else {
            return Err(EngineError::eval("`include` expects a template name"));
        };
        let name = value_to_string(&self.operand_value(name)?);
        let content = self.lock_registry()?.get(&name).cloned();
        Ok(content
            .map(|c| is_truthy(&JsonValue::String(c)))
            .unwrap_or(false))
    }

    /// Boolean view of an operand: groups recurse as sub-conditions,
    /// everything else resolves to a value first
    fn operand_truth(&mut self, operand: &RawArg) -> Result<bool> {
        match operand {
            RawArg::Paren(inner) => self.eval_condition_text(inner),
            other => Ok(is_truthy(&self.operand_value(other)?)),
        }
    }

    /// Value view of an operand, for comparisons
    fn operand_value(&mut self, operand: &RawArg) -> Result<JsonValue> {
        match operand {
            RawArg::Quoted(text) => Ok(JsonValue::String(text.clone())),
            RawArg::Paren(inner) => Ok(JsonValue::String(self.eval_pipeline(inner)?)),
            RawArg::Word(word) => {
                if word.starts_with('.') {
                    return Ok(self.lookup_path(word).unwrap_or(JsonValue::Null));
                }
                if word.starts_with('$') {
                    return Ok(self.variable(word).unwrap_or(JsonValue::Null));
                }
                if word == "true" || word == "false" {
                    return Ok(JsonValue::Bool(word == "true"));
                }
                if let Ok(n) = word.parse::<i64>() {
                    return Ok(JsonValue::from(n));
                }
                if let Ok(f) = word.parse::<f64>() {
                    return Ok(JsonValue::from(f));
                }
                Ok(JsonValue::String(word.clone()))
            }
        }
    }
}

fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    if a == b {
        return true;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x == y;
    }
    value_to_string(a) == value_to_string(b)
}

fn values_less(a: &JsonValue, b: &JsonValue) -> bool {
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x < y,
        _ => value_to_string(a) < value_to_string(b),
    }
}

fn raw_arg_text(arg: &RawArg) -> &str {
    match arg {
        RawArg::Quoted(s) | RawArg::Paren(s) | RawArg::Word(s) => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interp() -> Interpreter {
        Interpreter::new(json!({
            "Values": {
                "name": "redis",
                "replicas": 3,
                "enabled": true,
                "empty": "",
                "version": "1.2.3",
                "tags": ["a", "b"],
            },
        }))
    }

    fn check(cond: &str) -> bool {
        interp().eval_condition_text(cond).unwrap()
    }

    #[test]
    fn test_bare_reference_truthiness() {
        assert!(check(".Values.enabled"));
        assert!(check(".Values.name"));
        assert!(!check(".Values.empty"));
        assert!(!check(".Values.missing"));
    }

    #[test]
    fn test_eq_across_types() {
        assert!(check(r#"eq .Values.name "redis""#));
        assert!(check("eq .Values.replicas 3"));
        assert!(check(r#"eq .Values.replicas "3""#));
        assert!(!check(r#"eq .Values.name "mysql""#));
    }

    #[test]
    fn test_ne_lt_gt() {
        assert!(check(r#"ne .Values.name "mysql""#));
        assert!(check("lt .Values.replicas 5"));
        assert!(check("gt .Values.replicas 1"));
        assert!(!check("lt .Values.replicas 3"));
    }

    #[test]
    fn test_and_or_not() {
        assert!(check("and .Values.enabled .Values.name"));
        assert!(!check("and .Values.enabled .Values.empty"));
        assert!(check("or .Values.empty .Values.name"));
        assert!(!check("or .Values.empty .Values.missing"));
        assert!(check("not .Values.empty"));
    }

    #[test]
    fn test_nested_groups() {
        assert!(check("and (or .Values.empty .Values.enabled) .Values.name"));
        assert!(!check("and (not .Values.enabled) .Values.name"));
    }

    #[test]
    fn test_empty_keyword() {
        assert!(check("empty .Values.empty"));
        assert!(check("empty .Values.missing"));
        assert!(!check("empty .Values.name"));
        // Any empty operand suffices.
        assert!(check("empty .Values.name .Values.empty"));
    }

    #[test]
    fn test_contains() {
        assert!(check(r#"contains .Values.name "red""#));
        assert!(!check(r#"contains .Values.name "blue""#));
    }

    #[test]
    fn test_semver_compare() {
        assert!(check(r#"semverCompare "1.2.3" .Values.version"#));
        assert!(check(r#"semverCompare "v1.2.3" .Values.version"#));
        assert!(!check(r#"semverCompare "1.2.4" .Values.version"#));
        // Unparseable input never matches.
        assert!(!check(r#"semverCompare .Values.name .Values.version"#));
    }

    #[test]
    fn test_include_truthiness() {
        let mut i = interp();
        i.render(r#"{{ define "full" }}content{{ end }}{{ define "blank" }}{{ end }}"#)
            .unwrap();
        assert!(i.eval_condition_text(r#"include "full""#).unwrap());
        assert!(!i.eval_condition_text(r#"include "blank""#).unwrap());
        assert!(!i.eval_condition_text(r#"include "missing""#).unwrap());
    }

    #[test]
    fn test_unknown_leading_token_is_an_error() {
        assert!(interp().eval_condition_text("frob .Values.name").is_err());
        assert!(interp().eval_condition_text("$var").is_err());
    }

    #[test]
    fn test_quoted_literal_truthiness() {
        assert!(check(r#""yes""#));
        assert!(!check(r#""""#));
        assert!(!check(r#""false""#));
    }
}
