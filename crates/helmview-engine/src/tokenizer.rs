//! Template tokenizer
//!
//! Locates `{{ ... }}` statements in a document and nests block statements
//! structurally: a linear scan over all matches with an explicit depth
//! counter pairs every `if`/`range`/`define` opener with its own `end`,
//! collecting `else` boundaries that belong to the opener (depth 1) along
//! the way. The body between boundaries is tokenized recursively.
//!
//! Whitespace handling is best-effort: `{{-`/`-}}` markers trim all
//! adjacent whitespace, and a single newline before a control statement
//! (block keywords, `else`/`end`, comments, assignments) is dropped so
//! control lines do not leave blank lines behind. Text before a plain
//! interpolation is kept verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{EngineError, Result};
use crate::token::{directive_keyword, ElseBranch, Statement, Token};

static STATEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(-?)\s*((?s:.)*?)\s*(-?)\}\}").expect("statement regex"));

/// Keywords that open a block terminated by a matching `end`
const BLOCK_KEYWORDS: [&str; 3] = ["if", "range", "define"];

/// A located statement match within the document
struct StmtMatch {
    start: usize,
    end: usize,
    data: String,
    trim_before: bool,
    trim_after: bool,
}

/// Tokenize a template document into an ordered tree
pub fn tokenize(document: &str) -> Result<Vec<Token>> {
    let matches = find_statements(document);
    build(document, &matches)
}

fn find_statements(document: &str) -> Vec<StmtMatch> {
    STATEMENT_RE
        .captures_iter(document)
        .map(|caps| {
            let whole = caps.get(0).expect("match");
            StmtMatch {
                start: whole.start(),
                end: whole.end(),
                data: caps[2].to_string(),
                trim_before: &caps[1] == "-",
                trim_after: &caps[3] == "-",
            }
        })
        .collect()
}

fn build(document: &str, matches: &[StmtMatch]) -> Result<Vec<Token>> {
    let mut nodes = Vec::new();
    let mut done = 0usize;
    let mut carry_trim = false;
    let mut i = 0;

    while i < matches.len() {
        let m = &matches[i];
        push_text(
            &mut nodes,
            &document[done..m.start],
            carry_trim,
            m.trim_before,
            swallows_line(&m.data),
        );

        if BLOCK_KEYWORDS.contains(&m.keyword().as_str()) {
            let (else_indices, end_idx) = scan_block(matches, i)?;
            let end_match = &matches[end_idx];

            // Inner body runs up to the first boundary (first else, or end).
            let first_boundary = else_indices
                .first()
                .map(|&e| &matches[e])
                .unwrap_or(end_match);
            let inner = tokenize(body_slice(document, m, first_boundary))?;

            let mut branches = Vec::new();
            for (b, &e) in else_indices.iter().enumerate() {
                let else_match = &matches[e];
                let boundary = else_indices
                    .get(b + 1)
                    .map(|&n| &matches[n])
                    .unwrap_or(end_match);
                branches.push(ElseBranch {
                    guard: else_guard(&else_match.data),
                    body: tokenize(body_slice(document, else_match, boundary))?,
                });
            }

            nodes.push(Token::Statement(Statement {
                data: m.data.clone(),
                inner: Some(inner),
                branches,
            }));
            done = end_match.end;
            carry_trim = end_match.trim_after;
            i = end_idx + 1;
        } else {
            nodes.push(Token::Statement(Statement::leaf(m.data.clone())));
            done = m.end;
            carry_trim = m.trim_after;
            i += 1;
        }
    }

    push_text(&mut nodes, &document[done..], carry_trim, false, false);
    Ok(nodes)
}

/// Find the else boundaries and terminating `end` of the block opened at
/// `opener`, tracking nesting depth so inner blocks keep their own `end`
fn scan_block(matches: &[StmtMatch], opener: usize) -> Result<(Vec<usize>, usize)> {
    let mut depth = 1usize;
    let mut else_indices = Vec::new();

    for (j, m) in matches.iter().enumerate().skip(opener + 1) {
        let keyword = m.keyword();
        if BLOCK_KEYWORDS.contains(&keyword.as_str()) {
            depth += 1;
        } else if keyword == "else" {
            if depth == 1 {
                else_indices.push(j);
            }
        } else if keyword == "end" {
            depth -= 1;
            if depth == 0 {
                return Ok((else_indices, j));
            }
        }
    }

    Err(EngineError::parse(
        &matches[opener].data,
        "no matching `end` before the document ends",
    ))
}

/// Extract the body text between a statement and the next boundary,
/// applying boundary-adjacent whitespace trims
fn body_slice<'d>(document: &'d str, after: &StmtMatch, boundary: &StmtMatch) -> &'d str {
    let mut body = &document[after.end..boundary.start];
    if after.trim_after {
        body = body.trim_start();
    }
    if boundary.trim_before {
        body = body.trim_end();
    } else if let Some(stripped) = body.strip_suffix('\n') {
        body = stripped;
    }
    body
}

/// Guard text of an `else` directive: `else if <cond>` -> `<cond>`
fn else_guard(data: &str) -> Option<String> {
    let rest = data.trim().strip_prefix("else").unwrap_or(data).trim();
    let rest = rest.strip_prefix("if ").map(str::trim).unwrap_or(rest);
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

fn push_text(
    nodes: &mut Vec<Token>,
    text: &str,
    trim_leading: bool,
    trim_trailing: bool,
    before_control: bool,
) {
    let mut text = text;
    if trim_leading {
        text = text.trim_start();
    }
    if trim_trailing {
        text = text.trim_end();
    } else if before_control {
        if let Some(stripped) = text.strip_suffix('\n') {
            text = stripped;
        }
    }
    if !text.is_empty() {
        nodes.push(Token::Text(text.to_string()));
    }
}

/// Whether a directive occupies its line without emitting anything, so
/// the newline before it can be dropped: block keywords, `else`/`end`,
/// comments, and `$name :=` assignments. Interpolations emit text and
/// must keep the newline before them.
fn swallows_line(data: &str) -> bool {
    let data = data.trim();
    if data.starts_with("/*") {
        return true;
    }
    let mut words = data.split_whitespace();
    let Some(first) = words.next() else {
        return false;
    };
    if matches!(
        first.to_lowercase().as_str(),
        "if" | "range" | "define" | "else" | "end"
    ) {
        return true;
    }
    first.starts_with('$') && words.next() == Some(":=")
}

impl StmtMatch {
    fn keyword(&self) -> String {
        directive_keyword(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statements(nodes: &[Token]) -> Vec<&Statement> {
        nodes
            .iter()
            .filter_map(|n| match n {
                Token::Statement(s) => Some(s),
                Token::Text(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_plain_text_passthrough() {
        let nodes = tokenize("kind: Deployment\nname: app\n").unwrap();
        assert_eq!(nodes, vec![Token::Text("kind: Deployment\nname: app\n".into())]);
    }

    #[test]
    fn test_leaf_statement() {
        let nodes = tokenize("name: {{ .Values.name }}").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[1],
            Token::Statement(Statement::leaf(".Values.name"))
        );
    }

    #[test]
    fn test_if_block_owns_inner() {
        let nodes = tokenize("{{ if .Values.on }}enabled{{ end }}").unwrap();
        let stmts = statements(&nodes);
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].data, "if .Values.on");
        assert_eq!(
            stmts[0].inner.as_deref(),
            Some(&[Token::Text("enabled".into())][..])
        );
        assert!(stmts[0].branches.is_empty());
    }

    #[test]
    fn test_nested_blocks_keep_their_own_end() {
        let doc = "{{ if .a }}A{{ range .xs }}X{{ end }}B{{ end }}tail";
        let nodes = tokenize(doc).unwrap();
        let stmts = statements(&nodes);
        assert_eq!(stmts.len(), 1);

        let inner = stmts[0].inner.as_ref().unwrap();
        let inner_stmts = statements(inner);
        assert_eq!(inner_stmts.len(), 1);
        assert_eq!(inner_stmts[0].data, "range .xs");
        assert_eq!(nodes.last(), Some(&Token::Text("tail".into())));
    }

    #[test]
    fn test_else_branches_in_source_order() {
        let doc = "{{ if .a }}A{{ else if .b }}B{{ else }}C{{ end }}";
        let nodes = tokenize(doc).unwrap();
        let stmts = statements(&nodes);
        let branches = &stmts[0].branches;

        assert_eq!(branches.len(), 2);
        assert_eq!(branches[0].guard.as_deref(), Some(".b"));
        assert_eq!(branches[0].body, vec![Token::Text("B".into())]);
        assert_eq!(branches[1].guard, None);
        assert_eq!(branches[1].body, vec![Token::Text("C".into())]);
    }

    #[test]
    fn test_else_of_nested_if_stays_nested() {
        let doc = "{{ if .a }}{{ if .b }}B{{ else }}C{{ end }}{{ end }}";
        let nodes = tokenize(doc).unwrap();
        let outer = statements(&nodes)[0];
        assert!(outer.branches.is_empty());

        let inner = statements(outer.inner.as_ref().unwrap())[0];
        assert_eq!(inner.branches.len(), 1);
    }

    #[test]
    fn test_define_captures_block() {
        let doc = r#"{{ define "name" }}hello{{ end }}"#;
        let nodes = tokenize(doc).unwrap();
        let stmts = statements(&nodes);
        assert_eq!(stmts[0].inner.as_deref(), Some(&[Token::Text("hello".into())][..]));
    }

    #[test]
    fn test_unmatched_opener_is_parse_error() {
        let err = tokenize("{{ if .Values.on }}never closed").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("if .Values.on"), "got: {msg}");
        assert!(msg.contains("no matching `end`"));
    }

    #[test]
    fn test_block_count_matches_openers() {
        let doc = "{{ if .a }}{{ range .b }}{{ end }}{{ end }}{{ if .c }}{{ end }}";
        let nodes = tokenize(doc).unwrap();
        let top = statements(&nodes);
        assert_eq!(top.len(), 2);
        assert!(top.iter().all(|s| s.inner.is_some()));
    }

    #[test]
    fn test_control_line_newline_is_dropped() {
        let doc = "a: 1\n{{ if .on }}\nb: 2\n{{ end }}\nc: 3\n";
        let nodes = tokenize(doc).unwrap();

        assert_eq!(nodes[0], Token::Text("a: 1".into()));
        let stmt = statements(&nodes)[0];
        assert_eq!(stmt.inner.as_deref(), Some(&[Token::Text("\nb: 2".into())][..]));
        assert_eq!(nodes.last(), Some(&Token::Text("\nc: 3\n".into())));
    }

    #[test]
    fn test_interpolation_keeps_preceding_newline() {
        let doc = "labels:\n{{ .Values.labels }}\nname: x\n";
        let nodes = tokenize(doc).unwrap();

        assert_eq!(nodes[0], Token::Text("labels:\n".into()));
        assert_eq!(nodes[2], Token::Text("\nname: x\n".into()));
    }

    #[test]
    fn test_dash_markers_trim_whitespace() {
        let doc = "a: 1   {{- .x -}}   b";
        let nodes = tokenize(doc).unwrap();
        assert_eq!(nodes[0], Token::Text("a: 1".into()));
        assert_eq!(nodes[2], Token::Text("b".into()));
    }

    #[test]
    fn test_multiline_comment_statement() {
        let doc = "{{/* a\nmultiline\ncomment */}}x";
        let nodes = tokenize(doc).unwrap();
        let stmts = statements(&nodes);
        assert_eq!(stmts.len(), 1);
        assert!(stmts[0].data.starts_with("/*"));
    }
}
