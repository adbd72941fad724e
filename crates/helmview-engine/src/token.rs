//! Token tree and argument model
//!
//! The tokenizer turns a template document into a list of `Token`s: literal
//! text spans interleaved with `{{ ... }}` statements. Block statements
//! (`if`/`range`/`define`) own a nested body and, for `if`, a list of
//! `else` branches.
//!
//! Directive text is lexed into `RawArg`s (words, quoted runs, and
//! parenthesized groups); the interpreter later classifies them into the
//! closed `Argument` union every builtin pattern-matches on.

use crate::error::{EngineError, Result};

/// A node of the parsed template tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, emitted verbatim
    Text(String),

    /// A `{{ ... }}` statement
    Statement(Statement),
}

/// A single template statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Raw directive text between the braces, trim markers stripped
    pub data: String,

    /// Nested body, present only for block statements
    pub inner: Option<Vec<Token>>,

    /// `else` branches in source order, meaningful only for `if`
    pub branches: Vec<ElseBranch>,
}

impl Statement {
    /// Leaf statement with no body
    pub fn leaf(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            inner: None,
            branches: Vec::new(),
        }
    }

    /// First whitespace-delimited word of the directive, lower-cased
    pub fn keyword(&self) -> String {
        directive_keyword(&self.data)
    }
}

/// One `else` branch of an `if` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElseBranch {
    /// Guard condition text (`else if <cond>`), `None` for a bare `else`
    pub guard: Option<String>,

    /// Branch body
    pub body: Vec<Token>,
}

/// First whitespace-delimited word of a directive, lower-cased
pub fn directive_keyword(data: &str) -> String {
    data.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// A lexed argument before classification
///
/// Quoted runs keep their embedded spaces; parenthesized groups keep the
/// unsplit text between the parens for recursive evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawArg {
    /// A double-quoted run, quotes stripped
    Quoted(String),

    /// A `( ... )` group, parens stripped
    Paren(String),

    /// Any other whitespace-delimited token
    Word(String),
}

/// The closed argument union consumed by builtins
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Literal text (from a quoted run or a pre-evaluated paren group)
    Literal(String),

    /// Dot-path into the evaluation context, e.g. `.Values.image.tag`
    Reference(String),

    /// `$`-prefixed variable name
    Variable(String),

    /// Anything else, including flags like `-` that builtins ignore
    Bare(String),
}

impl Argument {
    /// Classify a bare word by its sigil
    pub fn from_word(word: &str) -> Self {
        if word.starts_with('.') {
            Self::Reference(word.to_string())
        } else if word.starts_with('$') {
            Self::Variable(word.to_string())
        } else {
            Self::Bare(word.to_string())
        }
    }
}

/// Lex directive text into raw arguments
///
/// Splits on whitespace, merging double-quoted runs (embedded spaces kept)
/// and capturing balanced `( ... )` groups whole so pipe characters inside
/// them never split a pipeline.
pub fn lex_args(text: &str) -> Result<Vec<RawArg>> {
    let bytes = text.as_bytes();
    let mut args = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];

        if c.is_ascii_whitespace() {
            i += 1;
        } else if c == b'"' {
            i += 1;
            let mut buf = String::new();
            let mut closed = false;
            while i < bytes.len() {
                let ch = text[i..].chars().next().unwrap_or('"');
                if ch == '\\' {
                    if let Some(escaped) = text[i + 1..].chars().next() {
                        buf.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                        i += 1 + escaped.len_utf8();
                        continue;
                    }
                }
                i += ch.len_utf8();
                if ch == '"' {
                    closed = true;
                    break;
                }
                buf.push(ch);
            }
            if !closed {
                return Err(EngineError::parse(text, "unterminated quoted string"));
            }
            args.push(RawArg::Quoted(buf));
        } else if c == b'(' {
            let start = i + 1;
            let mut depth = 1usize;
            i += 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                i += 1;
            }
            if depth != 0 {
                return Err(EngineError::parse(text, "unbalanced parentheses"));
            }
            args.push(RawArg::Paren(text[start..i].trim().to_string()));
            i += 1;
        } else {
            let start = i;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            args.push(RawArg::Word(text[start..i].to_string()));
        }
    }

    Ok(args)
}
