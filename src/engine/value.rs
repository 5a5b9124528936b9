use serde::{Deserialize, Serialize};
use std::fmt;

use super::tree::{ParseTree, Token};
use super::{EngineError, Result, unexpected};

/// Terminal rule name for bare identifiers.
pub const IDENT_RULE: &str = "ident";
/// Terminal rule name for numeric literals.
pub const NUMBER_RULE: &str = "number";
/// Terminal rule name for double-quoted string literals.
pub const STRING_RULE: &str = "string";

/// Typed leaf value produced by the base transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Bare identifier (also any other atomic terminal), verbatim.
    Ident(String),
    /// Numeric literal.
    Number(f64),
    /// String literal with quotes stripped and escapes resolved.
    Str(String),
}

impl Value {
    /// Convenience accessor for textual values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Ident(text) | Value::Str(text) => Some(text),
            Value::Number(_) => None,
        }
    }

    /// Convenience accessor for numeric values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(num) => Some(*num),
            _ => None,
        }
    }

    /// Short description of the value kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Ident(_) => "identifier",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Ident(text) | Value::Str(text) => write!(f, "{}", text),
            Value::Number(num) => write!(f, "{}", num),
        }
    }
}

/// Parse tree after leaf coercion. Interpreters only ever see this shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A production with typed children.
    Branch {
        /// Production name.
        rule: String,
        /// Child nodes in source order.
        children: Vec<Node>,
    },
    /// A coerced terminal.
    Leaf(Value),
}

impl Node {
    /// Production name, or the value kind for leaves.
    pub fn describe(&self) -> String {
        match self {
            Node::Branch { rule, .. } => rule.clone(),
            Node::Leaf(value) => value.kind().to_string(),
        }
    }

    /// Destructure a branch with the given rule name.
    pub fn into_branch(self, expected: &str) -> Result<Vec<Node>> {
        match self {
            Node::Branch { rule, children } if rule == expected => Ok(children),
            other => Err(unexpected(expected, other.describe())),
        }
    }

    /// Destructure a leaf.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Node::Leaf(value) => Ok(value),
            other => Err(unexpected("value", other.describe())),
        }
    }

    /// Destructure a leaf that must carry text (identifier or string).
    pub fn into_text(self) -> Result<String> {
        match self.into_value()? {
            Value::Ident(text) | Value::Str(text) => Ok(text),
            other => Err(unexpected("text", other.kind())),
        }
    }

    /// Destructure a leaf that must carry a number.
    pub fn into_number(self) -> Result<f64> {
        match self.into_value()? {
            Value::Number(num) => Ok(num),
            other => Err(unexpected("number", other.kind())),
        }
    }
}

/// Apply the base transform: coerce every token bottom-up.
pub fn transform(tree: ParseTree) -> Result<Node> {
    match tree {
        ParseTree::Node { rule, children } => {
            let children = children.into_iter().map(transform).collect::<Result<Vec<_>>>()?;
            Ok(Node::Branch { rule, children })
        }
        ParseTree::Token(token) => coerce(token).map(Node::Leaf),
    }
}

fn coerce(token: Token) -> Result<Value> {
    match token.rule.as_str() {
        NUMBER_RULE => token
            .text
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| EngineError::Grammar(format!("invalid number literal '{}' at byte {}", token.text, token.offset))),
        STRING_RULE => Ok(Value::Str(unquote(&token.text))),
        _ => Ok(Value::Ident(token.text)),
    }
}

/// Strip surrounding quotes and resolve escape sequences.
///
/// `\"` and `\\` are the escapes the grammars produce; `\n`, `\t` and `\r`
/// are resolved too. Unknown escapes are kept as written.
pub fn unquote(raw: &str) -> String {
    let inner = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(raw);

    let mut buf = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            buf.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => buf.push('"'),
            Some('\\') => buf.push('\\'),
            Some('n') => buf.push('\n'),
            Some('r') => buf.push('\r'),
            Some('t') => buf.push('\t'),
            Some(other) => {
                buf.push('\\');
                buf.push(other);
            }
            None => buf.push('\\'),
        }
    }
    buf
}
