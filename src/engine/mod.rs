//! Generic parse-and-transform engine.
//!
//! DSL text is parsed against a runtime-loaded grammar into a [`ParseTree`],
//! its leaf tokens are coerced into typed [`Value`]s, and the resulting
//! [`Node`] tree is handed to a domain [`Interpreter`]. Nothing in this
//! module knows about bills, rides or conferences.

/// Runtime-loaded grammars and the bundled per-domain grammar texts.
pub mod grammar;
/// Execution driver tying grammar, parser and interpreter together.
pub mod driver;
/// Raw parse trees produced by the grammar VM.
pub mod tree;
/// Leaf coercions and the typed node tree.
pub mod value;

pub use driver::{Interpreter, execute, execute_domain};
pub use grammar::{Domain, Grammar, GrammarSource, START_RULE};
pub use tree::{ParseTree, Token};
pub use value::{Node, Value, transform};

use thiserror::Error;

/// Convenience result alias for engine and interpreter operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced while loading grammars, parsing, or interpreting DSL text.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The grammar resource is missing or malformed.
    #[error("grammar error: {0}")]
    Grammar(String),

    /// The DSL text does not conform to the grammar.
    #[error("syntax error at line {line}, column {column}: {message}\n  | {snippet}")]
    Syntax {
        /// 1-based line of the offending position
        line: usize,
        /// 1-based column of the offending position
        column: usize,
        /// What the parser expected
        message: String,
        /// Source line containing the offending position
        snippet: String,
    },

    /// A business rule was violated.
    #[error("Validation Error: {0}")]
    Validation(String),

    /// The active role may not perform the attempted operation.
    #[error("Role Error: role '{role}' may not {operation}; requires {required}")]
    RoleMismatch {
        /// Role the request runs under
        role: String,
        /// Operation that was attempted
        operation: String,
        /// Human-readable list of roles that are allowed
        required: String,
    },

    /// The tree does not have the shape the interpreter expects. This
    /// normally means the wrong grammar was paired with an interpreter.
    #[error("unexpected node: expected {expected}, found {found}")]
    UnexpectedNode {
        /// Production or value kind the interpreter wanted
        expected: String,
        /// What was actually there
        found: String,
    },
}

impl EngineError {
    /// Whether the caller may retry with corrected input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::Syntax { .. } | EngineError::Validation(_) | EngineError::RoleMismatch { .. }
        )
    }
}

pub(crate) fn validation(message: impl Into<String>) -> EngineError {
    EngineError::Validation(message.into())
}

pub(crate) fn unexpected(expected: impl Into<String>, found: impl Into<String>) -> EngineError {
    EngineError::UnexpectedNode {
        expected: expected.into(),
        found: found.into(),
    }
}
