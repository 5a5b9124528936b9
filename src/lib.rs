//! Tally – grammar-driven DSL execution for natural-language requests
//!
//! This crate implements:
//! - A generic engine that parses DSL text against a runtime-loaded grammar
//!   and hands a typed tree to a pluggable interpreter
//! - Interpreters for restaurant bills, bike rides and conference planning
//! - Role-gated, all-or-nothing mutation of persisted conference state
//! - A request pipeline from natural language, via a text generator, to a
//!   domain result

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Application configuration.
pub mod config;
/// Domain interpreters.
pub mod domains;
/// Generic grammar, parse and transform engine.
pub mod engine;
/// Natural-language request pipeline.
pub mod pipeline;
/// Conference state persistence.
pub mod store;

// Re-export key types for convenience
pub use config::AppConfig;
pub use domains::DomainResult;
pub use engine::{Domain, EngineError, GrammarSource, Interpreter, execute};
pub use pipeline::{Assistant, RequestOutcome, run_dsl};

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
