use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pest::error::{ErrorVariant, LineColLocation};
use pest::iterators::Pairs;
use pest_meta::ast::RuleType;
use pest_vm::Vm;
use serde::{Deserialize, Serialize};

use super::tree::ParseTree;
use super::{EngineError, Result};

/// Every grammar must define this rule; parsing always starts here.
pub const START_RULE: &str = "start";

const BILL_GRAMMAR: &str = include_str!("../../grammars/bill.pest");
const RIDE_GRAMMAR: &str = include_str!("../../grammars/ride.pest");
const EVENT_GRAMMAR: &str = include_str!("../../grammars/event.pest");

/// The DSL domains this crate knows how to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Restaurant bills.
    Bill,
    /// Bike ride planning.
    Ride,
    /// Conference venue and session planning.
    Event,
}

impl Domain {
    /// All domains, in a stable order.
    pub const ALL: [Domain; 3] = [Domain::Bill, Domain::Ride, Domain::Event];

    /// Lowercase domain name, also the grammar file stem.
    pub fn name(&self) -> &'static str {
        match self {
            Domain::Bill => "bill",
            Domain::Ride => "ride",
            Domain::Event => "event",
        }
    }

    /// Grammar file name inside a grammar directory.
    pub fn grammar_file(&self) -> String {
        format!("{}.pest", self.name())
    }

    /// Grammar text compiled into the crate.
    pub fn bundled_grammar(&self) -> &'static str {
        match self {
            Domain::Bill => BILL_GRAMMAR,
            Domain::Ride => RIDE_GRAMMAR,
            Domain::Event => EVENT_GRAMMAR,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Domain {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bill" | "tax" => Ok(Domain::Bill),
            "ride" | "cycling" => Ok(Domain::Ride),
            "event" | "conference" => Ok(Domain::Event),
            other => Err(format!("unknown domain '{}': expected bill, ride or event", other)),
        }
    }
}

/// Where domain grammars are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GrammarSource {
    /// The grammar texts compiled into the crate.
    #[default]
    Bundled,
    /// `<dir>/<domain>.pest` on disk.
    Directory(PathBuf),
}

impl GrammarSource {
    /// Load and compile the grammar for `domain`.
    pub fn resolve(&self, domain: Domain) -> Result<Grammar> {
        match self {
            GrammarSource::Bundled => Grammar::from_text(domain.name(), domain.bundled_grammar()),
            GrammarSource::Directory(dir) => Grammar::load(dir.join(domain.grammar_file())),
        }
    }
}

/// A compiled grammar, ready to parse DSL text.
pub struct Grammar {
    name: String,
    vm: Vm,
    terminals: BTreeSet<String>,
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("name", &self.name)
            .field("terminals", &self.terminals)
            .finish_non_exhaustive()
    }
}

impl Grammar {
    /// Compile grammar text. Fails if the text is not a valid grammar or
    /// lacks a `start` rule.
    pub fn from_text(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let (_, rules) = pest_meta::parse_and_optimize(text).map_err(|errors| {
            let detail = errors
                .iter()
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("\n");
            EngineError::Grammar(format!("grammar '{}' is malformed:\n{}", name, detail))
        })?;

        if !rules.iter().any(|rule| rule.name == START_RULE) {
            return Err(EngineError::Grammar(format!(
                "grammar '{}' has no '{}' rule",
                name, START_RULE
            )));
        }

        let terminals = rules
            .iter()
            .filter(|rule| rule.ty == RuleType::Atomic)
            .map(|rule| rule.name.clone())
            .collect();

        tracing::debug!(grammar = %name, rules = rules.len(), "compiled grammar");

        Ok(Self {
            name,
            vm: Vm::new(rules),
            terminals,
        })
    }

    /// Read and compile a grammar file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            EngineError::Grammar(format!("cannot read grammar {}: {}", path.display(), err))
        })?;
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_text(name, &text)
    }

    /// Grammar name (domain or file stem).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the atomic rules whose matches become tokens.
    pub fn terminals(&self) -> &BTreeSet<String> {
        &self.terminals
    }

    /// Parse `source` from the `start` rule into a raw parse tree.
    pub fn parse(&self, source: &str) -> Result<ParseTree> {
        let pairs: Pairs<'_, &str> = self.vm.parse(START_RULE, source).map_err(|err| {
            let (line, column) = match err.line_col {
                LineColLocation::Pos(pos) => pos,
                LineColLocation::Span(start, _) => start,
            };
            let message = match &err.variant {
                ErrorVariant::ParsingError {
                    positives,
                    negatives,
                } => describe_expectation(positives, negatives),
                ErrorVariant::CustomError { message } => message.clone(),
            };
            EngineError::Syntax {
                line,
                column,
                message,
                snippet: err.line().to_string(),
            }
        })?;

        let mut roots = ParseTree::from_pairs(pairs, &self.terminals);
        match roots.len() {
            1 => Ok(roots.remove(0)),
            _ => Ok(ParseTree::Node {
                rule: START_RULE.to_string(),
                children: roots,
            }),
        }
    }
}

fn describe_expectation(positives: &[&str], negatives: &[&str]) -> String {
    match (positives.is_empty(), negatives.is_empty()) {
        (false, true) => format!("expected {}", positives.join(" or ")),
        (true, false) => format!("unexpected {}", negatives.join(" or ")),
        (false, false) => format!(
            "expected {}, found {}",
            positives.join(" or "),
            negatives.join(" or ")
        ),
        (true, true) => "unexpected input".to_string(),
    }
}
