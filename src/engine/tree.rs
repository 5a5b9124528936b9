use std::collections::BTreeSet;

use pest::iterators::{Pair, Pairs};
use serde::{Deserialize, Serialize};

/// A raw lexical token: the text a terminal rule matched, untyped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Terminal rule that produced the token.
    pub rule: String,
    /// Matched source text, verbatim.
    pub text: String,
    /// Byte offset of the token in the source.
    pub offset: usize,
}

/// Parse tree nodes. Internal nodes are named by the production that
/// produced them; leaves are raw tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParseTree {
    /// A production with its children in source order.
    Node {
        /// Production name.
        rule: String,
        /// Child trees.
        children: Vec<ParseTree>,
    },
    /// A terminal token.
    Token(Token),
}

impl ParseTree {
    /// Name of the production or terminal rule at this node.
    pub fn rule(&self) -> &str {
        match self {
            ParseTree::Node { rule, .. } => rule,
            ParseTree::Token(token) => &token.rule,
        }
    }

    /// Build a tree from the pairs the grammar VM produced. Atomic rules in
    /// `terminals` become tokens; the `EOI` marker is dropped.
    pub(crate) fn from_pairs(pairs: Pairs<'_, &str>, terminals: &BTreeSet<String>) -> Vec<ParseTree> {
        pairs
            .filter(|pair| pair.as_rule() != "EOI")
            .map(|pair| Self::from_pair(pair, terminals))
            .collect()
    }

    fn from_pair(pair: Pair<'_, &str>, terminals: &BTreeSet<String>) -> ParseTree {
        let rule = pair.as_rule().to_string();
        if terminals.contains(&rule) {
            return ParseTree::Token(Token {
                offset: pair.as_span().start(),
                text: pair.as_str().to_string(),
                rule,
            });
        }
        let children = Self::from_pairs(pair.into_inner(), terminals);
        ParseTree::Node { rule, children }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_reports_node_and_token_names() {
        let token = ParseTree::Token(Token {
            rule: "ident".into(),
            text: "burger".into(),
            offset: 7,
        });
        let node = ParseTree::Node {
            rule: "line_item_simple".into(),
            children: vec![token.clone()],
        };
        assert_eq!(token.rule(), "ident");
        assert_eq!(node.rule(), "line_item_simple");
    }
}
