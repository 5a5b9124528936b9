use super::grammar::{Domain, Grammar, GrammarSource, START_RULE};
use super::value::{Node, transform};
use super::Result;

/// A domain interpreter: consumes the typed tree of one DSL program and
/// produces the domain result.
///
/// Implementations are constructed by the caller so they can carry
/// request-scoped state (a role, a prior conference state). Each call to
/// [`Interpreter::interpret`] is one run; accumulated state from earlier
/// runs must not leak into it.
pub trait Interpreter {
    /// Domain result type.
    type Output;

    /// Interpret the domain's top-level node (the `start` rule already
    /// unwrapped).
    fn interpret(&mut self, root: Node) -> Result<Self::Output>;
}

/// Parse `source` with `grammar`, coerce its leaves, and run `interpreter`
/// over the domain's top-level node.
///
/// Interpreter errors are returned unchanged.
pub fn execute<I: Interpreter>(source: &str, grammar: &Grammar, interpreter: &mut I) -> Result<I::Output> {
    let tree = grammar.parse(source)?;
    tracing::debug!(grammar = grammar.name(), "parsed dsl source");

    let root = unwrap_start(transform(tree)?);
    tracing::debug!(root = %root.describe(), "interpreting");

    interpreter.interpret(root)
}

/// Resolve the grammar for `domain` from `source` and [`execute`].
pub fn execute_domain<I: Interpreter>(
    dsl: &str,
    domain: Domain,
    source: &GrammarSource,
    interpreter: &mut I,
) -> Result<I::Output> {
    let grammar = source.resolve(domain)?;
    execute(dsl, &grammar, interpreter)
}

/// The start rule wraps the domain's top-level production; hand the
/// interpreter that production rather than the wrapper.
fn unwrap_start(root: Node) -> Node {
    match root {
        Node::Branch { rule, mut children } if rule == START_RULE && children.len() == 1 => children.remove(0),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, Value};

    /// Counts the leaves under the top-level node.
    struct LeafCounter;

    impl Interpreter for LeafCounter {
        type Output = (String, usize);

        fn interpret(&mut self, root: Node) -> Result<Self::Output> {
            fn count(node: &Node) -> usize {
                match node {
                    Node::Leaf(_) => 1,
                    Node::Branch { children, .. } => children.iter().map(count).sum(),
                }
            }
            Ok((root.describe(), count(&root)))
        }
    }

    /// Fails on the first string leaf.
    struct RejectStrings;

    impl Interpreter for RejectStrings {
        type Output = ();

        fn interpret(&mut self, root: Node) -> Result<()> {
            for child in root.into_branch("ride")? {
                if let Node::Branch { children, .. } = child {
                    for line in children {
                        if let Node::Branch { children, .. } = line {
                            if let Some(Node::Leaf(Value::Str(text))) = children.get(1) {
                                return Err(EngineError::Validation(format!("no strings: {}", text)));
                            }
                        }
                    }
                }
            }
            Ok(())
        }
    }

    #[test]
    fn execute_unwraps_start_rule() {
        let grammar = GrammarSource::Bundled.resolve(Domain::Bill).unwrap();
        let (root, leaves) = execute("bill { burger: 2 * 5.0 soda: 2.5 }", &grammar, &mut LeafCounter).unwrap();
        assert_eq!(root, "bill");
        assert_eq!(leaves, 5);
    }

    #[test]
    fn interpreter_errors_pass_through_unchanged() {
        let err = execute_domain(
            "ride { terrain: \"gravel\" }",
            Domain::Ride,
            &GrammarSource::Bundled,
            &mut RejectStrings,
        )
        .unwrap_err();
        match err {
            EngineError::Validation(message) => assert_eq!(message, "no strings: gravel"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_stop_before_interpretation() {
        let grammar = GrammarSource::Bundled.resolve(Domain::Bill).unwrap();
        let err = execute("bill { burger: }", &grammar, &mut LeafCounter).unwrap_err();
        assert!(matches!(err, EngineError::Syntax { .. }));
    }
}
