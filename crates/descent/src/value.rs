//! Computing values from parse trees.
//!
//! An [`Evaluator`] carries the combining functions of a grammar: one
//! callback turning tokens into leaf values, and one reducer per named
//! production, invoked with the values its children produced in order.
//! Evaluation walks a finished [`ParseTree`] depth-first, so the tree stays
//! lossless and reusable while values are computed as often as needed.
//!
//! Tokens that carry no value (operators, delimiters, trivia) return `None`
//! from the token callback and simply do not appear in any reducer's
//! argument list. A production without a registered reducer passes its
//! children's values through to the parent unchanged, which is what
//! structural wrappers like the session's root production want.
//!
//! Reducer signatures are ordinary `Fn` bounds, so the value type they
//! accept and return is checked when the evaluator is built. The child
//! *count* depends on what actually parsed; a reducer registered with
//! [`Evaluator::rule`] declares the count it expects and a node violating it
//! reports a positioned [`ParseErrorKind::ValueArityMismatch`].

use crate::error::{ParseError, ParseErrorKind};
use crate::kind::TokenKind;
use crate::text::TextRange;
use crate::tree::{NodeId, ParseTree, Step};
use hashbrown::HashMap;
use std::fmt;

type TokenFn<V> = Box<dyn Fn(TokenKind, &str) -> Option<V>>;
type ReduceFn<V> = Box<dyn Fn(Vec<V>) -> V>;

struct Reducer<V> {
    arity: Option<usize>,
    reduce: ReduceFn<V>,
}

/// The combining functions of a grammar, applied over a [`ParseTree`].
pub struct Evaluator<V> {
    token: TokenFn<V>,
    rules: HashMap<&'static str, Reducer<V>>,
}

impl<V> Evaluator<V> {
    /// Create an evaluator from the token callback. Returning `None` marks
    /// a token as carrying no value.
    #[must_use]
    pub fn new(token: impl Fn(TokenKind, &str) -> Option<V> + 'static) -> Self {
        Self {
            token: Box::new(token),
            rules: HashMap::new(),
        }
    }

    /// Register the combining function for production `name`, expecting
    /// exactly `arity` child values.
    #[must_use]
    pub fn rule(
        mut self,
        name: &'static str,
        arity: usize,
        reduce: impl Fn(Vec<V>) -> V + 'static,
    ) -> Self {
        self.rules.insert(
            name,
            Reducer {
                arity: Some(arity),
                reduce: Box::new(reduce),
            },
        );
        self
    }

    /// Register a combining function accepting any number of child values,
    /// for list-like productions.
    #[must_use]
    pub fn rule_variadic(
        mut self,
        name: &'static str,
        reduce: impl Fn(Vec<V>) -> V + 'static,
    ) -> Self {
        self.rules.insert(
            name,
            Reducer {
                arity: None,
                reduce: Box::new(reduce),
            },
        );
        self
    }

    /// Evaluate `tree` against the input it was parsed from.
    ///
    /// Fails when a reducer's declared arity does not match a node's child
    /// values, or when the run does not end with exactly one value (e.g. an
    /// unregistered root whose children produced several).
    pub fn run(&self, tree: &ParseTree, input: &str) -> Result<V, ParseError> {
        let mut values: Vec<V> = Vec::new();
        let mut marks: Vec<usize> = Vec::new();
        for step in tree.traverse() {
            match step {
                Step::Enter(_) => marks.push(values.len()),
                Step::Token(id) => {
                    let range = tree.range(id);
                    let kind = tree.kind(id).unwrap_or(TokenKind::ERROR);
                    let text =
                        &input[range.start().into() as usize..range.end().into() as usize];
                    if let Some(value) = (self.token)(kind, text) {
                        values.push(value);
                    }
                }
                Step::Exit(id) => {
                    let mark = marks.pop().unwrap_or(0);
                    if let Some(value) = self.reduce(tree, id, &mut values, mark)? {
                        values.push(value);
                    }
                }
            }
        }
        match values.pop() {
            Some(value) if values.is_empty() => Ok(value),
            _ => Err(ParseError::new(
                TextRange::empty(tree.range(tree.root()).end()),
                ParseErrorKind::InvalidSyntax(
                    "evaluation did not produce exactly one value".into(),
                ),
            )),
        }
    }

    /// Apply the reducer for `id`, if one is registered, to the values
    /// accumulated since `mark`. Unregistered productions leave their
    /// children's values in place for the parent.
    fn reduce(
        &self,
        tree: &ParseTree,
        id: NodeId,
        values: &mut Vec<V>,
        mark: usize,
    ) -> Result<Option<V>, ParseError> {
        let name = tree.name(id).unwrap_or("?");
        let Some(reducer) = self.rules.get(name) else {
            return Ok(None);
        };
        let children: Vec<V> = values.split_off(mark);
        if let Some(arity) = reducer.arity {
            if arity != children.len() {
                return Err(ParseError::new(
                    tree.range(id),
                    ParseErrorKind::ValueArityMismatch {
                        expected: arity,
                        found: children.len(),
                    },
                ));
            }
        }
        Ok(Some((reducer.reduce)(children)))
    }
}

impl<V> fmt::Debug for Evaluator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.rules.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("Evaluator").field("rules", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Session;
    use crate::char_class::CharSet;
    use crate::expr::{ExpressionBuilder, Fixity, Operator};
    use crate::rule::CharsRule;

    fn arith_session() -> Session {
        let atom = Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS));
        let expr = ExpressionBuilder::new(atom)
            .level(Fixity::InfixLeft, vec![Operator::new("add", "+")])
            .level(Fixity::InfixLeft, vec![Operator::new("mul", "*")])
            .build();
        Session::new("file", Box::new(expr))
    }

    fn arith_evaluator() -> Evaluator<i64> {
        Evaluator::new(|kind, text| {
            (kind == TokenKind::DIGITS).then(|| text.parse().unwrap_or(0))
        })
        .rule("add", 2, |values| values[0] + values[1])
        .rule("mul", 2, |values| values[0] * values[1])
    }

    #[test]
    fn test_children_combine_in_order() {
        let session = arith_session();
        let evaluator = arith_evaluator();

        for (input, expected) in [("1+2*3", 7), ("2*3+4", 10), ("5", 5)] {
            let outcome = session.parse(input).unwrap();
            assert!(outcome.matched);
            assert_eq!(evaluator.run(&outcome.tree, input).unwrap(), expected);
        }
    }

    #[test]
    fn test_unregistered_production_passes_through() {
        // The root "file" production has no reducer; the single value its
        // child produced is the result.
        let session = arith_session();
        let outcome = session.parse("6*7").unwrap();
        assert_eq!(
            arith_evaluator().run(&outcome.tree, "6*7").unwrap(),
            42
        );
    }

    #[test]
    fn test_arity_mismatch_is_positioned_error() {
        let session = arith_session();
        let outcome = session.parse("1+2").unwrap();
        let evaluator: Evaluator<i64> = Evaluator::new(|kind, text| {
            (kind == TokenKind::DIGITS).then(|| text.parse().unwrap_or(0))
        })
        .rule("add", 3, |values| values.iter().sum());

        let err = evaluator.run(&outcome.tree, "1+2").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorKind::ValueArityMismatch {
                expected: 3,
                found: 2
            }
        );
        assert_eq!(err.span(), outcome.tree.range(outcome.tree.root()));
    }

    #[test]
    fn test_variadic_reducer_takes_all_children() {
        let atom = Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS));
        let expr = ExpressionBuilder::new(atom)
            .level(Fixity::InfixList, vec![Operator::new("tuple", ",")])
            .build();
        let session = Session::new("file", Box::new(expr));
        let evaluator: Evaluator<i64> = Evaluator::new(|kind, text| {
            (kind == TokenKind::DIGITS).then(|| text.parse().unwrap_or(0))
        })
        .rule_variadic("tuple", |values| values.iter().sum());

        let outcome = session.parse("1,2,3,4").unwrap();
        assert_eq!(evaluator.run(&outcome.tree, "1,2,3,4").unwrap(), 10);
    }
}
