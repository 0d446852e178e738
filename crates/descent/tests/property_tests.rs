//! Property tests for the matching and tree invariants.

use descent::char_class::CharSet;
use descent::expr::{ExpressionBuilder, Fixity, Operator};
use descent::input::Reader;
use descent::rule::{CharsRule, EofRule, ListRule, Literal, OptRule, Production, Sequence};
use descent::tree::Step;
use descent::trie::TrieBuilder;
use descent::{Session, TextSize, TokenKind};
use proptest::prelude::*;

const LITERALS: &[&str] = &["+", "+=", "++", "-", "->", "i", "if", "=="];

fn literal_trie() -> descent::trie::Trie<usize> {
    let mut builder = TrieBuilder::new();
    for (index, literal) in LITERALS.iter().enumerate() {
        builder.insert(literal, index);
    }
    builder.build()
}

/// Reference implementation: the longest literal that prefixes the input.
fn brute_force_match(input: &str) -> Option<(usize, usize)> {
    LITERALS
        .iter()
        .enumerate()
        .filter(|(_, literal)| input.starts_with(*literal))
        .max_by_key(|(_, literal)| literal.len())
        .map(|(index, literal)| (index, literal.len()))
}

fn list_session() -> Session {
    let digits = || Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS));
    let list = Production::new(
        "list",
        Box::new(Sequence::new(vec![
            Box::new(Literal::new("[")),
            Box::new(OptRule::new(Box::new(ListRule::new(
                digits(),
                Box::new(Literal::new(",")),
            )))),
            Box::new(Literal::new("]")),
        ])),
    );
    let entry = Sequence::new(vec![Box::new(list), Box::new(EofRule::new())]);
    Session::new("file", Box::new(entry)).with_whitespace(Box::new(CharsRule::new(
        CharSet::ascii_whitespace(),
        TokenKind::WHITESPACE,
    )))
}

proptest! {
    #[test]
    fn prop_trie_matches_longest_literal(
        input in proptest::collection::vec(
            prop::sample::select(vec!['+', '=', '-', '>', 'i', 'f', 'x']),
            0..8,
        )
    ) {
        let input: String = input.into_iter().collect();
        let trie = literal_trie();
        let mut reader = Reader::new(&input);
        let matched = trie.try_match(&mut reader);

        match brute_force_match(&input) {
            Some((index, len)) => {
                prop_assert_eq!(matched, Some(index));
                prop_assert_eq!(reader.position(), TextSize::from(len as u32));
            }
            None => {
                prop_assert_eq!(matched, None);
                prop_assert_eq!(reader.position(), TextSize::zero());
            }
        }
    }

    #[test]
    fn prop_list_trees_are_lossless(
        values in proptest::collection::vec(1u32..10_000, 1..8),
        pad in proptest::collection::vec(any::<bool>(), 8),
    ) {
        let mut input = String::from("[");
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                input.push(',');
                if pad[i % pad.len()] {
                    input.push(' ');
                }
            }
            input.push_str(&value.to_string());
        }
        input.push(']');

        let session = list_session();
        let outcome = session.parse(&input).unwrap();
        prop_assert!(outcome.matched);
        prop_assert!(outcome.errors.is_empty());

        let mut end = TextSize::zero();
        for step in outcome.tree.traverse() {
            if let Step::Token(id) = step {
                let range = outcome.tree.range(id);
                prop_assert_eq!(range.start(), end);
                end = range.end();
            }
        }
        prop_assert_eq!(end, TextSize::of(&input));
    }

    #[test]
    fn prop_expression_operation_count(
        operands in proptest::collection::vec(1u32..100, 1..8),
    ) {
        let atom = Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS));
        let expr = ExpressionBuilder::new(atom)
            .level(Fixity::InfixLeft, vec![Operator::new("add", "+")])
            .build();
        let session = Session::new("file", Box::new(expr));

        let input = operands
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("+");
        let outcome = session.parse(&input).unwrap();
        prop_assert!(outcome.matched);

        let adds = outcome
            .tree
            .traverse()
            .filter(|step| matches!(step, Step::Enter(id) if outcome.tree.name(*id) == Some("add")))
            .count();
        prop_assert_eq!(adds, operands.len() - 1);
    }
}
