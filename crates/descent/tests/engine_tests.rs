//! End-to-end grammar tests through the session layer.

use descent::char_class::CharSet;
use descent::rule::{
    CharsRule, Choice, EofRule, Identifier, Keyword, ListRule, Literal, OptRule, Production,
    Recurse, Rule, Sequence,
};
use descent::tree::{ParseTree, Step};
use descent::{ParseErrorKind, Session, TextSize, TokenKind, ValidationStatus};
use std::rc::Rc;

fn digits() -> Box<CharsRule> {
    Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS))
}

fn whitespace() -> Box<CharsRule> {
    Box::new(CharsRule::new(
        CharSet::ascii_whitespace(),
        TokenKind::WHITESPACE,
    ))
}

/// list := '[' (digits (',' digits)*)? ']'
fn list_session() -> Session {
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
    Session::new("file", Box::new(entry)).with_whitespace(whitespace())
}

/// Every byte of the consumed input must be covered by exactly one token,
/// in order and without gaps.
fn assert_lossless(tree: &ParseTree, consumed: TextSize) {
    let mut end = TextSize::zero();
    for step in tree.traverse() {
        if let Step::Token(id) = step {
            let range = tree.range(id);
            assert_eq!(range.start(), end, "gap or overlap before {range}");
            end = range.end();
        }
    }
    assert_eq!(end, consumed);
}

#[test]
fn test_list_parses_and_is_lossless() {
    let session = list_session();
    let input = "[1, 22 ,3]";
    let outcome = session.parse(input).unwrap();
    assert!(outcome.matched, "{:?}", outcome.errors);
    assert!(outcome.errors.is_empty());
    assert_lossless(&outcome.tree, outcome.end);
    assert_eq!(outcome.end, TextSize::of(input));

    let rendered = outcome.tree.render(input);
    assert!(rendered.contains("list@0..10"));
    assert!(rendered.contains("digits \"22\"@4..6"));
    assert!(rendered.contains("whitespace \" \"@6..7"));
}

#[test]
fn test_empty_list() {
    let session = list_session();
    let outcome = session.parse("[]").unwrap();
    assert!(outcome.matched);
    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.tree.render("[]").matches("literal").count(), 2);
}

#[test]
fn test_trailing_separator_is_one_recoverable_error() {
    let session = list_session();
    let outcome = session.parse("[1,]").unwrap();
    assert!(outcome.matched);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].kind, ParseErrorKind::TrailingSeparator);
    assert_lossless(&outcome.tree, outcome.end);
}

#[test]
fn test_validate_does_not_build_tree_but_reports() {
    let session = list_session();
    assert!(session.validate("[7]").is_success());
    assert_eq!(
        session.validate("[1,]").status,
        ValidationStatus::Recovered(1)
    );
    assert!(matches!(
        session.validate("(1)").status,
        ValidationStatus::Failed { fatal: false }
    ));
}

#[test]
fn test_leading_and_trailing_whitespace() {
    let session = list_session();
    let outcome = session.parse("  [1]  ").unwrap();
    assert!(outcome.matched);
    assert_lossless(&outcome.tree, outcome.end);
    assert_eq!(outcome.end, TextSize::of("  [1]  "));
}

#[test]
fn test_keyword_identifier_grammar() {
    // decl := 'let' identifier
    let decl = Production::new(
        "decl",
        Box::new(Sequence::new(vec![
            Box::new(Keyword::new("let")),
            Box::new(Identifier::new().reserve(&["let", "fn"])),
        ])),
    );
    let session = Session::new("file", Box::new(decl)).with_whitespace(whitespace());

    let outcome = session.parse("let foo").unwrap();
    assert!(outcome.matched);
    assert!(outcome.errors.is_empty());

    // "letfoo" must not lex as the keyword.
    assert!(!session.validate("letfoo").is_success());

    // A reserved word where an identifier is expected is one recoverable error.
    let outcome = session.parse("let fn").unwrap();
    assert!(outcome.matched);
    assert_eq!(
        outcome.errors[0].kind,
        ParseErrorKind::ReservedIdentifier("fn".into())
    );
}

#[test]
fn test_transparent_production_splices_children() {
    // pair is transparent: its tokens become direct children of entry.
    let pair = Production::transparent(
        "pair",
        Box::new(Sequence::new(vec![
            Box::new(Literal::new("a")),
            Box::new(Literal::new("b")),
        ])),
    );
    let entry = Production::new("entry", Box::new(pair));
    let session = Session::new("file", Box::new(entry));

    let outcome = session.parse("ab").unwrap();
    assert!(outcome.matched);
    let rendered = outcome.tree.render("ab");
    assert!(!rendered.contains("pair"));

    let root = outcome.tree.root();
    let entry = outcome.tree.children(root).next().unwrap();
    assert_eq!(outcome.tree.name(entry), Some("entry"));
    assert_eq!(outcome.tree.child_count(entry), 2);
    assert_lossless(&outcome.tree, outcome.end);
}

#[test]
fn test_choice_orders_alternatives() {
    // value := list | digits
    let value = Choice::new(vec![
        Box::new(Sequence::new(vec![
            Box::new(Literal::new("[")),
            Box::new(OptRule::new(Box::new(ListRule::new(
                digits(),
                Box::new(Literal::new(",")),
            )))),
            Box::new(Literal::new("]")),
        ])),
        digits(),
    ]);
    let session = Session::new("file", Box::new(value));
    assert!(session.validate("[1,2]").is_success());
    assert!(session.validate("42").is_success());
    assert!(!session.validate("x").is_success());
}

#[test]
fn test_deep_recursion_hits_limit() {
    // paren := '(' paren ')' | digits, guarded per production entry.
    let handle = Recurse::new();
    let paren: Rc<dyn Rule> = Rc::new(Production::new(
        "paren",
        Box::new(Choice::new(vec![
            Box::new(Sequence::new(vec![
                Box::new(Literal::new("(")),
                Box::new(handle.clone()),
                Box::new(Literal::new(")")),
            ])),
            digits(),
        ])),
    ));
    handle.define(paren);

    let session = Session::new("file", Box::new(handle)).with_max_depth(16);

    let shallow = format!("{}1{}", "(".repeat(8), ")".repeat(8));
    assert!(session.validate(&shallow).is_success());

    let deep = format!("{}1{}", "(".repeat(64), ")".repeat(64));
    let validation = session.validate(&deep);
    assert_eq!(validation.status, ValidationStatus::Failed { fatal: true });
    assert!(validation
        .errors
        .iter()
        .any(|e| e.kind == ParseErrorKind::RecursionLimitExceeded));
}

#[test]
fn test_stats_count_tokens_and_errors() {
    let session = list_session();
    let outcome = session.parse("[1, 2]").unwrap();
    // '[' '1' ',' ' ' '2' ']' -> six committed tokens including whitespace.
    assert_eq!(outcome.stats.tokens, 6);
    assert_eq!(outcome.stats.errors, 0);
    assert!(outcome.stats.max_depth >= 1);
}
