//! # Descent
//!
//! A rule-combinator parsing engine with lossless syntax trees.
//!
//! ## Overview
//!
//! Descent parses text directly from grammar values, with no separate
//! grammar compilation step:
//!
//! - **Continuation-passing rules**: a grammar is a tree of [`rule::Rule`]
//!   values; each rule parses its part and hands control to a continuation,
//!   so committed input is never re-scanned
//! - **Speculative branches**: alternation tests branch conditions with a
//!   try/cancel/finish protocol and commits the first acceptance
//! - **Trie literals**: literals, keywords and symbol tables share one
//!   longest-match automaton ([`trie::Trie`])
//! - **Operator expressions**: precedence climbing with declarative levels
//!   ([`expr::ExpressionBuilder`])
//! - **Lossless trees**: every consumed byte, whitespace and erroneous input
//!   included, appears in the finished [`tree::ParseTree`]
//! - **Error recovery**: recoverable errors resynchronize and keep parsing;
//!   capacity errors abort deterministically
//! - **Value callbacks**: per-production combining functions turn a
//!   finished tree into user values ([`value::Evaluator`])
//!
//! ## Quick Start
//!
//! A bracketed list of digit runs, parsed into a tree:
//!
//! ```rust,no_run
//! use descent::char_class::CharSet;
//! use descent::rule::{CharsRule, ListRule, Literal, OptRule, Production, Sequence};
//! use descent::{Session, TokenKind};
//!
//! // list := '[' (digits (',' digits)*)? ']'
//! let digits = || Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS));
//! let list = Production::new(
//!     "list",
//!     Box::new(Sequence::new(vec![
//!         Box::new(Literal::new("[")),
//!         Box::new(OptRule::new(Box::new(ListRule::new(
//!             digits(),
//!             Box::new(Literal::new(",")),
//!         )))),
//!         Box::new(Literal::new("]")),
//!     ])),
//! );
//!
//! let session = Session::new("file", Box::new(list)).with_whitespace(Box::new(
//!     CharsRule::new(CharSet::ascii_whitespace(), TokenKind::WHITESPACE),
//! ));
//!
//! let outcome = session.parse("[1, 22, 3]").expect("well-formed event stream");
//! assert!(outcome.matched);
//! println!("{}", outcome.tree.render("[1, 22, 3]"));
//! ```
//!
//! ## Feature flags
//!
//! - `serialize`: serde support for positions, kinds and trees
//! - `diagnostics`: miette integration for rendering errors

pub mod action;
pub mod char_class;
pub mod context;
pub mod error;
pub mod expr;
pub mod handler;
pub mod input;
pub mod kind;
pub mod rule;
pub mod text;
pub mod tree;
pub mod trie;
pub mod value;

pub use action::{ParseOutcome, Session, Validation, ValidationStatus};
pub use error::{ParseError, ParseErrorKind};
pub use kind::TokenKind;
pub use text::{TextRange, TextSize};
pub use value::Evaluator;
