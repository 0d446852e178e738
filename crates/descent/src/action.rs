//! Top-level parse actions.
//!
//! A [`Session`] owns an entry rule and its ambient configuration (automatic
//! whitespace, depth limit) and exposes the three ways to run it: *validate*
//! (errors only, no tree), *parse* (lossless tree plus errors) and *trace*
//! (textual event log). Each run creates a fresh context, so one session can
//! be reused across inputs and threads-of-control freely.

use crate::context::{Context, ParseStats, DEFAULT_MAX_DEPTH};
use crate::error::ParseError;
use crate::handler::{Handler, TraceSink, ValidateSink};
use crate::input::Reader;
use crate::rule::{Done, Rule, TokenRule};
use crate::text::TextSize;
use crate::tree::{ParseTree, TreeSink};
use std::any::Any;

/// A reusable entry point for one grammar.
#[derive(Debug)]
pub struct Session {
    name: &'static str,
    entry: Box<dyn Rule>,
    whitespace: Option<Box<dyn TokenRule>>,
    max_depth: u32,
}

impl Session {
    /// `name` labels the tree root and trace output.
    #[must_use]
    pub fn new(name: &'static str, entry: Box<dyn Rule>) -> Self {
        Self {
            name,
            entry,
            whitespace: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Skip tokens matched by `rule` before the parse and after every
    /// committed token. Skipped runs are still recorded in the tree.
    #[must_use]
    pub fn with_whitespace(mut self, rule: Box<dyn TokenRule>) -> Self {
        self.whitespace = Some(rule);
        self
    }

    /// Bound production recursion and expression nesting.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn run(
        &self,
        input: &str,
        handler: &mut dyn Handler,
        state: Option<&dyn Any>,
    ) -> RunOutcome {
        let mut reader = Reader::new(input);
        let mut ctx = Context::new(handler);
        ctx.set_max_depth(self.max_depth);
        if let Some(ws) = &self.whitespace {
            ctx.set_whitespace(ws.as_ref());
        }
        if let Some(state) = state {
            ctx.set_side_state(state);
        }
        ctx.skip_whitespace(&mut reader);
        let matched = self.entry.parse(&mut ctx, &mut reader, &Done);
        RunOutcome {
            matched,
            fatal: ctx.is_fatal(),
            stats: ctx.stats(),
            end: reader.position(),
        }
    }

    /// Check the input against the grammar without building a tree.
    #[must_use]
    pub fn validate(&self, input: &str) -> Validation {
        self.validate_inner(input, None)
    }

    /// [`Session::validate`] with a read-only side state the grammar's
    /// rules can inspect through the context.
    #[must_use]
    pub fn validate_with_state(&self, input: &str, state: &dyn Any) -> Validation {
        self.validate_inner(input, Some(state))
    }

    fn validate_inner(&self, input: &str, state: Option<&dyn Any>) -> Validation {
        let mut sink = ValidateSink::new();
        let outcome = self.run(input, &mut sink, state);
        let errors = sink.into_errors();
        let status = if !outcome.matched {
            ValidationStatus::Failed {
                fatal: outcome.fatal,
            }
        } else if errors.is_empty() {
            ValidationStatus::Success
        } else {
            ValidationStatus::Recovered(errors.len())
        };
        Validation {
            status,
            errors,
            stats: outcome.stats,
            end: outcome.end,
        }
    }

    /// Parse the input into a lossless tree.
    ///
    /// Returns `Ok` whenever the event stream was well formed, even if the
    /// grammar reported errors; the outcome says whether the entry rule
    /// matched and carries everything that was reported.
    pub fn parse(&self, input: &str) -> Result<ParseOutcome, ParseError> {
        self.parse_inner(input, None)
    }

    /// [`Session::parse`] with a read-only side state.
    pub fn parse_with_state(
        &self,
        input: &str,
        state: &dyn Any,
    ) -> Result<ParseOutcome, ParseError> {
        self.parse_inner(input, Some(state))
    }

    fn parse_inner(
        &self,
        input: &str,
        state: Option<&dyn Any>,
    ) -> Result<ParseOutcome, ParseError> {
        let mut sink = TreeSink::new(self.name);
        let outcome = self.run(input, &mut sink, state);
        let (tree, errors, recovered) = sink.finish(outcome.end);
        Ok(ParseOutcome {
            tree: tree?,
            errors,
            recovered,
            stats: outcome.stats,
            matched: outcome.matched,
            end: outcome.end,
        })
    }

    /// Run the parse and return the indented event log.
    #[must_use]
    pub fn trace(&self, input: &str) -> String {
        let mut sink = TraceSink::new();
        self.run(input, &mut sink, None);
        sink.finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct RunOutcome {
    matched: bool,
    fatal: bool,
    stats: ParseStats,
    end: TextSize,
}

/// Result classification of a validating run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStatus {
    /// The entry rule matched with no errors.
    Success,
    /// The entry rule matched after recovering from this many errors.
    Recovered(usize),
    /// The entry rule did not match.
    Failed {
        /// Whether a capacity limit aborted the parse.
        fatal: bool,
    },
}

/// Everything a validating run reports.
#[derive(Debug)]
pub struct Validation {
    pub status: ValidationStatus,
    pub errors: Vec<ParseError>,
    pub stats: ParseStats,
    /// Position the parse stopped at.
    pub end: TextSize,
}

impl Validation {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ValidationStatus::Success
    }
}

/// Everything a tree-building run reports.
#[derive(Debug)]
pub struct ParseOutcome {
    /// The lossless tree over the consumed input. Present even when the
    /// grammar reported errors.
    pub tree: ParseTree,
    pub errors: Vec<ParseError>,
    /// Regions error recovery successfully resynchronized.
    pub recovered: usize,
    pub stats: ParseStats,
    /// Whether the entry rule matched.
    pub matched: bool,
    /// Position the parse stopped at.
    pub end: TextSize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::char_class::CharSet;
    use crate::error::ParseErrorKind;
    use crate::kind::TokenKind;
    use crate::rule::{CharsRule, EofRule, Literal, Production, Sequence};

    fn number_session() -> Session {
        let entry = Sequence::new(vec![
            Box::new(Production::new(
                "number",
                Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS)),
            )),
            Box::new(EofRule::new()),
        ]);
        Session::new("file", Box::new(entry)).with_whitespace(Box::new(CharsRule::new(
            CharSet::ascii_whitespace(),
            TokenKind::WHITESPACE,
        )))
    }

    #[test]
    fn test_validate_success() {
        let session = number_session();
        let validation = session.validate("  42  ");
        assert!(validation.is_success());
        assert_eq!(validation.end, TextSize::from(6));
        assert_eq!(validation.stats.errors, 0);
    }

    #[test]
    fn test_validate_failure() {
        let session = number_session();
        let validation = session.validate("abc");
        assert_eq!(
            validation.status,
            ValidationStatus::Failed { fatal: false }
        );
        assert_eq!(validation.errors.len(), 1);
    }

    #[test]
    fn test_parse_builds_lossless_tree() {
        let session = number_session();
        let outcome = session.parse(" 42 ").unwrap();
        assert!(outcome.matched);
        assert!(outcome.errors.is_empty());
        assert_eq!(
            outcome.tree.render(" 42 "),
            "file@0..4\n  whitespace \" \"@0..1\n  number@1..3\n    digits \"42\"@1..3\n  \
             whitespace \" \"@3..4\n"
        );
    }

    #[test]
    fn test_trace_mentions_production() {
        let session = number_session();
        let log = session.trace("42");
        assert!(log.contains("number: start @0"));
        assert!(log.contains("number: finish @2"));
    }

    #[test]
    fn test_reuse_across_inputs() {
        let session = number_session();
        assert!(session.validate("1").is_success());
        assert!(!session.validate("x").is_success());
        assert!(session.validate("2").is_success());
    }

    #[test]
    fn test_session_side_state() {
        use crate::context::Context;
        use crate::input::Reader;
        use crate::rule::{Continuation, Rule};

        // A rule that fails unless the side state holds the expected value.
        #[derive(Debug)]
        struct RequiresState;

        impl Rule for RequiresState {
            fn parse(
                &self,
                ctx: &mut Context<'_>,
                reader: &mut Reader<'_>,
                cont: &dyn Continuation,
            ) -> bool {
                if ctx.side_state::<u32>() == Some(&7) {
                    cont.run(ctx, reader)
                } else {
                    ctx.report(crate::error::ParseError::new(
                        crate::text::TextRange::empty(reader.position()),
                        ParseErrorKind::LookaheadFailed,
                    ));
                    false
                }
            }
        }

        let session = Session::new("file", Box::new(RequiresState));
        let state = 7u32;
        assert!(session.validate_with_state("", &state).is_success());
        assert!(!session.validate("").is_success());
    }

    #[test]
    fn test_whitespace_token_in_tree_after_literal() {
        let entry = Sequence::new(vec![
            Box::new(Literal::new("a")),
            Box::new(Literal::new("b")),
        ]);
        let session = Session::new("file", Box::new(entry)).with_whitespace(Box::new(
            CharsRule::new(CharSet::ascii_whitespace(), TokenKind::WHITESPACE),
        ));
        let outcome = session.parse("a b").unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.stats.tokens, 3);
    }
}
