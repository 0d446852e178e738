//! The rule-execution protocol.
//!
//! A grammar is a tree of [`Rule`] values built once and executed directly:
//! there is no separate interpreter loop. Every rule's `parse` takes "the
//! next thing to do" as a [`Continuation`], so sequencing threads the
//! continuation through its elements and the entire grammar becomes one
//! nested chain of calls.
//!
//! Rules that can cheaply test "would this match" additionally implement
//! [`BranchRule`], a three-step protocol: `try_parse` speculatively consumes
//! the branch condition, `cancel` releases anything a rejected speculation
//! acquired, and `finish` commits the deferred side effects (token and
//! production events) before continuing. Alternation tests branches in
//! declared order and commits the first accepted condition; once a branch is
//! committed there is no backtracking out of it.
//!
//! Rules are composed by value as trait objects. This is the documented
//! dispatch trade: one virtual call per rule instead of monomorphized
//! zero-cost composition, in exchange for object-safe rule values that can
//! be stored, shared and built at runtime. No allocation happens while
//! parsing except when a *composite* branch condition is speculated (the
//! [`Taken`] chain boxes one level per nested composite).

use crate::context::Context;
use crate::error::ParseErrorKind;
use crate::input::Reader;
use crate::kind::TokenKind;
use crate::text::{TextRange, TextSize};
use std::fmt;

mod combinators;
mod context_var;
mod production;
mod recover;
mod token;

pub use combinators::{
    Choice, IfElse, ListRule, OptRule, PeekNotRule, PeekRule, Recurse, RepeatRule, Sequence,
};
pub use context_var::{
    CaptureRule, Combination, CounterIs, CounterOp, CountersEqual, FlagIs, FlagOp, MatchCaptured,
    WithVar,
};
pub use production::{NoWhitespace, Production};
pub use recover::{FindRule, RecoverRule, TryRule};
pub use token::{CharsRule, EofRule, ElseRule, Identifier, Keyword, Literal, LiteralSet};

/// "What to parse next." Threaded through rule composition instead of
/// returning control to a caller loop.
pub trait Continuation {
    fn run(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool;
}

/// The terminal continuation: nothing left to parse, succeed.
#[derive(Debug, Clone, Copy)]
pub struct Done;

impl Continuation for Done {
    fn run(&self, _ctx: &mut Context<'_>, _reader: &mut Reader<'_>) -> bool {
        true
    }
}

/// Closures are continuations, for callers that want to run code after a
/// rule without defining a struct.
impl<F> Continuation for F
where
    F: Fn(&mut Context<'_>, &mut Reader<'_>) -> bool,
{
    fn run(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        self(ctx, reader)
    }
}

/// A composable grammar fragment with a fixed parsing strategy.
pub trait Rule: fmt::Debug {
    /// Parse this rule, then run `cont`. Returns overall success. On
    /// failure an error has already been reported to the handler (unless a
    /// continuation further down reported it).
    fn parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>, cont: &dyn Continuation)
        -> bool;

    /// Capability flag: the branch view of this rule, if it supports
    /// speculative testing.
    fn as_branch(&self) -> Option<&dyn BranchRule> {
        None
    }

    /// Capability flag: the token view of this rule, if it matches a single
    /// token and produces no nested structure.
    fn as_token(&self) -> Option<&dyn TokenRule> {
        None
    }
}

/// Build-time classification of a branch condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchShape {
    /// The condition always accepts (e.g. `else_`); alternatives after it
    /// are unreachable.
    Always,
    /// The condition never accepts.
    Never,
    /// The condition must be tested at parse time.
    Dynamic,
}

/// Record of a successful speculative `try_parse`, handed back to the same
/// rule's `finish` or `cancel`.
///
/// Token conditions record what they matched; composite conditions record
/// which alternative was taken and nest the inner record.
#[derive(Debug)]
pub enum Taken {
    /// The condition consumed one token.
    Token { kind: TokenKind, begin: TextSize },
    /// The condition consumed nothing.
    Empty { begin: TextSize },
    /// A composite condition took alternative `index`.
    Alt { index: usize, inner: Box<Taken> },
}

impl Taken {
    /// Position before the condition was consumed.
    #[must_use]
    pub fn begin(&self) -> TextSize {
        match self {
            Self::Token { begin, .. } | Self::Empty { begin } => *begin,
            Self::Alt { inner, .. } => inner.begin(),
        }
    }
}

/// A rule supporting the speculative three-step branch protocol.
pub trait BranchRule: Rule {
    /// Build-time shape marker; lets composition rules skip impossible
    /// alternatives and flag unreachable ones.
    fn shape(&self) -> BranchShape {
        BranchShape::Dynamic
    }

    /// Test the branch condition. On acceptance the reader is left after
    /// the consumed condition and a [`Taken`] record is returned; on
    /// rejection the reader and context are left exactly as before the call.
    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken>;

    /// Release anything a successful `try_parse` acquired (context-variable
    /// pushes, captures) when the branch is not selected. The caller
    /// restores the reader from its own snapshot.
    fn cancel(&self, _ctx: &mut Context<'_>, _taken: Taken) {}

    /// Commit the accepted condition: emit its deferred events, then parse
    /// the remainder of the branch and run `cont`.
    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        taken: Taken,
        cont: &dyn Continuation,
    ) -> bool;
}

/// A rule that recognizes exactly one token.
///
/// `scan` is the pure longest-match half shared by token branches and the
/// whitespace injector: it advances the reader past the token on success
/// and leaves it untouched on failure, with no events emitted.
pub trait TokenRule: Rule {
    fn scan(&self, reader: &mut Reader<'_>) -> Option<TokenKind>;

    /// The error reported when the token does not match.
    fn expected(&self) -> ParseErrorKind;
}

/// Shared `Rule::parse` implementation for token rules.
pub(crate) fn parse_token_rule(
    rule: &dyn TokenRule,
    ctx: &mut Context<'_>,
    reader: &mut Reader<'_>,
    cont: &dyn Continuation,
) -> bool {
    let begin = reader.position();
    match rule.scan(reader) {
        Some(kind) => {
            ctx.emit_token(kind, TextRange::new(begin, reader.position()));
            ctx.skip_whitespace(reader);
            cont.run(ctx, reader)
        }
        None => {
            ctx.report(crate::error::ParseError::new(
                TextRange::empty(begin),
                rule.expected(),
            ));
            false
        }
    }
}

/// Shared `BranchRule::try_parse` implementation for token rules.
pub(crate) fn try_scan_token(rule: &dyn TokenRule, reader: &mut Reader<'_>) -> Option<Taken> {
    let begin = reader.position();
    let kind = rule.scan(reader)?;
    Some(Taken::Token { kind, begin })
}

/// Shared `BranchRule::finish` implementation for token rules.
pub(crate) fn finish_token(
    ctx: &mut Context<'_>,
    reader: &mut Reader<'_>,
    taken: Taken,
    cont: &dyn Continuation,
) -> bool {
    match taken {
        Taken::Token { kind, begin } => {
            ctx.emit_token(kind, TextRange::new(begin, reader.position()));
            ctx.skip_whitespace(reader);
            cont.run(ctx, reader)
        }
        Taken::Empty { .. } | Taken::Alt { .. } => {
            debug_assert!(false, "token branch finished with a non-token record");
            cont.run(ctx, reader)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ValidateSink;

    #[test]
    fn test_closure_continuation() {
        let rule = Literal::new("a");
        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        let mut reader = Reader::new("ab");
        let ok = rule.parse(
            &mut ctx,
            &mut reader,
            &|_: &mut Context<'_>, reader: &mut Reader<'_>| reader.position() == TextSize::from(1),
        );
        assert!(ok);
    }
}
