//! Context-sensitive rules: scoped counters, flags, captured spans,
//! identifier matching and order-free combinations.
//!
//! Variables are declared with [`WithVar`], which scopes them to its body:
//! the value is pushed on entry and popped once the body's content has
//! matched, so shadowing nests naturally and a cancelled speculation never
//! leaks a scope. The variable rules inside the body address their variable
//! through the [`TypeId`] of a user-declared marker type.

use super::{BranchRule, Continuation, Rule, Taken, TokenRule};
use crate::context::{Context, VarValue};
use crate::error::{ParseError, ParseErrorKind};
use crate::input::Reader;
use crate::rule::token::Identifier;
use crate::text::{TextRange, TextSize};
use std::any::TypeId;
use std::cell::Cell;

/// Declares a context variable for the extent of its body.
#[derive(Debug)]
pub struct WithVar {
    key: TypeId,
    initial: VarValue,
    inner: Box<dyn Rule>,
}

impl WithVar {
    /// Scope a counter starting at `initial`.
    #[must_use]
    pub fn counter<T: 'static>(initial: i64, inner: Box<dyn Rule>) -> Self {
        Self {
            key: TypeId::of::<T>(),
            initial: VarValue::Counter(initial),
            inner,
        }
    }

    /// Scope a boolean flag starting at `initial`.
    #[must_use]
    pub fn flag<T: 'static>(initial: bool, inner: Box<dyn Rule>) -> Self {
        Self {
            key: TypeId::of::<T>(),
            initial: VarValue::Flag(initial),
            inner,
        }
    }

    /// Scope a captured span, initially empty.
    #[must_use]
    pub fn capture<T: 'static>(inner: Box<dyn Rule>) -> Self {
        Self {
            key: TypeId::of::<T>(),
            initial: VarValue::Span(TextRange::empty(TextSize::zero())),
            inner,
        }
    }
}

struct PopCont<'a> {
    key: TypeId,
    popped: &'a Cell<bool>,
    next: &'a dyn Continuation,
}

impl Continuation for PopCont<'_> {
    fn run(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        ctx.vars().pop(self.key);
        self.popped.set(true);
        self.next.run(ctx, reader)
    }
}

impl Rule for WithVar {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        ctx.vars().push(self.key, self.initial);
        let popped = Cell::new(false);
        let ok = self.inner.parse(
            ctx,
            reader,
            &PopCont {
                key: self.key,
                popped: &popped,
                next: cont,
            },
        );
        if !popped.get() {
            ctx.vars().pop(self.key);
        }
        ok
    }
}

/// Mutates the innermost counter for its key, consuming no input.
///
/// Overflow is reported as a recoverable error and the counter saturates,
/// so a counting grammar survives hostile input with one diagnostic.
#[derive(Debug)]
pub struct CounterOp {
    key: TypeId,
    delta: i64,
}

impl CounterOp {
    #[must_use]
    pub fn add<T: 'static>(delta: i64) -> Self {
        Self {
            key: TypeId::of::<T>(),
            delta,
        }
    }

    #[must_use]
    pub fn increment<T: 'static>() -> Self {
        Self::add::<T>(1)
    }

    #[must_use]
    pub fn decrement<T: 'static>() -> Self {
        Self::add::<T>(-1)
    }
}

impl Rule for CounterOp {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        let pos = reader.position();
        let delta = self.delta;
        match ctx.vars().get_mut(self.key) {
            Some(VarValue::Counter(value)) => match value.checked_add(delta) {
                Some(next) => {
                    *value = next;
                    cont.run(ctx, reader)
                }
                None => {
                    *value = if delta > 0 { i64::MAX } else { i64::MIN };
                    ctx.report(ParseError::new(
                        TextRange::empty(pos),
                        ParseErrorKind::IntegerOverflow,
                    ));
                    cont.run(ctx, reader)
                }
            },
            _ => {
                ctx.report(ParseError::new(
                    TextRange::empty(pos),
                    ParseErrorKind::InvalidSyntax("counter not in scope".into()),
                ));
                false
            }
        }
    }
}

/// Branch condition on a counter's value; consumes nothing.
#[derive(Debug)]
pub struct CounterIs {
    key: TypeId,
    expected: i64,
}

impl CounterIs {
    #[must_use]
    pub fn new<T: 'static>(expected: i64) -> Self {
        Self {
            key: TypeId::of::<T>(),
            expected,
        }
    }

    fn holds(&self, ctx: &Context<'_>) -> bool {
        matches!(
            ctx.vars_ref().get(self.key),
            Some(VarValue::Counter(value)) if value == self.expected
        )
    }
}

impl Rule for CounterIs {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if self.holds(ctx) {
            cont.run(ctx, reader)
        } else {
            ctx.report(ParseError::new(
                TextRange::empty(reader.position()),
                ParseErrorKind::UnequalCounters,
            ));
            false
        }
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        Some(self)
    }
}

impl BranchRule for CounterIs {
    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        self.holds(ctx).then_some(Taken::Empty {
            begin: reader.position(),
        })
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        _taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        cont.run(ctx, reader)
    }
}

/// Checks two counters for equality. A mismatch is reported and the parse
/// continues; the grammar shape is unaffected by the violation.
#[derive(Debug)]
pub struct CountersEqual {
    a: TypeId,
    b: TypeId,
}

impl CountersEqual {
    #[must_use]
    pub fn new<A: 'static, B: 'static>() -> Self {
        Self {
            a: TypeId::of::<A>(),
            b: TypeId::of::<B>(),
        }
    }
}

impl Rule for CountersEqual {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        let equal = matches!(
            (ctx.vars_ref().get(self.a), ctx.vars_ref().get(self.b)),
            (Some(VarValue::Counter(a)), Some(VarValue::Counter(b))) if a == b
        );
        if !equal {
            ctx.report(ParseError::new(
                TextRange::empty(reader.position()),
                ParseErrorKind::UnequalCounters,
            ));
        }
        cont.run(ctx, reader)
    }
}

/// Mutates the innermost flag for its key, consuming no input.
#[derive(Debug)]
pub struct FlagOp {
    key: TypeId,
    value: Option<bool>,
}

impl FlagOp {
    #[must_use]
    pub fn set<T: 'static>(value: bool) -> Self {
        Self {
            key: TypeId::of::<T>(),
            value: Some(value),
        }
    }

    #[must_use]
    pub fn toggle<T: 'static>() -> Self {
        Self {
            key: TypeId::of::<T>(),
            value: None,
        }
    }
}

impl Rule for FlagOp {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        let set_to = self.value;
        match ctx.vars().get_mut(self.key) {
            Some(VarValue::Flag(flag)) => {
                *flag = set_to.unwrap_or(!*flag);
                cont.run(ctx, reader)
            }
            _ => {
                ctx.report(ParseError::new(
                    TextRange::empty(reader.position()),
                    ParseErrorKind::InvalidSyntax("flag not in scope".into()),
                ));
                false
            }
        }
    }
}

/// Branch condition on a flag's value; consumes nothing.
#[derive(Debug)]
pub struct FlagIs {
    key: TypeId,
    expected: bool,
}

impl FlagIs {
    #[must_use]
    pub fn new<T: 'static>(expected: bool) -> Self {
        Self {
            key: TypeId::of::<T>(),
            expected,
        }
    }

    fn holds(&self, ctx: &Context<'_>) -> bool {
        matches!(
            ctx.vars_ref().get(self.key),
            Some(VarValue::Flag(value)) if value == self.expected
        )
    }
}

impl Rule for FlagIs {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if self.holds(ctx) {
            cont.run(ctx, reader)
        } else {
            ctx.report(ParseError::new(
                TextRange::empty(reader.position()),
                ParseErrorKind::LookaheadFailed,
            ));
            false
        }
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        Some(self)
    }
}

impl BranchRule for FlagIs {
    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        self.holds(ctx).then_some(Taken::Empty {
            begin: reader.position(),
        })
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        _taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        cont.run(ctx, reader)
    }
}

/// Stores the span its body consumed into the innermost capture variable.
#[derive(Debug)]
pub struct CaptureRule {
    key: TypeId,
    inner: Box<dyn Rule>,
}

impl CaptureRule {
    #[must_use]
    pub fn new<T: 'static>(inner: Box<dyn Rule>) -> Self {
        Self {
            key: TypeId::of::<T>(),
            inner,
        }
    }
}

struct StoreSpanCont<'a> {
    key: TypeId,
    begin: TextSize,
    next: &'a dyn Continuation,
}

impl Continuation for StoreSpanCont<'_> {
    fn run(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        let range = TextRange::new(self.begin, reader.position());
        match ctx.vars().get_mut(self.key) {
            Some(slot @ VarValue::Span(_)) => *slot = VarValue::Span(range),
            _ => {
                ctx.report(ParseError::new(
                    range,
                    ParseErrorKind::InvalidSyntax("capture not in scope".into()),
                ));
                return false;
            }
        }
        self.next.run(ctx, reader)
    }
}

impl Rule for CaptureRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        let begin = reader.position();
        self.inner.parse(
            ctx,
            reader,
            &StoreSpanCont {
                key: self.key,
                begin,
                next: cont,
            },
        )
    }
}

/// Matches an identifier and checks it against a previously captured span.
///
/// A lexeme mismatch is reported but the identifier stays committed, so one
/// wrong closing tag (or similar) produces one error and the parse goes on.
#[derive(Debug)]
pub struct MatchCaptured {
    key: TypeId,
    ident: Identifier,
}

impl MatchCaptured {
    #[must_use]
    pub fn new<T: 'static>(ident: Identifier) -> Self {
        Self {
            key: TypeId::of::<T>(),
            ident,
        }
    }
}

impl Rule for MatchCaptured {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        let begin = reader.position();
        let Some(kind) = self.ident.scan(reader) else {
            ctx.report(ParseError::new(
                TextRange::empty(begin),
                self.ident.expected(),
            ));
            return false;
        };
        let range = TextRange::new(begin, reader.position());
        match ctx.vars_ref().get(self.key) {
            Some(VarValue::Span(captured)) => {
                if reader.slice(range) != reader.slice(captured) {
                    ctx.report(ParseError::new(
                        range,
                        ParseErrorKind::MismatchedIdentifier,
                    ));
                }
            }
            _ => {
                ctx.report(ParseError::new(
                    range,
                    ParseErrorKind::InvalidSyntax("capture not in scope".into()),
                ));
                return false;
            }
        }
        ctx.emit_token(kind, range);
        ctx.skip_whitespace(reader);
        cont.run(ctx, reader)
    }
}

/// Parses every entry exactly once, in any order.
///
/// A repeated entry is consumed with a recoverable duplicate error; when no
/// entry's condition accepts before all have been seen, the alternatives are
/// exhausted and the rule fails.
#[derive(Debug)]
pub struct Combination {
    entries: Vec<Box<dyn BranchRule>>,
}

impl Combination {
    /// At most 64 entries.
    #[must_use]
    pub fn new(entries: Vec<Box<dyn BranchRule>>) -> Self {
        debug_assert!(entries.len() <= 64);
        Self { entries }
    }

    fn parse_entries(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        let all: u64 = if self.entries.len() == 64 {
            u64::MAX
        } else {
            (1u64 << self.entries.len()) - 1
        };
        let mut seen = 0u64;
        while seen != all {
            let mut advanced = false;
            for (index, entry) in self.entries.iter().enumerate() {
                let Some(taken) = entry.try_parse(ctx, reader) else {
                    continue;
                };
                let begin = taken.begin();
                let duplicate = seen & (1 << index) != 0;
                if !entry.finish(ctx, reader, taken, &super::Done) {
                    return false;
                }
                if duplicate {
                    ctx.report(ParseError::new(
                        TextRange::new(begin, reader.position()),
                        ParseErrorKind::DuplicateCombinationEntry,
                    ));
                } else {
                    seen |= 1 << index;
                }
                advanced = true;
                break;
            }
            if !advanced {
                ctx.report(ParseError::new(
                    TextRange::empty(reader.position()),
                    ParseErrorKind::ExhaustedChoices,
                ));
                return false;
            }
        }
        true
    }
}

impl Rule for Combination {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if !self.parse_entries(ctx, reader) {
            return false;
        }
        cont.run(ctx, reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::ValidateSink;
    use crate::rule::{Done, Literal, RepeatRule, Sequence};

    struct Depth;
    struct Other;
    struct Tag;

    fn lit(text: &str) -> Box<dyn Rule> {
        Box::new(Literal::new(text))
    }

    fn parse_with(rule: &dyn Rule, input: &str) -> (bool, Vec<ParseError>, u32) {
        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        let mut reader = Reader::new(input);
        let ok = rule.parse(&mut ctx, &mut reader, &Done);
        let end = reader.position().into();
        (ok, sink.into_errors(), end)
    }

    #[test]
    fn test_counter_counts_repetitions() {
        // Count 'a's, then require exactly three.
        let body = Sequence::new(vec![
            Box::new(RepeatRule::new(Box::new(Sequence::new(vec![
                lit("a"),
                Box::new(CounterOp::increment::<Depth>()),
            ])))),
            Box::new(CounterIs::new::<Depth>(3)),
        ]);
        let rule = WithVar::counter::<Depth>(0, Box::new(body));

        let (ok, errors, _) = parse_with(&rule, "aaa");
        assert!(ok, "{errors:?}");

        let (ok, errors, _) = parse_with(&rule, "aa");
        assert!(!ok);
        assert_eq!(errors[0].kind, ParseErrorKind::UnequalCounters);
    }

    #[test]
    fn test_counters_equal_continues_on_mismatch() {
        let body = Sequence::new(vec![
            Box::new(CounterOp::increment::<Depth>()),
            Box::new(CountersEqual::new::<Depth, Other>()),
        ]);
        let rule = WithVar::counter::<Depth>(
            0,
            Box::new(WithVar::counter::<Other>(0, Box::new(body))),
        );
        let (ok, errors, _) = parse_with(&rule, "");
        assert!(ok);
        assert_eq!(errors[0].kind, ParseErrorKind::UnequalCounters);
    }

    #[test]
    fn test_flag_toggle_and_check() {
        let body = Sequence::new(vec![
            Box::new(FlagOp::toggle::<Depth>()),
            Box::new(FlagIs::new::<Depth>(true)),
        ]);
        let rule = WithVar::flag::<Depth>(false, Box::new(body));
        let (ok, errors, _) = parse_with(&rule, "");
        assert!(ok, "{errors:?}");
    }

    #[test]
    fn test_capture_and_match() {
        // tag body closing-tag, closing tag must repeat the opening one.
        let body = Sequence::new(vec![
            Box::new(CaptureRule::new::<Tag>(Box::new(Identifier::new()))),
            lit(":"),
            Box::new(MatchCaptured::new::<Tag>(Identifier::new())),
        ]);
        let rule = WithVar::capture::<Tag>(Box::new(body));

        let (ok, errors, _) = parse_with(&rule, "div:div");
        assert!(ok);
        assert!(errors.is_empty());

        let (ok, errors, _) = parse_with(&rule, "div:span");
        assert!(ok);
        assert_eq!(errors[0].kind, ParseErrorKind::MismatchedIdentifier);
    }

    #[test]
    fn test_combination_any_order() {
        let rule = Combination::new(vec![
            Box::new(Literal::new("a")),
            Box::new(Literal::new("b")),
            Box::new(Literal::new("c")),
        ]);
        let (ok, errors, end) = parse_with(&rule, "cab");
        assert!(ok);
        assert!(errors.is_empty());
        assert_eq!(end, 3);
    }

    #[test]
    fn test_combination_duplicate_recoverable() {
        let rule = Combination::new(vec![
            Box::new(Literal::new("a")),
            Box::new(Literal::new("b")),
        ]);
        let (ok, errors, end) = parse_with(&rule, "aab");
        assert!(ok);
        assert_eq!(errors[0].kind, ParseErrorKind::DuplicateCombinationEntry);
        assert_eq!(end, 3);
    }

    #[test]
    fn test_combination_missing_entry_fails() {
        let rule = Combination::new(vec![
            Box::new(Literal::new("a")),
            Box::new(Literal::new("b")),
        ]);
        let (ok, errors, _) = parse_with(&rule, "a!");
        assert!(!ok);
        assert_eq!(
            errors.last().unwrap().kind,
            ParseErrorKind::ExhaustedChoices
        );
    }

    #[test]
    fn test_scope_popped_after_body() {
        let rule = WithVar::counter::<Depth>(5, lit("x"));
        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        let mut reader = Reader::new("x");
        assert!(rule.parse(&mut ctx, &mut reader, &Done));
        assert_eq!(ctx.vars_ref().get(std::any::TypeId::of::<Depth>()), None);
    }
}
