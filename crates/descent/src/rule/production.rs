//! Named productions and whitespace-sensitive regions.

use super::{BranchRule, BranchShape, Continuation, Rule, Taken};
use crate::context::Context;
use crate::error::ParseErrorKind;
use crate::input::Reader;
use std::cell::Cell;

/// Wraps a rule in a named production.
///
/// Entering the production emits `production_start` and counts against the
/// recursion guard; matched content emits `production_finish` before the
/// outer continuation runs, and a failure before the content matched emits
/// `production_cancel` so handlers can discard the partial region. Once
/// `production_finish` has been emitted the production stays committed even
/// if the continuation fails later.
///
/// A production built with [`Production::transparent`] keeps the depth
/// guard but emits no production events at all: its content lands directly
/// in the enclosing production, as if the wrapper were not there. The name
/// survives only for debugging.
#[derive(Debug)]
pub struct Production {
    name: &'static str,
    inner: Box<dyn Rule>,
    transparent: bool,
}

impl Production {
    #[must_use]
    pub fn new(name: &'static str, inner: Box<dyn Rule>) -> Self {
        Self {
            name,
            inner,
            transparent: false,
        }
    }

    /// A production that splices its children into the parent instead of
    /// allocating a node of its own.
    #[must_use]
    pub fn transparent(name: &'static str, inner: Box<dyn Rule>) -> Self {
        Self {
            name,
            inner,
            transparent: true,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    fn run_inner(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if self.transparent {
            return self.inner.parse(ctx, reader, cont);
        }
        ctx.handler().production_start(self.name, reader.position());
        let finished = Cell::new(false);
        let ok = self.inner.parse(
            ctx,
            reader,
            &FinishCont {
                name: self.name,
                finished: &finished,
                next: cont,
            },
        );
        if !ok && !finished.get() {
            ctx.handler().production_cancel(self.name, reader.position());
        }
        ok
    }

    fn finish_inner(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        let Some(inner) = self.inner.as_branch() else {
            debug_assert!(false, "production committed without a branch body");
            return false;
        };
        if self.transparent {
            return inner.finish(ctx, reader, taken, cont);
        }
        ctx.handler().production_start(self.name, taken.begin());
        let finished = Cell::new(false);
        let ok = inner.finish(
            ctx,
            reader,
            taken,
            &FinishCont {
                name: self.name,
                finished: &finished,
                next: cont,
            },
        );
        if !ok && !finished.get() {
            ctx.handler().production_cancel(self.name, reader.position());
        }
        ok
    }
}

struct FinishCont<'a> {
    name: &'static str,
    finished: &'a Cell<bool>,
    next: &'a dyn Continuation,
}

impl Continuation for FinishCont<'_> {
    fn run(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        ctx.handler().production_finish(self.name, reader.position());
        self.finished.set(true);
        self.next.run(ctx, reader)
    }
}

impl Rule for Production {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if !ctx.enter_guarded(reader.position(), ParseErrorKind::RecursionLimitExceeded) {
            return false;
        }
        let ok = self.run_inner(ctx, reader, cont);
        ctx.exit_guarded();
        ok
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        self.inner.as_branch().map(|_| self as &dyn BranchRule)
    }
}

impl BranchRule for Production {
    fn shape(&self) -> BranchShape {
        self.inner
            .as_branch()
            .map_or(BranchShape::Never, BranchRule::shape)
    }

    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        self.inner.as_branch()?.try_parse(ctx, reader)
    }

    fn cancel(&self, ctx: &mut Context<'_>, taken: Taken) {
        if let Some(inner) = self.inner.as_branch() {
            inner.cancel(ctx, taken);
        }
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        if !ctx.enter_guarded(taken.begin(), ParseErrorKind::RecursionLimitExceeded) {
            return false;
        }
        let ok = self.finish_inner(ctx, reader, taken, cont);
        ctx.exit_guarded();
        ok
    }
}

/// Disables automatic whitespace skipping inside its body.
///
/// Trailing whitespace after the region is skipped once skipping is
/// re-enabled, so a token following the region starts clean.
#[derive(Debug)]
pub struct NoWhitespace {
    inner: Box<dyn Rule>,
}

impl NoWhitespace {
    #[must_use]
    pub fn new(inner: Box<dyn Rule>) -> Self {
        Self { inner }
    }
}

struct RestoreCont<'a> {
    prev: bool,
    next: &'a dyn Continuation,
}

impl Continuation for RestoreCont<'_> {
    fn run(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        ctx.set_whitespace_enabled(self.prev);
        ctx.skip_whitespace(reader);
        self.next.run(ctx, reader)
    }
}

impl Rule for NoWhitespace {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        let prev = ctx.set_whitespace_enabled(false);
        let ok = self.inner.parse(ctx, reader, &RestoreCont { prev, next: cont });
        if !ok {
            ctx.set_whitespace_enabled(prev);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::char_class::CharSet;
    use crate::handler::{TraceSink, ValidateSink};
    use crate::kind::TokenKind;
    use crate::rule::{CharsRule, Done, Literal, Sequence};
    use crate::text::TextSize;

    fn digits() -> Box<dyn Rule> {
        Box::new(CharsRule::new(CharSet::ascii_digit(), TokenKind::DIGITS))
    }

    #[test]
    fn test_production_events_on_success() {
        let rule = Production::new("number", digits());
        let mut sink = TraceSink::new();
        {
            let mut ctx = Context::new(&mut sink);
            let mut reader = Reader::new("42");
            assert!(rule.parse(&mut ctx, &mut reader, &Done));
        }
        let log = sink.finish();
        assert!(log.contains("number: start @0"));
        assert!(log.contains("number: finish @2"));
        assert!(!log.contains("cancel"));
    }

    #[test]
    fn test_production_cancel_on_failure() {
        let rule = Production::new("number", digits());
        let mut sink = TraceSink::new();
        {
            let mut ctx = Context::new(&mut sink);
            let mut reader = Reader::new("xy");
            assert!(!rule.parse(&mut ctx, &mut reader, &Done));
        }
        let log = sink.finish();
        assert!(log.contains("number: start @0"));
        assert!(log.contains("number: cancel @0"));
        assert!(!log.contains("finish"));
    }

    #[test]
    fn test_transparent_production_emits_no_events() {
        let rule = Production::transparent("group", digits());
        let mut sink = TraceSink::new();
        {
            let mut ctx = Context::new(&mut sink);
            let mut reader = Reader::new("42");
            assert!(rule.parse(&mut ctx, &mut reader, &Done));
        }
        let log = sink.finish();
        assert!(log.contains("token digits 0..2"));
        assert!(!log.contains("group"));
    }

    #[test]
    fn test_transparent_production_still_guards_depth() {
        let rule = Production::transparent(
            "outer",
            Box::new(Production::transparent("inner", digits())),
        );
        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        ctx.set_max_depth(1);
        let mut reader = Reader::new("1");
        assert!(!rule.parse(&mut ctx, &mut reader, &Done));
        assert!(ctx.is_fatal());
    }

    #[test]
    fn test_recursion_guard_is_fatal() {
        // number wrapped deep enough to trip a tiny limit.
        let rule = Production::new(
            "outer",
            Box::new(Production::new("inner", digits())),
        );
        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        ctx.set_max_depth(1);
        let mut reader = Reader::new("1");
        assert!(!rule.parse(&mut ctx, &mut reader, &Done));
        assert!(ctx.is_fatal());
        assert_eq!(
            sink.errors()[0].kind,
            crate::error::ParseErrorKind::RecursionLimitExceeded
        );
    }

    #[test]
    fn test_no_whitespace_region() {
        let ws = CharsRule::new(CharSet::ascii_whitespace(), TokenKind::WHITESPACE);
        let rule = Sequence::new(vec![
            Box::new(Literal::new("a")),
            Box::new(NoWhitespace::new(Box::new(Sequence::new(vec![
                Box::new(Literal::new("b")),
                Box::new(Literal::new("c")),
            ])))),
        ]);

        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        ctx.set_whitespace(&ws);

        // "a bc" parses: space skipped between a and the region, none inside.
        let mut reader = Reader::new("a bc");
        assert!(rule.parse(&mut ctx, &mut reader, &Done));
        assert_eq!(reader.position(), TextSize::from(4));
        assert!(ctx.whitespace_enabled());

        // "a b c" fails: the region forbids the inner space.
        let mut sink = ValidateSink::new();
        let mut ctx = Context::new(&mut sink);
        ctx.set_whitespace(&ws);
        let mut reader = Reader::new("a b c");
        assert!(!rule.parse(&mut ctx, &mut reader, &Done));
        assert!(ctx.whitespace_enabled());
    }
}
