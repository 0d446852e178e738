//! Structural combinators: sequencing, alternation, option, repetition,
//! separated lists, conditional branches, lookahead and recursion ties.

use super::{BranchRule, BranchShape, Continuation, Done, Rule, Taken};
use crate::context::Context;
use crate::error::{ParseError, ParseErrorKind};
use crate::input::Reader;
use crate::text::TextRange;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Parses its elements in order, threading the continuation through them.
///
/// As a branch, a sequence borrows its first element's condition: the
/// sequence commits as soon as its head commits.
#[derive(Debug)]
pub struct Sequence {
    elements: Vec<Box<dyn Rule>>,
}

impl Sequence {
    #[must_use]
    pub fn new(elements: Vec<Box<dyn Rule>>) -> Self {
        Self { elements }
    }
}

struct SeqCont<'a> {
    elements: &'a [Box<dyn Rule>],
    index: usize,
    next: &'a dyn Continuation,
}

impl Continuation for SeqCont<'_> {
    fn run(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        match self.elements.get(self.index) {
            Some(rule) => rule.parse(
                ctx,
                reader,
                &SeqCont {
                    elements: self.elements,
                    index: self.index + 1,
                    next: self.next,
                },
            ),
            None => self.next.run(ctx, reader),
        }
    }
}

impl Rule for Sequence {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        SeqCont {
            elements: &self.elements,
            index: 0,
            next: cont,
        }
        .run(ctx, reader)
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        match self.elements.first() {
            Some(head) if head.as_branch().is_some() => Some(self),
            None => Some(self),
            Some(_) => None,
        }
    }
}

impl BranchRule for Sequence {
    fn shape(&self) -> BranchShape {
        match self.elements.first().and_then(|head| head.as_branch()) {
            Some(head) => head.shape(),
            None => BranchShape::Always,
        }
    }

    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        match self.elements.first() {
            Some(head) => head.as_branch()?.try_parse(ctx, reader),
            None => Some(Taken::Empty {
                begin: reader.position(),
            }),
        }
    }

    fn cancel(&self, ctx: &mut Context<'_>, taken: Taken) {
        if let Some(head) = self.elements.first().and_then(|head| head.as_branch()) {
            head.cancel(ctx, taken);
        }
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        match self.elements.first().and_then(|head| head.as_branch()) {
            Some(head) => head.finish(
                ctx,
                reader,
                taken,
                &SeqCont {
                    elements: &self.elements,
                    index: 1,
                    next: cont,
                },
            ),
            None => cont.run(ctx, reader),
        }
    }
}

/// Ordered alternation over branch rules.
///
/// Conditions are tested in declared order; the first accepted condition
/// commits its branch and later alternatives are never consulted, even if
/// the committed branch subsequently fails. When no condition accepts, one
/// exhaustion error is reported at the unconsumed position.
#[derive(Debug)]
pub struct Choice {
    branches: Vec<Box<dyn BranchRule>>,
}

impl Choice {
    #[must_use]
    pub fn new(branches: Vec<Box<dyn BranchRule>>) -> Self {
        Self { branches }
    }

    fn select(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<(usize, Taken)> {
        for (index, branch) in self.branches.iter().enumerate() {
            if branch.shape() == BranchShape::Never {
                continue;
            }
            if let Some(taken) = branch.try_parse(ctx, reader) {
                return Some((index, taken));
            }
        }
        None
    }
}

impl Rule for Choice {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        match self.select(ctx, reader) {
            Some((index, taken)) => self.branches[index].finish(ctx, reader, taken, cont),
            None => {
                ctx.report(ParseError::new(
                    TextRange::empty(reader.position()),
                    ParseErrorKind::ExhaustedChoices,
                ));
                false
            }
        }
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        Some(self)
    }
}

impl BranchRule for Choice {
    fn shape(&self) -> BranchShape {
        let mut all_never = true;
        for branch in &self.branches {
            match branch.shape() {
                BranchShape::Always => return BranchShape::Always,
                BranchShape::Never => {}
                BranchShape::Dynamic => all_never = false,
            }
        }
        if all_never {
            BranchShape::Never
        } else {
            BranchShape::Dynamic
        }
    }

    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        let (index, inner) = self.select(ctx, reader)?;
        Some(Taken::Alt {
            index,
            inner: Box::new(inner),
        })
    }

    fn cancel(&self, ctx: &mut Context<'_>, taken: Taken) {
        if let Taken::Alt { index, inner } = taken {
            self.branches[index].cancel(ctx, *inner);
        }
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        match taken {
            Taken::Alt { index, inner } => self.branches[index].finish(ctx, reader, *inner, cont),
            _ => {
                debug_assert!(false, "alternation finished with a non-alternative record");
                false
            }
        }
    }
}

/// Parses its branch if the condition accepts, otherwise succeeds having
/// consumed nothing.
#[derive(Debug)]
pub struct OptRule {
    inner: Box<dyn BranchRule>,
}

impl OptRule {
    #[must_use]
    pub fn new(inner: Box<dyn BranchRule>) -> Self {
        Self { inner }
    }
}

impl Rule for OptRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        match self.inner.try_parse(ctx, reader) {
            Some(taken) => self.inner.finish(ctx, reader, taken, cont),
            None => cont.run(ctx, reader),
        }
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        Some(self)
    }
}

impl BranchRule for OptRule {
    fn shape(&self) -> BranchShape {
        BranchShape::Always
    }

    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        let begin = reader.position();
        match self.inner.try_parse(ctx, reader) {
            Some(inner) => Some(Taken::Alt {
                index: 0,
                inner: Box::new(inner),
            }),
            None => Some(Taken::Empty { begin }),
        }
    }

    fn cancel(&self, ctx: &mut Context<'_>, taken: Taken) {
        if let Taken::Alt { inner, .. } = taken {
            self.inner.cancel(ctx, *inner);
        }
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        match taken {
            Taken::Alt { inner, .. } => self.inner.finish(ctx, reader, *inner, cont),
            _ => cont.run(ctx, reader),
        }
    }
}

/// Parses the item as long as its condition accepts (zero or more times).
///
/// Each accepted item runs to completion before the next condition is
/// tested. An iteration that accepts without consuming input terminates the
/// loop instead of spinning.
#[derive(Debug)]
pub struct RepeatRule {
    item: Box<dyn BranchRule>,
}

impl RepeatRule {
    #[must_use]
    pub fn new(item: Box<dyn BranchRule>) -> Self {
        Self { item }
    }
}

impl Rule for RepeatRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        loop {
            let before = reader.position();
            let Some(taken) = self.item.try_parse(ctx, reader) else {
                break;
            };
            if !self.item.finish(ctx, reader, taken, &Done) {
                return false;
            }
            if reader.position() == before {
                break;
            }
        }
        cont.run(ctx, reader)
    }
}

/// One item followed by any number of separator-item pairs.
///
/// The separator must be a branch; the item may be any rule. When the item
/// is itself a branch and its condition rejects after a separator, the
/// separator is classified as trailing: the error is recoverable and the
/// list ends before it.
#[derive(Debug)]
pub struct ListRule {
    item: Box<dyn Rule>,
    separator: Box<dyn BranchRule>,
    allow_trailing: bool,
}

impl ListRule {
    #[must_use]
    pub fn new(item: Box<dyn Rule>, separator: Box<dyn BranchRule>) -> Self {
        Self {
            item,
            separator,
            allow_trailing: false,
        }
    }

    /// Accept a separator after the last item without reporting an error.
    #[must_use]
    pub fn allow_trailing(mut self) -> Self {
        self.allow_trailing = true;
        self
    }

    fn parse_items(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        if !self.item.parse(ctx, reader, &Done) {
            return false;
        }
        loop {
            let sep_at = reader.position();
            let Some(taken) = self.separator.try_parse(ctx, reader) else {
                return true;
            };
            if !self.separator.finish(ctx, reader, taken, &Done) {
                return false;
            }
            match self.item.as_branch() {
                Some(item) => match item.try_parse(ctx, reader) {
                    Some(taken) => {
                        if !item.finish(ctx, reader, taken, &Done) {
                            return false;
                        }
                    }
                    None => {
                        if !self.allow_trailing {
                            ctx.report(ParseError::new(
                                TextRange::new(sep_at, reader.position()),
                                ParseErrorKind::TrailingSeparator,
                            ));
                        }
                        return true;
                    }
                },
                None => {
                    if !self.item.parse(ctx, reader, &Done) {
                        return false;
                    }
                }
            }
        }
    }
}

impl Rule for ListRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if !self.parse_items(ctx, reader) {
            return false;
        }
        cont.run(ctx, reader)
    }

    fn as_branch(&self) -> Option<&dyn BranchRule> {
        self.item.as_branch().map(|_| self as &dyn BranchRule)
    }
}

impl BranchRule for ListRule {
    fn shape(&self) -> BranchShape {
        self.item
            .as_branch()
            .map_or(BranchShape::Never, BranchRule::shape)
    }

    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        self.item.as_branch()?.try_parse(ctx, reader)
    }

    fn cancel(&self, ctx: &mut Context<'_>, taken: Taken) {
        if let Some(item) = self.item.as_branch() {
            item.cancel(ctx, taken);
        }
    }

    fn finish(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        taken: Taken,
        cont: &dyn Continuation,
    ) -> bool {
        let Some(item) = self.item.as_branch() else {
            debug_assert!(false, "list committed without a branch item");
            return false;
        };
        if !item.finish(ctx, reader, taken, &Done) {
            return false;
        }
        loop {
            let sep_at = reader.position();
            let Some(taken) = self.separator.try_parse(ctx, reader) else {
                return cont.run(ctx, reader);
            };
            if !self.separator.finish(ctx, reader, taken, &Done) {
                return false;
            }
            match item.try_parse(ctx, reader) {
                Some(taken) => {
                    if !item.finish(ctx, reader, taken, &Done) {
                        return false;
                    }
                }
                None => {
                    if !self.allow_trailing {
                        ctx.report(ParseError::new(
                            TextRange::new(sep_at, reader.position()),
                            ParseErrorKind::TrailingSeparator,
                        ));
                    }
                    return cont.run(ctx, reader);
                }
            }
        }
    }
}

/// Two-way conditional: parse the branch when its condition accepts, the
/// fallback otherwise.
#[derive(Debug)]
pub struct IfElse {
    branch: Box<dyn BranchRule>,
    fallback: Box<dyn Rule>,
}

impl IfElse {
    #[must_use]
    pub fn new(branch: Box<dyn BranchRule>, fallback: Box<dyn Rule>) -> Self {
        Self { branch, fallback }
    }
}

impl Rule for IfElse {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        match self.branch.try_parse(ctx, reader) {
            Some(taken) => self.branch.finish(ctx, reader, taken, cont),
            None => self.fallback.parse(ctx, reader, cont),
        }
    }
}

/// Positive lookahead: succeeds when the inner condition would accept,
/// consuming nothing.
///
/// Lookahead input is reported as backtracked immediately; it never
/// contributes tree content, so the report needs no deferral.
#[derive(Debug)]
pub struct PeekRule {
    inner: Box<dyn BranchRule>,
}

impl PeekRule {
    #[must_use]
    pub fn new(inner: Box<dyn BranchRule>) -> Self {
        Self { inner }
    }

    fn probe(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        let begin = reader.position();
        match self.inner.try_parse(ctx, reader) {
            Some(taken) => {
                let end = reader.position();
                self.inner.cancel(ctx, taken);
                reader.set_position(begin);
                if end > begin {
                    ctx.emit_backtracked(TextRange::new(begin, end));
                }
                true
            }
            None => false,
        }
    }
}

impl Rule for PeekRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if self.probe(ctx, reader) {
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

impl BranchRule for PeekRule {
    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        let begin = reader.position();
        self.probe(ctx, reader).then_some(Taken::Empty { begin })
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

/// Negative lookahead: succeeds when the inner condition would reject,
/// consuming nothing.
#[derive(Debug)]
pub struct PeekNotRule {
    inner: Box<dyn BranchRule>,
}

impl PeekNotRule {
    #[must_use]
    pub fn new(inner: Box<dyn BranchRule>) -> Self {
        Self { inner }
    }

    fn probe(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        let begin = reader.position();
        match self.inner.try_parse(ctx, reader) {
            Some(taken) => {
                let end = reader.position();
                self.inner.cancel(ctx, taken);
                reader.set_position(begin);
                if end > begin {
                    ctx.emit_backtracked(TextRange::new(begin, end));
                }
                false
            }
            None => true,
        }
    }
}

impl Rule for PeekNotRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if self.probe(ctx, reader) {
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

impl BranchRule for PeekNotRule {
    fn try_parse(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> Option<Taken> {
        let begin = reader.position();
        self.probe(ctx, reader).then_some(Taken::Empty { begin })
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

/// A forward reference that ties recursive grammars.
///
/// Create the handle first, use clones of it inside the definition, then
/// call [`Recurse::define`] with the finished rule. Recursion depth is
/// bounded by the production guard, not here.
#[derive(Clone, Default)]
pub struct Recurse {
    slot: Rc<RefCell<Option<Rc<dyn Rule>>>>,
}

impl Recurse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&self, rule: Rc<dyn Rule>) {
        *self.slot.borrow_mut() = Some(rule);
    }
}

impl fmt::Debug for Recurse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recurse")
            .field("defined", &self.slot.borrow().is_some())
            .finish()
    }
}

impl Rule for Recurse {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        let rule = self.slot.borrow().clone();
        match rule {
            Some(rule) => rule.parse(ctx, reader, cont),
            None => {
                ctx.report(ParseError::new(
                    TextRange::empty(reader.position()),
                    ParseErrorKind::InvalidSyntax("recursive rule used before definition".into()),
                ));
                false
            }
        }
    }
}
