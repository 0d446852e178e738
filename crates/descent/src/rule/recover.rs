//! Error recovery: failure barriers, synchronization scans and recovery
//! alternations.
//!
//! Recovery never runs after a fatal error: once the depth guard has
//! latched the context, every recovery construct refuses to resume and the
//! failure propagates to the action layer.
//!
//! Input skipped while scanning for a synchronization point is committed as
//! a single error-kind token, so the surviving parse tree still covers every
//! byte of input.

use super::{BranchRule, Continuation, Done, Rule, Taken};
use crate::context::Context;
use crate::input::Reader;
use crate::kind::TokenKind;
use crate::text::TextRange;

/// Failure barrier: parse the inner rule, and on a recoverable failure run
/// the fallback and continue as if the inner rule had matched.
///
/// The inner rule's error has already been reported when the fallback runs;
/// the barrier only bounds how far the failure unwinds.
#[derive(Debug)]
pub struct TryRule {
    inner: Box<dyn Rule>,
    fallback: Option<Box<dyn Rule>>,
}

impl TryRule {
    #[must_use]
    pub fn new(inner: Box<dyn Rule>) -> Self {
        Self {
            inner,
            fallback: None,
        }
    }

    #[must_use]
    pub fn with_fallback(inner: Box<dyn Rule>, fallback: Box<dyn Rule>) -> Self {
        Self {
            inner,
            fallback: Some(fallback),
        }
    }
}

impl Rule for TryRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if self.inner.parse(ctx, reader, &Done) {
            return cont.run(ctx, reader);
        }
        if ctx.is_fatal() {
            return false;
        }
        if let Some(fallback) = &self.fallback {
            if !fallback.parse(ctx, reader, &Done) {
                return false;
            }
        }
        cont.run(ctx, reader)
    }
}

/// Skips input until one of the synchronization conditions would accept,
/// leaving the synchronization token unconsumed.
#[derive(Debug)]
pub struct FindRule {
    sync: Vec<Box<dyn BranchRule>>,
    limit: u32,
}

impl FindRule {
    #[must_use]
    pub fn new(sync: Vec<Box<dyn BranchRule>>) -> Self {
        Self {
            sync,
            limit: u32::MAX,
        }
    }

    /// Bound the scan to at most `limit` skipped characters.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    fn found_here(&self, ctx: &mut Context<'_>, reader: &mut Reader<'_>) -> bool {
        let begin = reader.position();
        for sync in &self.sync {
            if let Some(taken) = sync.try_parse(ctx, reader) {
                let end = reader.position();
                sync.cancel(ctx, taken);
                reader.set_position(begin);
                if end > begin {
                    ctx.emit_backtracked(TextRange::new(begin, end));
                }
                return true;
            }
        }
        false
    }
}

impl Rule for FindRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if ctx.is_fatal() {
            return false;
        }
        let begin = reader.position();
        ctx.handler().recovery_start(begin);

        let mut skipped = 0u32;
        loop {
            if self.found_here(ctx, reader) {
                let pos = reader.position();
                if pos > begin {
                    ctx.emit_token(TokenKind::ERROR, TextRange::new(begin, pos));
                }
                ctx.handler().recovery_finish(pos);
                return cont.run(ctx, reader);
            }
            if reader.is_eof() || skipped >= self.limit {
                reader.set_position(begin);
                ctx.handler().recovery_cancel(reader.position());
                return false;
            }
            reader.bump();
            skipped += 1;
        }
    }
}

/// Skips input until one of the recovery branches accepts, then parses that
/// branch and continues.
#[derive(Debug)]
pub struct RecoverRule {
    branches: Vec<Box<dyn BranchRule>>,
    limit: u32,
}

impl RecoverRule {
    #[must_use]
    pub fn new(branches: Vec<Box<dyn BranchRule>>) -> Self {
        Self {
            branches,
            limit: u32::MAX,
        }
    }

    /// Bound the scan to at most `limit` skipped characters.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

impl Rule for RecoverRule {
    fn parse(
        &self,
        ctx: &mut Context<'_>,
        reader: &mut Reader<'_>,
        cont: &dyn Continuation,
    ) -> bool {
        if ctx.is_fatal() {
            return false;
        }
        let begin = reader.position();
        ctx.handler().recovery_start(begin);

        let mut skipped = 0u32;
        loop {
            for branch in &self.branches {
                if let Some(taken) = branch.try_parse(ctx, reader) {
                    let sync_at = taken.begin();
                    if sync_at > begin {
                        ctx.emit_token(TokenKind::ERROR, TextRange::new(begin, sync_at));
                    }
                    ctx.handler().recovery_finish(sync_at);
                    return branch.finish(ctx, reader, taken, cont);
                }
            }
            if reader.is_eof() || skipped >= self.limit {
                reader.set_position(begin);
                ctx.handler().recovery_cancel(reader.position());
                return false;
            }
            reader.bump();
            skipped += 1;
        }
    }
}
