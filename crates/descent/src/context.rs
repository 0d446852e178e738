//! The per-parse control state.
//!
//! A [`Context`] is created at parse start, threaded mutably through every
//! rule, and destroyed at parse end. It owns no input and no tree: it holds
//! the event handler, the recursion-depth guard, the whitespace-skipping
//! flag, an optional read-only side state, and the context-variable side
//! table. A context must never be shared across concurrent parses; running
//! independent parses on different threads is safe because there is no
//! global state anywhere in the engine.

use crate::error::{ParseError, ParseErrorKind};
use crate::handler::Handler;
use crate::input::Reader;
use crate::kind::TokenKind;
use crate::rule::TokenRule;
use crate::text::{TextRange, TextSize};
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::any::{Any, TypeId};

/// Default maximum recursion depth.
pub const DEFAULT_MAX_DEPTH: u32 = 1024;

/// Counters collected over one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Tokens committed (including whitespace and error tokens).
    pub tokens: usize,
    /// Probes that consumed input and rolled it back: lookahead and
    /// recovery synchronization scans. Rejected branch conditions leave the
    /// reader untouched and are not counted.
    pub backtracks: usize,
    /// Errors reported.
    pub errors: usize,
    /// Deepest production/operator nesting observed.
    pub max_depth: u32,
}

/// A dynamically scoped context variable.
///
/// Variables are keyed by the [`TypeId`] of a user-declared marker type and
/// live on a per-key scope stack, so nested regions that declare the same
/// variable shadow the outer one and speculative pushes can be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarValue {
    /// A signed counter.
    Counter(i64),
    /// A boolean flag.
    Flag(bool),
    /// A captured span of input.
    Span(TextRange),
}

/// Side table of context variables.
#[derive(Debug, Default)]
pub struct ContextVars {
    table: HashMap<TypeId, SmallVec<[VarValue; 2]>>,
}

impl ContextVars {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new scope for `key`.
    pub fn push(&mut self, key: TypeId, value: VarValue) {
        self.table.entry(key).or_default().push(value);
    }

    /// Pop the innermost scope for `key`.
    pub fn pop(&mut self, key: TypeId) -> Option<VarValue> {
        self.table.get_mut(&key)?.pop()
    }

    /// The innermost value for `key`.
    #[must_use]
    pub fn get(&self, key: TypeId) -> Option<VarValue> {
        self.table.get(&key)?.last().copied()
    }

    /// Mutable access to the innermost value for `key`.
    pub fn get_mut(&mut self, key: TypeId) -> Option<&mut VarValue> {
        self.table.get_mut(&key)?.last_mut()
    }
}

/// The control state threaded through one parse.
pub struct Context<'h> {
    handler: &'h mut dyn Handler,
    side_state: Option<&'h dyn Any>,
    vars: ContextVars,
    whitespace: Option<&'h dyn TokenRule>,
    whitespace_enabled: bool,
    depth: u32,
    max_depth: u32,
    fatal: bool,
    stats: ParseStats,
}

impl<'h> Context<'h> {
    #[must_use]
    pub fn new(handler: &'h mut dyn Handler) -> Self {
        Self {
            handler,
            side_state: None,
            vars: ContextVars::new(),
            whitespace: None,
            whitespace_enabled: true,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            fatal: false,
            stats: ParseStats::default(),
        }
    }

    /// Attach a read-only side state, retrievable with [`Context::side_state`].
    pub fn set_side_state(&mut self, state: &'h dyn Any) {
        self.side_state = Some(state);
    }

    /// Downcast the attached side state.
    #[must_use]
    pub fn side_state<T: 'static>(&self) -> Option<&T> {
        self.side_state?.downcast_ref()
    }

    /// Configure the token rule used for automatic whitespace skipping.
    pub fn set_whitespace(&mut self, rule: &'h dyn TokenRule) {
        self.whitespace = Some(rule);
    }

    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.max_depth = max_depth;
    }

    #[must_use]
    pub const fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether a fatal error has latched. Once set, no recovery construct
    /// may resume the parse.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.fatal
    }

    #[must_use]
    pub const fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn vars(&mut self) -> &mut ContextVars {
        &mut self.vars
    }

    #[must_use]
    pub const fn vars_ref(&self) -> &ContextVars {
        &self.vars
    }

    /// Direct access to the event handler.
    pub fn handler(&mut self) -> &mut dyn Handler {
        self.handler
    }

    /// Report an error to the handler. Fatal kinds latch the context so
    /// recovery constructs refuse to resume.
    pub fn report(&mut self, error: ParseError) {
        self.stats.errors += 1;
        if error.is_fatal() {
            self.fatal = true;
        }
        self.handler.error(&error);
    }

    /// Commit a token event.
    pub fn emit_token(&mut self, kind: TokenKind, range: TextRange) {
        self.stats.tokens += 1;
        self.handler.token(kind, range);
    }

    /// Record abandoned speculative input.
    pub fn emit_backtracked(&mut self, range: TextRange) {
        self.stats.backtracks += 1;
        self.handler.backtracked(range);
    }

    /// Enter a nested region guarded by the depth limit. On overflow the
    /// given capacity error is reported as fatal and `false` is returned;
    /// callers must fail without attempting recovery.
    pub fn enter_guarded(&mut self, at: TextSize, overflow: ParseErrorKind) -> bool {
        if self.depth >= self.max_depth {
            self.report(ParseError::new(TextRange::empty(at), overflow));
            return false;
        }
        self.depth += 1;
        self.stats.max_depth = self.stats.max_depth.max(self.depth);
        true
    }

    /// Leave a region entered with [`Context::enter_guarded`]. Called on
    /// every exit path, success or failure.
    pub fn exit_guarded(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Whether automatic whitespace skipping is currently enabled.
    #[must_use]
    pub const fn whitespace_enabled(&self) -> bool {
        self.whitespace_enabled
    }

    /// Toggle whitespace skipping, returning the previous setting.
    pub fn set_whitespace_enabled(&mut self, enabled: bool) -> bool {
        std::mem::replace(&mut self.whitespace_enabled, enabled)
    }

    /// Skip whitespace at the current position, emitting each skipped run as
    /// a `WHITESPACE`-kind token so the parse stays lossless.
    pub fn skip_whitespace(&mut self, reader: &mut Reader<'_>) {
        if !self.whitespace_enabled {
            return;
        }
        let Some(ws) = self.whitespace else { return };
        loop {
            let begin = reader.position();
            match ws.scan(reader) {
                Some(_) if reader.position() > begin => {
                    self.emit_token(
                        TokenKind::WHITESPACE,
                        TextRange::new(begin, reader.position()),
                    );
                }
                _ => break,
            }
        }
    }
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.depth)
            .field("max_depth", &self.max_depth)
            .field("whitespace_enabled", &self.whitespace_enabled)
            .field("fatal", &self.fatal)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
