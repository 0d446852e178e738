//! Parse event handlers.
//!
//! The rule protocol reports every token match and production boundary as an
//! event to the [`Handler`] owned by the parse context. Handlers receive
//! events in strict nesting order and must treat `production_cancel` as
//! "undo everything since the matching `production_start`".
//!
//! Three handlers ship with the engine: [`ValidateSink`] (error sink only),
//! [`TraceSink`] (indented textual event log) and the tree-building sink in
//! [`crate::tree`].

use crate::error::ParseError;
use crate::kind::TokenKind;
use crate::text::{TextRange, TextSize};
use std::fmt::Write as _;

/// Receiver for parse events.
///
/// All methods default to no-ops so a handler only implements the events it
/// cares about.
pub trait Handler {
    /// A production has been entered at `pos`.
    fn production_start(&mut self, _name: &'static str, _pos: TextSize) {}
    /// The production's content matched; `pos` is its end.
    fn production_finish(&mut self, _name: &'static str, _pos: TextSize) {}
    /// The production failed; undo everything since the matching start.
    fn production_cancel(&mut self, _name: &'static str, _pos: TextSize) {}
    /// A token was committed.
    fn token(&mut self, _kind: TokenKind, _range: TextRange) {}
    /// Speculatively consumed input was abandoned.
    fn backtracked(&mut self, _range: TextRange) {}
    /// An error was reported at the point of failure.
    fn error(&mut self, _error: &ParseError) {}
    /// Error recovery started scanning forward.
    fn recovery_start(&mut self, _pos: TextSize) {}
    /// Recovery found a synchronization token.
    fn recovery_finish(&mut self, _pos: TextSize) {}
    /// Recovery hit its limit; the failure propagates.
    fn recovery_cancel(&mut self, _pos: TextSize) {}
    /// An operator chain (expression) opened.
    fn chain_start(&mut self, _pos: TextSize) {}
    /// One operator application completed; its operands are the events since
    /// the chain opened (or since the previous application).
    fn operation(&mut self, _name: &'static str, _pos: TextSize) {}
    /// The operator chain closed.
    fn chain_finish(&mut self, _pos: TextSize) {}
}

/// A handler that ignores everything.
#[derive(Debug, Default)]
pub struct NullHandler;

impl Handler for NullHandler {}

/// Error sink used by the validate action: collects reported errors and
/// counts recovered regions, building no tree.
#[derive(Debug, Default)]
pub struct ValidateSink {
    errors: Vec<ParseError>,
    recovered: usize,
}

impl ValidateSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Number of regions recovery successfully resynchronized.
    #[must_use]
    pub const fn recovered(&self) -> usize {
        self.recovered
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }
}

impl Handler for ValidateSink {
    fn error(&mut self, error: &ParseError) {
        self.errors.push(error.clone());
    }

    fn recovery_finish(&mut self, _pos: TextSize) {
        self.recovered += 1;
    }
}

/// Depth-indented textual log of every event, for grammar debugging.
#[derive(Debug, Default)]
pub struct TraceSink {
    out: String,
    depth: usize,
}

impl TraceSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}

impl Handler for TraceSink {
    fn production_start(&mut self, name: &'static str, pos: TextSize) {
        let mut line = String::new();
        let _ = write!(line, "{name}: start @{pos}");
        self.line(&line);
        self.depth += 1;
    }

    fn production_finish(&mut self, name: &'static str, pos: TextSize) {
        self.depth = self.depth.saturating_sub(1);
        let mut line = String::new();
        let _ = write!(line, "{name}: finish @{pos}");
        self.line(&line);
    }

    fn production_cancel(&mut self, name: &'static str, pos: TextSize) {
        self.depth = self.depth.saturating_sub(1);
        let mut line = String::new();
        let _ = write!(line, "{name}: cancel @{pos}");
        self.line(&line);
    }

    fn token(&mut self, kind: TokenKind, range: TextRange) {
        let mut line = String::new();
        let _ = write!(line, "token {kind} {range}");
        self.line(&line);
    }

    fn backtracked(&mut self, range: TextRange) {
        let mut line = String::new();
        let _ = write!(line, "backtracked {range}");
        self.line(&line);
    }

    fn error(&mut self, error: &ParseError) {
        let mut line = String::new();
        let _ = write!(line, "error {} {}", error.span(), error);
        self.line(&line);
    }

    fn recovery_start(&mut self, pos: TextSize) {
        let mut line = String::new();
        let _ = write!(line, "recovery: start @{pos}");
        self.line(&line);
        self.depth += 1;
    }

    fn recovery_finish(&mut self, pos: TextSize) {
        self.depth = self.depth.saturating_sub(1);
        let mut line = String::new();
        let _ = write!(line, "recovery: finish @{pos}");
        self.line(&line);
    }

    fn recovery_cancel(&mut self, pos: TextSize) {
        self.depth = self.depth.saturating_sub(1);
        let mut line = String::new();
        let _ = write!(line, "recovery: cancel @{pos}");
        self.line(&line);
    }

    fn chain_start(&mut self, pos: TextSize) {
        let mut line = String::new();
        let _ = write!(line, "chain: start @{pos}");
        self.line(&line);
        self.depth += 1;
    }

    fn operation(&mut self, name: &'static str, pos: TextSize) {
        let mut line = String::new();
        let _ = write!(line, "operation {name} @{pos}");
        self.line(&line);
    }

    fn chain_finish(&mut self, pos: TextSize) {
        self.depth = self.depth.saturating_sub(1);
        let mut line = String::new();
        let _ = write!(line, "chain: finish @{pos}");
        self.line(&line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    #[test]
    fn test_validate_sink_collects() {
        let mut sink = ValidateSink::new();
        let err = ParseError::new(
            TextRange::empty(TextSize::from(1)),
            ParseErrorKind::ExhaustedChoices,
        );
        sink.error(&err);
        sink.recovery_start(TextSize::from(1));
        sink.recovery_finish(TextSize::from(3));
        assert_eq!(sink.errors().len(), 1);
        assert_eq!(sink.recovered(), 1);
    }

    #[test]
    fn test_trace_sink_indents() {
        let mut sink = TraceSink::new();
        sink.production_start("list", TextSize::zero());
        sink.token(TokenKind::DIGITS, TextRange::at(TextSize::zero(), TextSize::from(2)));
        sink.production_finish("list", TextSize::from(2));
        let log = sink.finish();
        assert!(log.contains("list: start @0"));
        assert!(log.contains("  token digits 0..2"));
        assert!(log.contains("list: finish @2"));
    }
}
