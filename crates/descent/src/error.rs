//! Error types.
//!
//! Every failure the engine can report is a [`ParseError`]: a source span
//! plus a [`ParseErrorKind`] tag. Errors carry enough positional data to
//! render a caret diagnostic without re-parsing. When the `diagnostics`
//! feature is enabled the types integrate with [`miette`] for rich reports.
//!
//! The taxonomy follows four families:
//!
//! - *token-level*: a literal, keyword or character class did not match;
//! - *structural*: exhausted alternatives, trailing separators, operator
//!   group or chaining violations;
//! - *capacity*: recursion/nesting depth and integer overflow — the depth
//!   errors are fatal and never enter recovery;
//! - *semantic*: reserved identifiers, duplicate combination entries,
//!   unequal counters, mismatched captured identifiers.

use crate::text::TextRange;
use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// A positioned parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("{kind}")]
pub struct ParseError {
    #[cfg_attr(feature = "diagnostics", label("here"))]
    pub range: TextRange,
    #[source]
    pub kind: ParseErrorKind,
}

impl ParseError {
    #[must_use]
    pub const fn new(range: TextRange, kind: ParseErrorKind) -> Self {
        Self { range, kind }
    }

    /// The span the error applies to.
    #[must_use]
    pub const fn span(&self) -> TextRange {
        self.range
    }

    /// Fatal errors abort the parse and are never caught by recovery
    /// constructs, to bound native stack usage.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseErrorKind {
    #[error("expected literal `{0}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::expected_literal)))]
    ExpectedLiteral(CompactString),

    #[error("expected keyword `{0}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::expected_keyword)))]
    ExpectedKeyword(CompactString),

    #[error("expected {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::expected_char_class)))]
    ExpectedCharClass(&'static str),

    #[error("expected end of input")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::expected_eof)))]
    ExpectedEof,

    #[error("no alternative matched")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::exhausted_choices)))]
    ExhaustedChoices,

    #[error("lookahead failed")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::lookahead)))]
    LookaheadFailed,

    #[error("unexpected trailing separator")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::trailing_separator)))]
    TrailingSeparator,

    #[error("operator belongs to a different group; parenthesize the sub-expression")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::operator_group)))]
    OperatorGroupMismatch,

    #[error("operator cannot be chained")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::operator_chain)))]
    SingleOperatorRepeated,

    #[error("maximum recursion depth exceeded")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::recursion_limit)))]
    RecursionLimitExceeded,

    #[error("maximum expression nesting exceeded")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::nesting_limit)))]
    NestingLimitExceeded,

    #[error("integer overflow")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::integer_overflow)))]
    IntegerOverflow,

    #[error("reserved identifier `{0}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::reserved_identifier)))]
    ReservedIdentifier(CompactString),

    #[error("duplicate entry in combination")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::duplicate_entry)))]
    DuplicateCombinationEntry,

    #[error("counters are unequal")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::unequal_counters)))]
    UnequalCounters,

    #[error("identifier does not match earlier occurrence")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::mismatched_identifier)))]
    MismatchedIdentifier,

    #[error("production combines {expected} values, {found} produced")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::value_arity)))]
    ValueArityMismatch { expected: usize, found: usize },

    #[error("invalid syntax: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(descent::invalid_syntax)))]
    InvalidSyntax(CompactString),
}

impl ParseErrorKind {
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RecursionLimitExceeded | Self::NestingLimitExceeded
        )
    }
}
