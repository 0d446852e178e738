//! Token kind identifiers.
//!
//! Token kinds are plain numeric tags. A handful of kinds are reserved for
//! the engine itself (error, whitespace, unknown, end-of-file and the common
//! lexical categories); user grammars allocate their own kinds with
//! [`TokenKind::of`].

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for the lexical category of a token in the parse tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TokenKind(u16);

impl TokenKind {
    /// Token covering input discarded during error recovery.
    pub const ERROR: Self = Self(0);
    /// Token emitted for automatically skipped whitespace.
    pub const WHITESPACE: Self = Self(1);
    /// Token whose category could not be determined.
    pub const UNKNOWN: Self = Self(2);
    /// Zero-length token at the end of the input.
    pub const EOF: Self = Self(3);
    /// A run of digits.
    pub const DIGITS: Self = Self(4);
    /// An identifier.
    pub const IDENTIFIER: Self = Self(5);
    /// A literal.
    pub const LITERAL: Self = Self(6);
    /// An operator symbol.
    pub const OPERATOR: Self = Self(7);
    /// A bracketing or punctuation symbol.
    pub const DELIMITER: Self = Self(8);

    /// First id available to user grammars.
    const FIRST_USER: u16 = 32;

    /// Largest id accepted by [`TokenKind::of`].
    pub const MAX_USER_ID: u16 = u16::MAX - Self::FIRST_USER;

    /// A user-defined token kind. Ids are namespaced away from the
    /// reserved kinds, so `of(0)` is distinct from [`TokenKind::ERROR`].
    ///
    /// # Panics
    ///
    /// Panics if `id` exceeds [`TokenKind::MAX_USER_ID`].
    #[must_use]
    pub const fn of(id: u16) -> Self {
        assert!(id <= Self::MAX_USER_ID, "user token kind id out of range");
        Self(id + Self::FIRST_USER)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }

    /// Trivia kinds are elided from the tree when zero-length.
    #[must_use]
    pub const fn is_trivia(self) -> bool {
        matches!(self.0, 0..=2)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ERROR => write!(f, "error"),
            Self::WHITESPACE => write!(f, "whitespace"),
            Self::UNKNOWN => write!(f, "unknown"),
            Self::EOF => write!(f, "eof"),
            Self::DIGITS => write!(f, "digits"),
            Self::IDENTIFIER => write!(f, "identifier"),
            Self::LITERAL => write!(f, "literal"),
            Self::OPERATOR => write!(f, "operator"),
            Self::DELIMITER => write!(f, "delimiter"),
            Self(n) => write!(f, "token#{n}"),
        }
    }
}
