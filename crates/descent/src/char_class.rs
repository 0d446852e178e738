//! Character classes.
//!
//! A [`CharSet`] is a named union of inclusive character ranges. Character
//! classes back the leaf token rules and the trie's keyword-trailing
//! rejection; the full catalog of Unicode categories is out of scope, only
//! the ASCII classes the engine itself needs are provided.

use smallvec::SmallVec;

/// A set of characters described by inclusive ranges.
#[derive(Debug, Clone)]
pub struct CharSet {
    name: &'static str,
    ranges: SmallVec<[(char, char); 4]>,
}

impl CharSet {
    /// Create a character set from inclusive ranges.
    #[must_use]
    pub fn new(name: &'static str, ranges: &[(char, char)]) -> Self {
        Self {
            name,
            ranges: ranges.iter().copied().collect(),
        }
    }

    /// `[0-9]`
    #[must_use]
    pub fn ascii_digit() -> Self {
        Self::new("digit", &[('0', '9')])
    }

    /// `[a-zA-Z]`
    #[must_use]
    pub fn ascii_alpha() -> Self {
        Self::new("letter", &[('a', 'z'), ('A', 'Z')])
    }

    /// `[a-zA-Z0-9]`
    #[must_use]
    pub fn ascii_alnum() -> Self {
        Self::new("letter or digit", &[('a', 'z'), ('A', 'Z'), ('0', '9')])
    }

    /// Space, tab, carriage return and newline.
    #[must_use]
    pub fn ascii_whitespace() -> Self {
        Self::new(
            "whitespace",
            &[(' ', ' '), ('\t', '\t'), ('\r', '\r'), ('\n', '\n')],
        )
    }

    /// Characters that may start an identifier: `[a-zA-Z_]`.
    #[must_use]
    pub fn identifier_lead() -> Self {
        Self::new("identifier", &[('a', 'z'), ('A', 'Z'), ('_', '_')])
    }

    /// Characters that may continue an identifier: `[a-zA-Z0-9_]`.
    #[must_use]
    pub fn identifier_rest() -> Self {
        Self::new(
            "identifier character",
            &[('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')],
        )
    }

    /// Human-readable name used in "expected ..." diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Check if a character belongs to this set.
    #[must_use]
    pub fn matches(&self, c: char) -> bool {
        self.ranges.iter().any(|&(start, end)| c >= start && c <= end)
    }
}
