//! Byte-offset text positions and spans.
//!
//! All positions produced by the engine are byte offsets into the original
//! UTF-8 input. Spans carry enough information to render caret diagnostics
//! without re-reading the parse.

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text size in bytes (UTF-8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextSize(u32);

/// Text range representing a span of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextRange {
    start: TextSize,
    end: TextSize,
}

impl TextSize {
    #[must_use]
    pub const fn from(offset: u32) -> Self {
        Self(offset)
    }

    #[must_use]
    pub const fn into(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Byte length of a string slice, saturating at `u32::MAX`.
    #[must_use]
    pub fn of(text: &str) -> Self {
        Self(u32::try_from(text.len()).unwrap_or(u32::MAX))
    }
}

impl std::ops::Add<Self> for TextSize {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::AddAssign<Self> for TextSize {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl fmt::Display for TextSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TextRange {
    #[must_use]
    pub const fn new(start: TextSize, end: TextSize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn at(start: TextSize, len: TextSize) -> Self {
        Self::new(start, TextSize(start.0 + len.0))
    }

    /// A zero-length range anchored at `pos`.
    #[must_use]
    pub const fn empty(pos: TextSize) -> Self {
        Self::new(pos, pos)
    }

    #[must_use]
    pub const fn start(self) -> TextSize {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> TextSize {
        self.end
    }

    #[must_use]
    pub const fn len(self) -> TextSize {
        TextSize(self.end.0 - self.start.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    #[must_use]
    pub const fn contains(self, offset: TextSize) -> bool {
        offset.0 >= self.start.0 && offset.0 < self.end.0
    }

    /// Extend this range so it also covers `other`.
    #[must_use]
    pub fn cover(self, other: Self) -> Self {
        Self::new(
            TextSize(self.start.0.min(other.start.0)),
            TextSize(self.end.0.max(other.end.0)),
        )
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.0, self.end.0)
    }
}

#[cfg(feature = "diagnostics")]
impl From<TextRange> for miette::SourceSpan {
    fn from(range: TextRange) -> Self {
        let start = range.start().into() as usize;
        let len = range.len().into() as usize;
        Self::new(start.into(), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_construction() {
        let range = TextRange::at(TextSize::from(3), TextSize::from(4));
        assert_eq!(range.start(), TextSize::from(3));
        assert_eq!(range.end(), TextSize::from(7));
        assert_eq!(range.len(), TextSize::from(4));
        assert!(!range.is_empty());
    }

    #[test]
    fn test_range_contains() {
        let range = TextRange::new(TextSize::from(2), TextSize::from(5));
        assert!(range.contains(TextSize::from(2)));
        assert!(range.contains(TextSize::from(4)));
        assert!(!range.contains(TextSize::from(5)));
    }

    #[test]
    fn test_range_cover() {
        let a = TextRange::new(TextSize::from(2), TextSize::from(5));
        let b = TextRange::new(TextSize::from(4), TextSize::from(9));
        assert_eq!(a.cover(b), TextRange::new(TextSize::from(2), TextSize::from(9)));
    }

    #[test]
    fn test_size_of_str() {
        assert_eq!(TextSize::of("héllo"), TextSize::from(6));
    }
}
