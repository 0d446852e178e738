//! The input reader.
//!
//! A [`Reader`] is a cheap-to-copy cursor over the input string. Backtracking
//! snapshots are taken by copying the reader; committing or rolling back is an
//! explicit [`Reader::set_position`] to a previously observed position. The
//! position otherwise only moves forward.

use crate::text::{TextRange, TextSize};

/// Copyable cursor over a UTF-8 input.
#[derive(Debug, Clone, Copy)]
pub struct Reader<'i> {
    input: &'i str,
    pos: u32,
}

impl<'i> Reader<'i> {
    /// Create a reader at the start of `input`.
    ///
    /// # Panics
    ///
    /// Panics if the input is longer than `u32::MAX` bytes.
    #[must_use]
    pub fn new(input: &'i str) -> Self {
        assert!(
            u32::try_from(input.len()).is_ok(),
            "input larger than 4 GiB is not supported"
        );
        Self { input, pos: 0 }
    }

    /// Current byte offset.
    #[must_use]
    pub const fn position(&self) -> TextSize {
        TextSize::from(self.pos)
    }

    #[must_use]
    pub const fn input(&self) -> &'i str {
        self.input
    }

    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos as usize >= self.input.len()
    }

    /// The not-yet-consumed tail of the input.
    #[must_use]
    pub fn remainder(&self) -> &'i str {
        &self.input[self.pos as usize..]
    }

    /// Look at the next character without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.remainder().chars().next()
    }

    /// Consume and return the next character.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as u32;
        Some(c)
    }

    /// Reposition the reader.
    ///
    /// Only positions previously observed on a reader over the same input are
    /// valid; the engine never invents positions. Debug builds verify the
    /// target is a character boundary.
    pub fn set_position(&mut self, pos: TextSize) {
        debug_assert!(pos.into() as usize <= self.input.len());
        debug_assert!(self.input.is_char_boundary(pos.into() as usize));
        self.pos = pos.into();
    }

    /// The text covered by `range`.
    #[must_use]
    pub fn slice(&self, range: TextRange) -> &'i str {
        &self.input[range.start().into() as usize..range.end().into() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_advances_by_char() {
        let mut reader = Reader::new("aé!");
        assert_eq!(reader.bump(), Some('a'));
        assert_eq!(reader.position(), TextSize::from(1));
        assert_eq!(reader.bump(), Some('é'));
        assert_eq!(reader.position(), TextSize::from(3));
        assert_eq!(reader.bump(), Some('!'));
        assert!(reader.is_eof());
        assert_eq!(reader.bump(), None);
    }

    #[test]
    fn test_snapshot_and_restore() {
        let mut reader = Reader::new("abc");
        let snapshot = reader;
        reader.bump();
        reader.bump();
        reader.set_position(snapshot.position());
        assert_eq!(reader.peek(), Some('a'));
    }

    #[test]
    fn test_slice() {
        let reader = Reader::new("hello world");
        let range = TextRange::new(TextSize::from(6), TextSize::from(11));
        assert_eq!(reader.slice(range), "world");
    }
}
