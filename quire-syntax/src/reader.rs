//! A byte reader.

use crate::trivia::{is_eol_character, is_white_space_character};
use std::ops::Range;

/// A cursor over a byte slice.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a new reader.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self::new_with(data, 0)
    }

    /// Create a new reader at the given offset.
    #[inline]
    pub fn new_with(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    /// The underlying data.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns `true` if the reader has reached the end of the data.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Moves the reader to the specified offset.
    #[inline]
    pub fn jump(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Returns the current offset of the reader.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the remaining data from the current offset to the end.
    #[inline]
    pub fn tail(&self) -> &'a [u8] {
        self.data.get(self.offset..).unwrap_or_default()
    }

    /// Returns a slice of the data for the specified range.
    #[inline]
    pub fn range(&self, range: Range<usize>) -> Option<&'a [u8]> {
        self.data.get(range)
    }

    /// Reads the specified number of bytes and advances the offset.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let v = self.peek_bytes(len)?;
        self.offset += len;

        Some(v)
    }

    /// Reads a single byte and advances the offset.
    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        let v = self.peek_byte()?;
        self.offset += 1;

        Some(v)
    }

    /// Peeks the specified number of bytes.
    #[inline]
    pub fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        self.data.get(self.offset..self.offset.checked_add(len)?)
    }

    /// Peeks a single byte.
    #[inline]
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Peeks the byte `n` positions after the current one.
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<u8> {
        self.data.get(self.offset + n).copied()
    }

    /// Advances the offset by one byte.
    #[inline]
    pub fn forward(&mut self) {
        self.offset += 1;
    }

    /// Eat the next byte if it satisfies the condition.
    #[inline]
    pub fn eat(&mut self, f: impl Fn(u8) -> bool) -> Option<u8> {
        let val = self.peek_byte()?;

        if f(val) {
            self.forward();
            Some(val)
        } else {
            None
        }
    }

    /// Advances the offset while bytes satisfy the predicate.
    #[inline]
    pub fn forward_while(&mut self, f: impl Fn(u8) -> bool) {
        while let Some(b) = self.peek_byte() {
            if f(b) {
                self.forward();
            } else {
                break;
            }
        }
    }

    /// Advances the offset if the next bytes match the specified tag.
    #[inline]
    pub fn forward_tag(&mut self, tag: &[u8]) -> Option<()> {
        if self.peek_tag(tag) {
            self.offset += tag.len();
            Some(())
        } else {
            None
        }
    }

    /// Checks if the next bytes match the specified tag.
    #[inline]
    pub fn peek_tag(&self, tag: &[u8]) -> bool {
        self.tail().starts_with(tag)
    }

    /// Skip PDF white space characters.
    #[inline]
    pub fn skip_white_spaces(&mut self) {
        self.forward_while(is_white_space_character);
    }

    /// Skip white space characters and `%` comments.
    pub fn skip_white_spaces_and_comments(&mut self) {
        loop {
            self.skip_white_spaces();

            if self.peek_byte() == Some(b'%') {
                self.forward_while(|b| !is_eol_character(b));
            } else {
                return;
            }
        }
    }

    /// Read an unsigned decimal integer.
    pub fn read_unsigned(&mut self) -> Option<u64> {
        let start = self.offset;
        self.forward_while(|b| b.is_ascii_digit());
        let digits = self.data.get(start..self.offset)?;

        if digits.is_empty() {
            return None;
        }

        digits.iter().try_fold(0u64, |acc, d| {
            acc.checked_mul(10)?.checked_add((d - b'0') as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Reader;

    #[test]
    fn tags_and_digits() {
        let mut r = Reader::new(b"  % comment\n 0012 rest");
        r.skip_white_spaces_and_comments();
        assert_eq!(r.read_unsigned(), Some(12));
        assert!(r.forward_tag(b" rest").is_some());
        assert!(r.at_end());
        assert_eq!(r.read_byte(), None);
    }

    #[test]
    fn peek_past_end() {
        let r = Reader::new(b"ab");
        assert_eq!(r.peek_bytes(3), None);
        assert_eq!(r.peek_nth(1), Some(b'b'));
        assert_eq!(r.peek_nth(2), None);
    }
}
