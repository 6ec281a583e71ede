//! A simple MSB-first bit reader.

/// A bit reader.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    cur_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cur_pos: 0 }
    }

    /// Align the reader to the next byte boundary.
    #[inline]
    pub fn align(&mut self) {
        let bit_pos = self.cur_pos % 8;

        if bit_pos != 0 {
            self.cur_pos += 8 - bit_pos;
        }
    }

    /// Seek to an absolute bit position.
    #[inline]
    pub fn seek(&mut self, bit_pos: usize) {
        self.cur_pos = bit_pos;
    }

    /// Read the given number of bits (at most 32).
    ///
    /// Returns `None` if `bit_size` > 32 or if not enough data is left.
    #[inline]
    pub fn read(&mut self, bit_size: u8) -> Option<u32> {
        if bit_size > 32 {
            return None;
        }

        if bit_size == 0 {
            return Some(0);
        }

        let byte_pos = self.cur_pos / 8;
        let bit_pos = self.cur_pos % 8;
        let end_byte_pos = (bit_pos + bit_size as usize - 1) / 8;
        let mut read = [0_u8; 8];

        for (i, r) in read.iter_mut().enumerate().take(end_byte_pos + 1) {
            *r = *self.data.get(byte_pos + i)?;
        }

        let item = (u64::from_be_bytes(read) >> (64 - bit_pos - bit_size as usize)) as u32
            & bit_mask(bit_size);
        self.cur_pos += bit_size as usize;

        Some(item)
    }

    /// Whether all bits have been consumed.
    pub fn at_end(&self) -> bool {
        self.cur_pos / 8 >= self.data.len()
    }

    /// The current position in bits.
    #[inline]
    pub fn cur_pos(&self) -> usize {
        self.cur_pos
    }
}

/// Get the mask for the given bit size.
#[inline]
pub fn bit_mask(bit_size: u8) -> u32 {
    ((1_u64 << bit_size as u64) - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_widths() {
        let data = [0b1011_0011, 0b0101_1100, 0xFF, 0x00];
        let mut r = BitReader::new(&data);

        assert_eq!(r.read(1), Some(1));
        assert_eq!(r.read(2), Some(0b01));
        assert_eq!(r.read(12), Some(0b1_0011_0101_110));
        assert_eq!(r.read(1), Some(0));
        assert_eq!(r.read(16), Some(0xFF00));
        assert_eq!(r.read(1), None);
    }

    #[test]
    fn full_words() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A];
        let mut r = BitReader::new(&data);

        assert_eq!(r.read(32), Some(0x1234_5678));
        assert_eq!(r.read(4), Some(0x9));
        r.align();
        assert!(r.at_end());
        assert_eq!(r.read(33), None);
    }
}
