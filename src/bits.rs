//! Bit-level I/O over a stream of 32-bit words.
//!
//! Fields are written LSB-first inside each word: the first bit of a field
//! lands in the lowest unwritten bit of the current word, and writes that
//! cross a word boundary are split. This is the layout the interpolative
//! coder serializes the prelude with, so it is part of the wire format.

use anyhow::{bail, Result};

#[inline(always)]
fn lo_mask(bits: u32) -> u32 {
    match bits {
        32 => u32::MAX,
        _ => (1u32 << bits) - 1,
    }
}

/// Accumulates bit fields into little-endian `u32` words.
///
/// Completed words are emitted in order; a partially filled word is held
/// back until [`flush`](Self::flush) is called, with its unused high bits
/// zeroed.
#[derive(Default)]
pub struct BitWriter {
    words: Vec<u32>,
    cur: u32,
    filled: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes the low `width` bits of `value`, `width` in `[0, 32]`.
    pub fn put_int(&mut self, value: u32, width: u32) {
        debug_assert!(width <= 32);
        if width == 0 {
            return;
        }
        let value = value & lo_mask(width);
        self.cur |= value << self.filled;

        if self.filled + width >= 32 {
            self.words.push(self.cur);
            let consumed = 32 - self.filled;
            self.cur = match consumed >= width {
                true => 0,
                false => value >> consumed,
            };
            self.filled = width - consumed;
        } else {
            self.filled += width;
        }
    }

    /// Emits `x` zero bits followed by a single one bit.
    pub fn write_unary(&mut self, mut x: u32) {
        while x >= 32 {
            self.put_int(0, 32);
            x -= 32;
        }
        self.put_int(1 << x, x + 1);
    }

    /// Completes the pending word, if any, and returns the total number of
    /// bytes emitted so far. Flushing an already flushed stream is a no-op.
    pub fn flush(&mut self) -> usize {
        if self.filled != 0 {
            self.words.push(self.cur);
            self.cur = 0;
            self.filled = 0;
        }
        self.words.len() * 4
    }

    /// The emitted words. Only meaningful after a [`flush`](Self::flush).
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Appends the flushed words to `out` as little-endian bytes and
    /// returns the number of bytes appended.
    pub fn write_to(mut self, out: &mut Vec<u8>) -> usize {
        let bytes = self.flush();
        for word in &self.words {
            out.extend_from_slice(&word.to_le_bytes());
        }
        bytes
    }
}

/// Reads bit fields back from a byte slice interpreted as little-endian
/// `u32` words.
///
/// A word that lies entirely past the end of the input is a malformed
/// stream, reported as an error; a trailing partial word is zero-padded,
/// matching what the writer would have flushed.
pub struct BitReader<'a> {
    input: &'a [u8],
    next_word: usize,
    cur: u32,
    offset: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            next_word: 0,
            cur: 0,
            offset: 32,
        }
    }

    fn fetch_word(&mut self) -> Result<()> {
        let start = self.next_word * 4;
        if start >= self.input.len() {
            bail!("bit stream exhausted while more bits were expected");
        }
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = *self.input.get(start + i).unwrap_or(&0);
        }
        self.cur = u32::from_le_bytes(bytes);
        self.next_word += 1;
        self.offset = 0;
        Ok(())
    }

    /// Returns the next `width` bits, `width` in `[0, 32]`.
    pub fn get_int(&mut self, width: u32) -> Result<u32> {
        debug_assert!(width <= 32);
        if width == 0 {
            return Ok(0);
        }
        if self.offset == 32 {
            self.fetch_word()?;
        }
        let w1 = self.cur >> self.offset;
        let taken = 32 - self.offset;
        if width <= taken {
            self.offset += width;
            return Ok(w1 & lo_mask(width));
        }
        self.fetch_word()?;
        let rest = width - taken;
        self.offset = rest;
        Ok(w1 | ((self.cur & lo_mask(rest)) << taken))
    }

    /// Counts zero bits up to and including the terminating one bit and
    /// returns the number of zeros.
    pub fn read_unary(&mut self) -> Result<u32> {
        let mut zeros = 0u32;
        loop {
            if self.offset == 32 {
                self.fetch_word()?;
            }
            let w = self.cur >> self.offset;
            if w != 0 {
                let r = w.trailing_zeros();
                self.offset += r + 1;
                return Ok(zeros + r);
            }
            zeros += 32 - self.offset;
            self.offset = 32;
        }
    }

    /// How many 32-bit words have been pulled from the input so far.
    pub fn words_consumed(&self) -> usize {
        self.next_word
    }
}
