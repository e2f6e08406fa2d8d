/*!
  The MIX word: a sign and five 6-bit bytes, packed into the low 31 bits of a `u32`.

  ```text
   3          2         1
   0 987654 321098 765432 109876 543210
   ± 111111 222222 333333 444444 555555
  ```

  Byte 0 is the sign. A `Word` compares by its signed numeric value, so a minus zero is equal
  to a plus zero everywhere, including in hashing. Use `Word::bits` when the exact
  representation matters.
*/

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Bits per MIX byte.
pub const BYTE_BITS: u32 = 6;
/// Number of distinct values of a MIX byte.
pub const BYTE_SIZE: u32 = 1 << BYTE_BITS;
pub const BYTE_MASK: u32 = BYTE_SIZE - 1;
/// Magnitude bytes per word. The sign is not counted.
pub const WORD_BYTES: usize = 5;
pub const SIGN_BIT: u32 = 1 << (BYTE_BITS * WORD_BYTES as u32);
pub const MAGNITUDE_MASK: u32 = SIGN_BIT - 1;
/// The largest magnitude a word can hold, 64^5 - 1.
pub const MAX_MAGNITUDE: u32 = MAGNITUDE_MASK;
pub const WORD_MASK: u32 = SIGN_BIT | MAGNITUDE_MASK;

#[derive(Copy, Clone, Debug, Default)]
pub struct Word(u32);

impl Word {
  pub const ZERO: Word = Word(0);

  /// Reinterprets a packed cell. Bits above the sign are discarded.
  pub fn from_bits(bits: u32) -> Word {
    Word(bits & WORD_MASK)
  }

  pub fn bits(self) -> u32 {
    self.0
  }

  pub fn new(negative: bool, magnitude: u32) -> Word {
    let sign = if negative { SIGN_BIT } else { 0 };
    Word(sign | (magnitude & MAGNITUDE_MASK))
  }

  /// Builds a word from its sign and bytes 1 through 5. Each byte is taken modulo 64.
  pub fn from_bytes(negative: bool, bytes: [u8; WORD_BYTES]) -> Word {
    let magnitude =
      bytes.iter()
           .fold(0u32, |acc, byte| (acc << BYTE_BITS) | (*byte as u32 & BYTE_MASK));
    Word::new(negative, magnitude)
  }

  /// Returns `None` if the value does not fit in five bytes.
  pub fn from_value(value: i64) -> Option<Word> {
    match value.unsigned_abs() <= MAX_MAGNITUDE as u64 {
      true  => Some(Word::new(value < 0, value.unsigned_abs() as u32)),
      false => None
    }
  }

  /// Keeps the low five bytes of the magnitude. The flag reports whether anything was lost.
  pub fn from_value_truncated(value: i64) -> (Word, bool) {
    let magnitude = value.unsigned_abs();
    let overflow  = magnitude > MAX_MAGNITUDE as u64;
    (Word::new(value < 0, (magnitude & MAGNITUDE_MASK as u64) as u32), overflow)
  }

  pub fn is_negative(self) -> bool {
    self.0 & SIGN_BIT != 0
  }

  pub fn magnitude(self) -> u32 {
    self.0 & MAGNITUDE_MASK
  }

  pub fn is_zero(self) -> bool {
    self.magnitude() == 0
  }

  /// The signed value. Both zeros map to `0`.
  pub fn value(self) -> i64 {
    match self.is_negative() {
      true  => -(self.magnitude() as i64),
      false => self.magnitude() as i64
    }
  }

  /// Byte `k` for `1 <= k <= 5`.
  pub fn byte(self, k: usize) -> u8 {
    debug_assert!((1..=WORD_BYTES).contains(&k));
    ((self.0 >> ((WORD_BYTES - k) as u32 * BYTE_BITS)) & BYTE_MASK) as u8
  }

  pub fn bytes(self) -> [u8; WORD_BYTES] {
    let mut bytes = [0u8; WORD_BYTES];
    for (i, byte) in bytes.iter_mut().enumerate() {
      *byte = self.byte(i + 1);
    }
    bytes
  }

  pub fn with_sign(self, negative: bool) -> Word {
    Word::new(negative, self.magnitude())
  }

  /// Same sign, new magnitude.
  pub fn with_magnitude(self, magnitude: u32) -> Word {
    Word::new(self.is_negative(), magnitude)
  }

  pub fn negated(self) -> Word {
    Word(self.0 ^ SIGN_BIT)
  }

  /// True if the representations are identical, distinguishing the two zeros.
  pub fn same_bits(self, other: Word) -> bool {
    self.0 == other.0
  }
}

impl PartialEq for Word {
  fn eq(&self, other: &Word) -> bool {
    self.value() == other.value()
  }
}

impl Eq for Word {}

impl Hash for Word {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.value().hash(state);
  }
}

impl PartialOrd for Word {
  fn partial_cmp(&self, other: &Word) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Word {
  fn cmp(&self, other: &Word) -> Ordering {
    self.value().cmp(&other.value())
  }
}

impl Display for Word {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let sign = match self.is_negative() {
      true  => '-',
      false => '+'
    };
    write!(f, "{}", sign)?;
    for byte in self.bytes().iter() {
      write!(f, " {:02}", byte)?;
    }
    Ok(())
  }
}

impl From<u32> for Word {
  fn from(bits: u32) -> Word {
    Word::from_bits(bits)
  }
}
