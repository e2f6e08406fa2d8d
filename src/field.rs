/*!
  Partial fields. A field specification `(L:R)` selects bytes `L` through `R` of a word, where
  byte 0 is the sign. Every load, store, arithmetic and comparison operation goes through
  `extract` or `insert`.

  A field is encoded in an instruction as `F = 8L + R`.
*/

use std::fmt::{Display, Formatter};

use crate::word::{Word, BYTE_BITS, WORD_BYTES};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldSpec {
  left  : u8,
  right : u8
}

impl FieldSpec {
  /// The whole word, `(0:5)`.
  pub const WHOLE: FieldSpec = FieldSpec{ left: 0, right: 5 };
  /// The address part of an instruction, `(0:2)`.
  pub const ADDRESS: FieldSpec = FieldSpec{ left: 0, right: 2 };

  /// Returns `None` unless `0 <= left <= right <= 5`.
  pub fn new(left: u8, right: u8) -> Option<FieldSpec> {
    match left <= right && right as usize <= WORD_BYTES {
      true  => Some(FieldSpec{ left, right }),
      false => None
    }
  }

  /// Decodes `F = 8L + R`.
  pub fn from_code(code: u8) -> Option<FieldSpec> {
    FieldSpec::new(code / 8, code % 8)
  }

  pub fn code(self) -> u8 {
    8 * self.left + self.right
  }

  pub fn left(self) -> u8 {
    self.left
  }

  pub fn right(self) -> u8 {
    self.right
  }

  pub fn includes_sign(self) -> bool {
    self.left == 0
  }

  /// The first magnitude byte in the field, if the field has any.
  fn first_byte(self) -> Option<u8> {
    let first = self.left.max(1);
    match first <= self.right {
      true  => Some(first),
      false => None
    }
  }

  /// Number of magnitude bytes selected. `(0:0)` selects none.
  pub fn byte_count(self) -> u32 {
    match self.first_byte() {
      Some(first) => (self.right - first + 1) as u32,
      None        => 0
    }
  }

  /// Distance the field's rightmost byte sits from the low end of the word.
  fn shift(self) -> u32 {
    (WORD_BYTES as u32 - self.right as u32) * BYTE_BITS
  }

  /// Mask of the right-justified field bytes.
  fn low_mask(self) -> u32 {
    (1u32 << (self.byte_count() * BYTE_BITS)) - 1
  }
}

impl Default for FieldSpec {
  fn default() -> FieldSpec {
    FieldSpec::WHOLE
  }
}

impl Display for FieldSpec {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "({}:{})", self.left, self.right)
  }
}

/**
  Copies the field out of `word`, shifted so that byte `R` lands in byte 5. The sign of the
  result is the sign of `word` if the field includes it and `+` otherwise. For `(0:0)` only the
  sign is copied.
*/
pub fn extract(word: Word, field: FieldSpec) -> Word {
  let negative  = field.includes_sign() && word.is_negative();
  let magnitude = (word.magnitude() >> field.shift()) & field.low_mask();
  Word::new(negative, magnitude)
}

/**
  Stores the low `R - max(L, 1) + 1` bytes of `source` into bytes `L..R` of `word`. The sign of
  `word` is replaced by the sign of `source` only when `L = 0`. Bytes outside the field are
  untouched.
*/
pub fn insert(word: Word, field: FieldSpec, source: Word) -> Word {
  let negative = match field.includes_sign() {
    true  => source.is_negative(),
    false => word.is_negative()
  };
  let mask      = field.low_mask() << field.shift();
  let bytes     = (source.magnitude() & field.low_mask()) << field.shift();
  let magnitude = (word.magnitude() & !mask) | bytes;
  Word::new(negative, magnitude)
}
