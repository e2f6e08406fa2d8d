//! A signed MIX address. Like a word, an address is sign and magnitude, so there is a minus
//! zero. Minus zero and plus zero are equal as numbers, but the sign survives indexing and
//! packing, which matters to `ENTA`/`ENNA` and friends.

use std::ops::Add;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use crate::word::{Word, BYTE_BITS};

/// Largest magnitude of the two-byte address part of an instruction.
pub const MAX_ADDRESS: u32 = (1 << (2 * BYTE_BITS)) - 1;

/// Equality and hashing are by value, so minus zero equals plus zero. Use `same_bits` to tell
/// them apart.
#[derive(Copy, Clone, Debug, Default)]
pub struct Address {
  pub negative  : bool,
  pub magnitude : u32
}

impl Address {
  pub fn new(negative: bool, magnitude: u32) -> Address {
    Address{ negative, magnitude }
  }

  /// A zero value is given a plus sign.
  pub fn from_value(value: i64) -> Address {
    Address::new(value < 0, value.unsigned_abs() as u32)
  }

  pub fn value(&self) -> i64 {
    match self.negative {
      true  => -(self.magnitude as i64),
      false => self.magnitude as i64
    }
  }

  /// Same sign and magnitude.
  pub fn same_bits(&self, other: Address) -> bool {
    self.negative == other.negative && self.magnitude == other.magnitude
  }

  /// Fits in the two address bytes of an instruction.
  pub fn fits_instruction(&self) -> bool {
    self.magnitude <= MAX_ADDRESS
  }

  /// Index into memory, if the address is a nonnegative value below `size`.
  pub fn location(&self, size: usize) -> Option<usize> {
    match self.value() {
      v if v >= 0 && (v as usize) < size => Some(v as usize),
      _ => None
    }
  }

  /// The address as a word with the magnitude in the low bytes.
  pub fn to_word(&self) -> Word {
    Word::new(self.negative, self.magnitude)
  }
}

impl PartialEq for Address {
  fn eq(&self, other: &Address) -> bool {
    self.value() == other.value()
  }
}

impl Eq for Address {}

impl Hash for Address {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.value().hash(state);
  }
}

impl From<Word> for Address {
  fn from(word: Word) -> Address {
    Address::new(word.is_negative(), word.magnitude())
  }
}

impl Display for Address {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.negative {
      true  => write!(f, "-{}", self.magnitude),
      false => write!(f, "{}", self.magnitude)
    }
  }
}

/// Indexing. A zero sum keeps the sign of the address being indexed, so `-0,1` with `rI1 = 0`
/// is still minus zero.
impl Add<i64> for Address {
  type Output = Address;
  fn add(self, rhs: i64) -> Address {
    match self.value() + rhs {
      0   => Address::new(self.negative, 0),
      sum => Address::from_value(sum)
    }
  }
}
