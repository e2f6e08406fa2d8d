//! The register file: rA, rX, six index registers, rJ, the overflow toggle and the comparison
//! indicator.

use std::fmt::{Display, Formatter};

use strum_macros::Display as StrumDisplay;

use crate::address::MAX_ADDRESS;
use crate::word::Word;

/// Register numbers as they appear in operation codes. The index registers are 1 through 6.
pub const A: u8 = 0;
pub const X: u8 = 7;
pub const REGISTER_COUNT: usize = 8;

#[derive(StrumDisplay, Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum Comparison {
  Less,
  Equal,
  Greater
}

impl Default for Comparison {
  fn default() -> Comparison {
    Comparison::Equal
  }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Registers {
  /// rA, rI1, ..., rI6, rX in operation code order.
  general    : [Word; REGISTER_COUNT],
  /// The address of the instruction following the most recent jump. Always positive.
  pub j          : u32,
  pub overflow   : bool,
  pub comparison : Comparison
}

impl Registers {
  pub fn new() -> Registers {
    Registers::default()
  }

  pub fn get(&self, register: u8) -> Word {
    self.general[register as usize]
  }

  /// Stores `word` as is. Callers enforce the two-byte limit of the index registers.
  pub fn set(&mut self, register: u8, word: Word) {
    self.general[register as usize] = word;
  }

  pub fn a(&self) -> Word {
    self.get(A)
  }

  pub fn x(&self) -> Word {
    self.get(X)
  }

  pub fn set_a(&mut self, word: Word) {
    self.set(A, word);
  }

  pub fn set_x(&mut self, word: Word) {
    self.set(X, word);
  }

  /// Value of index register `i`, or zero when `i = 0`, which means "no indexing."
  pub fn index_value(&self, i: u8) -> i64 {
    match i {
      0 => 0,
      _ => self.get(i).value()
    }
  }

  /// rJ as a word, for `STJ`.
  pub fn j_word(&self) -> Word {
    Word::new(false, self.j & MAX_ADDRESS)
  }
}

pub fn is_index(register: u8) -> bool {
  (1..=6).contains(&register)
}

pub fn register_name(register: u8) -> String {
  match register {
    A => "rA".to_string(),
    X => "rX".to_string(),
    i => format!("rI{}", i)
  }
}

impl Display for Registers {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    for register in 0..REGISTER_COUNT as u8 {
      writeln!(f, "{:>3}: {}", register_name(register), self.get(register))?;
    }
    write!(f, " rJ: {}\tOV: {}\tCI: {}", self.j, self.overflow, self.comparison)
  }
}
