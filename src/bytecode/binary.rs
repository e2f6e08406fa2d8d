/*!
  This module is responsible for the encoding and decoding of binary instructions.

  An instruction occupies one word:
  ```text
   3          2         1
   0 987654 321098 765432 109876 543210
   ± AAAAAA AAAAAA IIIIII FFFFFF CCCCCC
  ```
  The address is sign and magnitude, with its sign in the sign bit of the word.
*/
use std::convert::TryFrom;

use super::{Operation, Instruction};
use super::instruction::MAX_OPERATION_CODE;
use crate::address::{Address, MAX_ADDRESS};
use crate::error::DecodeError;
use crate::word::{Word, BYTE_MASK};

// If you change these you must also change `pack` and `try_decode_instruction`.
const FIELD_SHIFT   : u32 = 6;
const INDEX_SHIFT   : u32 = 12;
const ADDRESS_SHIFT : u32 = 18;

/// The largest legal index modifier. `0` means no indexing.
pub const MAX_INDEX: u8 = 6;

/**
  Packs the parts of an instruction into a word. Each part is truncated to its width; the
  caller is responsible for range checks. `code` may be any 6-bit value, including one the
  machine will reject.
*/
pub fn pack(code: u8, index: u8, field: u8, address: Address) -> Word {
  let magnitude =
    ((address.magnitude & MAX_ADDRESS) << ADDRESS_SHIFT) |
    ((index as u32 & BYTE_MASK) << INDEX_SHIFT)          |
    ((field as u32 & BYTE_MASK) << FIELD_SHIFT)          |
    (code as u32 & BYTE_MASK);
  Word::new(address.negative, magnitude)
}

pub fn encode_instruction(instruction: &Instruction) -> Word {
  pack(
    instruction.operation.code(),
    instruction.index,
    instruction.field,
    instruction.address
  )
}

/// Splits a word into `(C, I, F, A)` without validating anything.
pub fn unpack(word: Word) -> (u8, u8, u8, Address) {
  let bits    = word.magnitude();
  let code    = (bits & BYTE_MASK) as u8;
  let field   = ((bits >> FIELD_SHIFT) & BYTE_MASK) as u8;
  let index   = ((bits >> INDEX_SHIFT) & BYTE_MASK) as u8;
  let address = Address::new(word.is_negative(), (bits >> ADDRESS_SHIFT) & MAX_ADDRESS);
  (code, index, field, address)
}

/**
  Decodes a word as an instruction. Memory is the authority on what is executed and programs
  may modify themselves, so this check happens every time a word is about to run.
*/
pub fn try_decode_instruction(word: Word) -> Result<Instruction, DecodeError> {
  let (code, index, field, address) = unpack(word);

  if code > MAX_OPERATION_CODE {
    return Err(DecodeError::OperationCode(code));
  }
  let operation =
    Operation::try_from(code).map_err(|_| DecodeError::OperationCode(code))?;

  if index > MAX_INDEX {
    return Err(DecodeError::Index(index));
  }

  Ok(Instruction{ operation, index, field, address })
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::word::SIGN_BIT;

  #[test]
  fn layout_is_bit_exact(){
    // LDA 2000,2(1:3)
    let word = pack(8, 2, 11, Address::from_value(2000));
    assert_eq!(word.bits(), 2000 << 18 | 2 << 12 | 11 << 6 | 8);

    // LDA -2000,4
    let word = pack(8, 4, 5, Address::from_value(-2000));
    assert_eq!(word.bits(), SIGN_BIT | 2000 << 18 | 4 << 12 | 5 << 6 | 8);
  }

  #[test]
  fn round_trip(){
    let addresses = [0i64, 1, 63, 64, 2000, -2000, 4095, -4095];
    for code in 0..=MAX_OPERATION_CODE {
      for index in 0..=MAX_INDEX {
        for left in 0..=5u8 {
          for right in left..=5u8 {
            for value in addresses.iter() {
              let field       = 8 * left + right;
              let address     = Address::from_value(*value);
              let instruction = try_decode_instruction(pack(code, index, field, address)).unwrap();
              assert_eq!(instruction.operation.code(), code);
              assert_eq!(instruction.index, index);
              assert_eq!(instruction.field, field);
              assert!(instruction.address.same_bits(address));
            }
          }
        }
      }
    }
  }

  #[test]
  fn minus_zero_address_survives(){
    let word = pack(48, 0, 3, Address::new(true, 0));
    assert!(word.is_negative());
    let address = unpack(word).3;
    assert!(address.negative);
    assert_eq!(address.magnitude, 0);
    assert!(try_decode_instruction(word).unwrap().address.negative);
  }

  #[test]
  fn bad_index_is_illegal(){
    let word = pack(8, 7, 5, Address::from_value(100));
    assert_eq!(try_decode_instruction(word), Err(DecodeError::Index(7)));
  }

  #[test]
  fn encode_matches_pack(){
    let instruction = Instruction::new(Operation::Sta, 1, 13, Address::from_value(-17));
    let word = encode_instruction(&instruction);
    assert_eq!(try_decode_instruction(word), Ok(instruction));
  }
}
