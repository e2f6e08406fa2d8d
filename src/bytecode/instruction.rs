use std::fmt::{Display, Formatter};

use strum_macros::{Display as StrumDisplay, IntoStaticStr};
use num_enum::{TryFromPrimitive, IntoPrimitive};

use crate::address::Address;
use crate::field::FieldSpec;
use super::mnemonic::mnemonic_for;

/**
  Operation codes of the machine, `C` in an instruction.

  The order is significant: the discriminant is the operation code, and the register families
  (`Lda..=Ldx`, `Sta..=Stx`, `JumpA..=JumpX`, ...) are laid out so that the register number is the
  distance from the first member of the family (A = 0, I1..I6 = 1..6, X = 7).
  Order-dependencies:
      ```
      Operation::register()
      Operation::field_usage()
      Operation::time()
      ```
*/
#[derive(
StrumDisplay, IntoStaticStr, TryFromPrimitive, IntoPrimitive,
Clone,        Copy,          Eq, PartialEq,  Debug,            Hash
)]
#[repr(u8)]
pub enum Operation {
  Nop,      // 0
  Add,
  Sub,
  Mul,
  Div,
  Special,  // 5: NUM, CHAR, HLT
  Shift,    // 6: SLA, SRA, SLAX, SRAX, SLC, SRC
  Move,
  // Opcode 8
  Lda, Ld1, Ld2, Ld3, Ld4, Ld5, Ld6, Ldx,
  Ldan, Ld1n, Ld2n, Ld3n, Ld4n, Ld5n, Ld6n, Ldxn,
  Sta, St1, St2, St3, St4, St5, St6, Stx,
  // Opcode 32
  Stj,
  Stz,
  Jbus,
  Ioc,
  In,
  Out,
  Jred,
  Jump,     // 39: JMP, JSJ, JOV, JNOV, JL, JE, JG, JGE, JNE, JLE
  // Opcode 40
  JumpA, Jump1, Jump2, Jump3, Jump4, Jump5, Jump6, JumpX,
  // INC, DEC, ENT, ENN
  AddressA, Address1, Address2, Address3, Address4, Address5, Address6, AddressX,
  Cmpa, Cmp1, Cmp2, Cmp3, Cmp4, Cmp5, Cmp6, Cmpx,
  // Opcode 64
}

/// Largest code that names a machine operation. Codes above this belong to the assembler.
pub const MAX_OPERATION_CODE: u8 = 63;

/// How an operation interprets the `F` part of an instruction.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Hash)]
pub enum FieldUsage {
  /// A partial field `(L:R)`.
  Bytes,
  /// Selects one of `count` variants of the operation.
  Variant(u8),
  /// Number of words (`MOVE`).
  Count,
  /// A peripheral unit number.
  Unit,
  Ignored
}

impl Operation {
  pub fn code(&self) -> u8 {
    Into::<u8>::into(*self)
  }

  /// The register a family member acts on, counted from the first member of its family.
  pub fn register(&self) -> Option<u8> {
    match self.code() {
      c @ 8..=31  => Some(c % 8),
      c @ 40..=63 => Some(c % 8),
      _           => None
    }
  }

  pub fn field_usage(&self) -> FieldUsage {
    match self {
      Operation::Nop                => FieldUsage::Ignored,
      Operation::Special            => FieldUsage::Variant(3),
      Operation::Shift              => FieldUsage::Variant(6),
      Operation::Move               => FieldUsage::Count,
      Operation::Jbus
      | Operation::Ioc
      | Operation::In
      | Operation::Out
      | Operation::Jred             => FieldUsage::Unit,
      Operation::Jump               => FieldUsage::Variant(10),
      _ if (40..=47).contains(&self.code()) => FieldUsage::Variant(6),
      _ if (48..=55).contains(&self.code()) => FieldUsage::Variant(4),
      _                             => FieldUsage::Bytes
    }
  }

  /// Execution time in units, before any per-word or device cost.
  pub fn time(&self, field: u8) -> u64 {
    match self {
      Operation::Mul                        => 10,
      Operation::Div                        => 12,
      Operation::Special                    => 10,
      Operation::Move                       => 1 + 2 * field as u64,
      Operation::Add | Operation::Sub
      | Operation::Shift | Operation::Stj
      | Operation::Stz                      => 2,
      _ if (8..=31).contains(&self.code())  => 2,
      _ if (56..=63).contains(&self.code()) => 2,
      _                                     => 1
    }
  }
}

/// The unpacked form of an instruction word: `A, I, F, C`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub operation : Operation,
  pub index     : u8,
  pub field     : u8,
  pub address   : Address
}

impl Instruction {
  pub fn new(operation: Operation, index: u8, field: u8, address: Address) -> Instruction {
    Instruction{ operation, index, field, address }
  }

  /// The field as `(L:R)`, if it is one.
  pub fn field_spec(&self) -> Option<FieldSpec> {
    FieldSpec::from_code(self.field)
  }
}

/// Disassembles to MIXAL, e.g. `LDA 2000,2(1:3)`.
impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let (name, shows_field) = mnemonic_for(self.operation, self.field);
    write!(f, "{}", name)?;
    write!(f, " {}", self.address)?;
    if self.index != 0 {
      write!(f, ",{}", self.index)?;
    }
    if shows_field {
      match (self.operation.field_usage(), self.field_spec()) {
        (FieldUsage::Bytes, Some(spec)) => write!(f, "{}", spec)?,
        _                               => write!(f, "({})", self.field)?
      }
    }
    Ok(())
  }
}
