/*!
  The mnemonic table. Several mnemonics share an operation code and differ only in the `F` part
  (`JMP`/`JSJ`/`JOV`, `INCA`/`DECA`/`ENTA`/`ENNA`, ...), so a mnemonic names a pair
  `(code, default F)`. The pairs are distinct, which makes the table a bijection: the assembler
  looks mnemonics up by name, and the disassembler looks them up by `(code, F)`.

  Codes 64 and above are the assembler's pseudo-operations and are never executed.
*/

use bimap::BiMap;

use super::instruction::{Operation, FieldUsage};

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct OpSpec {
  pub code  : u8,
  /// The `F` part used when the source omits one.
  pub field : u8
}

const WHOLE: u8 = 5;    // (0:5)

// Pseudo-operation codes.
pub const EQU  : u8 = 64;
pub const CON  : u8 = 65;
pub const ALF  : u8 = 66;
pub const ORIG : u8 = 67;
pub const END  : u8 = 68;

#[rustfmt::skip]
static TABLE: &[(&str, u8, u8)] = &[
  ("NOP",  0, 0),
  ("ADD",  1, WHOLE), ("SUB",  2, WHOLE), ("MUL",  3, WHOLE), ("DIV",  4, WHOLE),
  ("NUM",  5, 0), ("CHAR", 5, 1), ("HLT",  5, 2),
  ("SLA",  6, 0), ("SRA",  6, 1), ("SLAX", 6, 2), ("SRAX", 6, 3), ("SLC",  6, 4), ("SRC",  6, 5),
  ("MOVE", 7, 1),
  ("LDA",   8, WHOLE), ("LD1",   9, WHOLE), ("LD2",  10, WHOLE), ("LD3",  11, WHOLE),
  ("LD4",  12, WHOLE), ("LD5",  13, WHOLE), ("LD6",  14, WHOLE), ("LDX",  15, WHOLE),
  ("LDAN", 16, WHOLE), ("LD1N", 17, WHOLE), ("LD2N", 18, WHOLE), ("LD3N", 19, WHOLE),
  ("LD4N", 20, WHOLE), ("LD5N", 21, WHOLE), ("LD6N", 22, WHOLE), ("LDXN", 23, WHOLE),
  ("STA",  24, WHOLE), ("ST1",  25, WHOLE), ("ST2",  26, WHOLE), ("ST3",  27, WHOLE),
  ("ST4",  28, WHOLE), ("ST5",  29, WHOLE), ("ST6",  30, WHOLE), ("STX",  31, WHOLE),
  ("STJ",  32, 2),     ("STZ",  33, WHOLE),
  ("JBUS", 34, 0), ("IOC",  35, 0), ("IN",   36, 0), ("OUT",  37, 0), ("JRED", 38, 0),
  ("JMP",  39, 0), ("JSJ",  39, 1), ("JOV",  39, 2), ("JNOV", 39, 3), ("JL",   39, 4),
  ("JE",   39, 5), ("JG",   39, 6), ("JGE",  39, 7), ("JNE",  39, 8), ("JLE",  39, 9),
  ("JAN", 40, 0), ("JAZ", 40, 1), ("JAP", 40, 2), ("JANN", 40, 3), ("JANZ", 40, 4), ("JANP", 40, 5),
  ("J1N", 41, 0), ("J1Z", 41, 1), ("J1P", 41, 2), ("J1NN", 41, 3), ("J1NZ", 41, 4), ("J1NP", 41, 5),
  ("J2N", 42, 0), ("J2Z", 42, 1), ("J2P", 42, 2), ("J2NN", 42, 3), ("J2NZ", 42, 4), ("J2NP", 42, 5),
  ("J3N", 43, 0), ("J3Z", 43, 1), ("J3P", 43, 2), ("J3NN", 43, 3), ("J3NZ", 43, 4), ("J3NP", 43, 5),
  ("J4N", 44, 0), ("J4Z", 44, 1), ("J4P", 44, 2), ("J4NN", 44, 3), ("J4NZ", 44, 4), ("J4NP", 44, 5),
  ("J5N", 45, 0), ("J5Z", 45, 1), ("J5P", 45, 2), ("J5NN", 45, 3), ("J5NZ", 45, 4), ("J5NP", 45, 5),
  ("J6N", 46, 0), ("J6Z", 46, 1), ("J6P", 46, 2), ("J6NN", 46, 3), ("J6NZ", 46, 4), ("J6NP", 46, 5),
  ("JXN", 47, 0), ("JXZ", 47, 1), ("JXP", 47, 2), ("JXNN", 47, 3), ("JXNZ", 47, 4), ("JXNP", 47, 5),
  ("INCA", 48, 0), ("DECA", 48, 1), ("ENTA", 48, 2), ("ENNA", 48, 3),
  ("INC1", 49, 0), ("DEC1", 49, 1), ("ENT1", 49, 2), ("ENN1", 49, 3),
  ("INC2", 50, 0), ("DEC2", 50, 1), ("ENT2", 50, 2), ("ENN2", 50, 3),
  ("INC3", 51, 0), ("DEC3", 51, 1), ("ENT3", 51, 2), ("ENN3", 51, 3),
  ("INC4", 52, 0), ("DEC4", 52, 1), ("ENT4", 52, 2), ("ENN4", 52, 3),
  ("INC5", 53, 0), ("DEC5", 53, 1), ("ENT5", 53, 2), ("ENN5", 53, 3),
  ("INC6", 54, 0), ("DEC6", 54, 1), ("ENT6", 54, 2), ("ENN6", 54, 3),
  ("INCX", 55, 0), ("DECX", 55, 1), ("ENTX", 55, 2), ("ENNX", 55, 3),
  ("CMPA", 56, WHOLE), ("CMP1", 57, WHOLE), ("CMP2", 58, WHOLE), ("CMP3", 59, WHOLE),
  ("CMP4", 60, WHOLE), ("CMP5", 61, WHOLE), ("CMP6", 62, WHOLE), ("CMPX", 63, WHOLE),
  // Pseudo-operations
  ("EQU", EQU, 0), ("CON", CON, 0), ("ALF", ALF, 0), ("ORIG", ORIG, 0), ("END", END, 0),
];

lazy_static! {
  static ref MNEMONICS: BiMap<&'static str, OpSpec> = {
    let mut table = BiMap::new();
    for (name, code, field) in TABLE.iter() {
      table.insert(*name, OpSpec{ code: *code, field: *field });
    }
    table
  };
}

/// Looks up a mnemonic. Case matters.
pub fn lookup(name: &str) -> Option<OpSpec> {
  MNEMONICS.get_by_left(name).copied()
}

/**
  The mnemonic to print for `operation` with the given `F`, and whether `F` must be written out
  explicitly because it differs from that mnemonic's default.
*/
pub fn mnemonic_for(operation: Operation, field: u8) -> (&'static str, bool) {
  let code = operation.code();
  if let Some(name) = MNEMONICS.get_by_right(&OpSpec{ code, field }) {
    return (*name, false);
  }
  // Either a partial field other than the default or an out-of-range variant. Both print as the
  // first mnemonic of the code with an explicit field.
  let name =
    MNEMONICS.iter()
             .filter(|(_, spec)| spec.code == code)
             .min_by_key(|(_, spec)| spec.field)
             .map(|(name, _)| *name)
             .unwrap_or("???");
  (name, operation.field_usage() != FieldUsage::Ignored)
}
