/*!

  A MIX instruction is a single word, `± A A I F C`: a signed two-byte address `A`, an index
  modifier `I`, a field or variant selector `F`, and the operation code `C`. Instructions live in
  the same memory as data and are decoded only when they are about to execute, so a program may
  compute or overwrite its own instructions.

  One design decision that needed to be made is whether to store the arguments of the
  instruction as data members of enum variants, with one variant per mnemonic. Most operation
  codes are shared by several mnemonics that differ only in `F` (`JMP` and `JLE`, `INCA` and
  `ENNA`), and an arbitrary `F` is representable in memory, so an enum is only used for the
  operation code itself. The mnemonics live in a separate table keyed by `(C, F)`.

*/

mod binary;
mod instruction;
mod mnemonic;

pub use binary::{pack, unpack, encode_instruction, try_decode_instruction, MAX_INDEX};
pub use instruction::{Instruction, Operation, FieldUsage, MAX_OPERATION_CODE};
pub use mnemonic::{lookup as lookup_mnemonic, mnemonic_for, OpSpec, EQU, CON, ALF, ORIG, END};
