/*!
  An emulator and assembler for Knuth's MIX computer.

  Memory is an array of `Word`s. The assembler turns MIXAL source into a memory image, and the
  `Machine` executes one, decoding each word as an instruction at the moment it runs.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod address;
pub mod assembler;
pub mod bytecode;
pub mod charset;
pub mod config;
pub mod error;
pub mod field;
pub mod machine;
pub mod word;

pub use address::Address;
pub use assembler::{assemble, Assembly, Assembler, Diagnostic, Severity, SymbolTable};
pub use bytecode::{Instruction, Operation};
pub use config::{FieldErrorPolicy, MachineConfig};
pub use error::{AssemblyError, DecodeError, DeviceError, MachineError};
pub use field::FieldSpec;
pub use machine::{Flow, Machine, Peripherals};
pub use word::Word;
