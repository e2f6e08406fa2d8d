//! Error types for the machine, the assembler, and the peripheral collaborator.

use thiserror::Error;

/// Raised when a word cannot be decoded as an instruction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
  #[error("operation code {0} out of range")]
  OperationCode(u8),
  #[error("index modifier {0} out of range")]
  Index(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
  #[error("no device attached to unit {0}")]
  NotAttached(u8),
  #[error("unit {0} does not exist")]
  NoSuchUnit(u8),
  #[error("{0}")]
  Failed(String),
}

/// Run time faults. Each carries the location of the offending instruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachineError {
  #[error("illegal instruction at {pc}: {source}")]
  IllegalInstruction { pc: usize, source: DecodeError },

  #[error("invalid F-specification {field} at {pc}: {reason}")]
  Field { pc: usize, field: u8, reason: String },

  #[error("memory location {location} out of range at {pc}")]
  MemoryLocation { pc: usize, location: i64 },

  #[error("invalid operand at {pc}: {reason}")]
  InvalidOperand { pc: usize, reason: String },

  #[error("unit {unit} failed at {pc}: {source}")]
  Device { pc: usize, unit: u8, source: DeviceError },

  /// Bytes 1 through 3 of an index register would become nonzero. Recorded, never fatal.
  #[error("index register {register} given out-of-range value {value} at {pc}")]
  IndexAnomaly { pc: usize, register: u8, value: i64 },

  #[error("step limit of {limit} reached")]
  StepLimit { limit: u64 },
}

impl MachineError {
  /// Whether the fault may be skipped under `FieldErrorPolicy::Skip`.
  pub fn is_field_error(&self) -> bool {
    matches!(self, MachineError::Field { .. })
  }
}

/// Problems with a single line of assembly source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
  #[error("unrecognized operation `{0}`")]
  UnknownOperation(String),

  #[error("duplicate symbol `{name}`, first defined as {value}")]
  DuplicateSymbol { name: String, value: i64 },

  #[error("{0}")]
  Syntax(String),

  #[error("future reference to `{0}` is not allowed here")]
  FutureReference(String),

  #[error("{what} {value} out of range")]
  OutOfRange { what: &'static str, value: i64 },

  #[error("division by zero")]
  DivisionByZero,

  #[error("undefined symbol `{name}` defined at location {location}")]
  UndefinedSymbol { name: String, location: usize },

  #[error("character `{0}` has no MIX code")]
  BadCharacter(char),
}
