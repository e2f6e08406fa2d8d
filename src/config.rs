//! Run time configuration of the machine.

use std::env;
use std::str::FromStr;

use strum_macros::EnumString;

use crate::address::MAX_ADDRESS;

/// Memory size of the standard machine, in words.
pub const MEMORY_SIZE: usize = 4000;
/// Largest memory a two-byte address (and rJ) can reach.
pub const MAX_MEMORY_SIZE: usize = MAX_ADDRESS as usize + 1;

/// What to do when an instruction's `F` part is invalid for its operation.
#[derive(EnumString, Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldErrorPolicy {
  /// Stop the run and return the error.
  #[strum(serialize = "halt")]
  Halt,
  /// Record the error, skip the instruction and continue.
  #[strum(serialize = "skip")]
  Skip
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MachineConfig {
  pub memory_size        : usize,
  pub field_error_policy : FieldErrorPolicy,
  /// Stop with `MachineError::StepLimit` after this many instructions.
  pub step_limit         : Option<u64>
}

impl Default for MachineConfig {
  fn default() -> MachineConfig {
    MachineConfig{
      memory_size        : MEMORY_SIZE,
      field_error_policy : FieldErrorPolicy::Halt,
      step_limit         : None
    }
  }
}

impl MachineConfig {
  /**
    Reads overrides from the environment:

      * `MIX_MEMORY_SIZE`: words of memory, from `MEMORY_SIZE` to `MAX_MEMORY_SIZE`
      * `MIX_FIELD_ERRORS`: `halt` or `skip`
      * `MIX_STEP_LIMIT`: maximum number of instructions to execute

    Unparsable values are ignored.
  */
  pub fn from_env() -> MachineConfig {
    let mut config = MachineConfig::default();

    if let Some(size) = read_var::<usize>("MIX_MEMORY_SIZE") {
      config.memory_size = clamp_memory_size(size);
    }
    if let Some(policy) = read_var::<FieldErrorPolicy>("MIX_FIELD_ERRORS") {
      config.field_error_policy = policy;
    }
    if let Some(limit) = read_var::<u64>("MIX_STEP_LIMIT") {
      config.step_limit = Some(limit);
    }

    config
  }
}

fn clamp_memory_size(size: usize) -> usize {
  size.max(MEMORY_SIZE).min(MAX_MEMORY_SIZE)
}

fn read_var<T: FromStr>(name: &str) -> Option<T> {
  env::var(name).ok().and_then(|value| value.trim().parse::<T>().ok())
}
