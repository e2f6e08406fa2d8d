//! The MIX machine: memory, registers, and the fetch-decode-execute loop.

mod device;
mod registers;

use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use tracing::{debug, trace, warn};

use crate::address::{Address, MAX_ADDRESS};
use crate::bytecode::{try_decode_instruction, FieldUsage, Instruction, Operation};
use crate::charset::DIGIT_ZERO;
use crate::config::{FieldErrorPolicy, MachineConfig};
use crate::error::{DecodeError, MachineError};
use crate::field::{self, FieldSpec};
use crate::word::{Word, BYTE_BITS, MAGNITUDE_MASK, WORD_BYTES};

pub use device::{block_size, Peripherals, Unattached, MAX_UNIT};
pub use registers::{is_index, register_name, Comparison, Registers, A, X};

/// What the machine does after an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
  Continue,
  Halt
}

type MachineResult<T> = Result<T, MachineError>;

pub struct Machine {
  pub registers : Registers,
  memory        : Vec<Word>,
  /// Location of the next instruction.
  pc            : usize,
  /// Elapsed time in MIX units.
  clock         : u64,
  steps         : u64,
  halted        : bool,
  /// Non-fatal faults, in the order they happened.
  anomalies     : Vec<MachineError>,
  config        : MachineConfig,
  devices       : Box<dyn Peripherals>
}

impl Machine {

  // region Construction and inspection

  pub fn new(config: MachineConfig) -> Machine {
    Machine{
      registers : Registers::new(),
      memory    : vec![Word::ZERO; config.memory_size],
      pc        : 0,
      clock     : 0,
      steps     : 0,
      halted    : false,
      anomalies : Vec::new(),
      config,
      devices   : Box::new(Unattached)
    }
  }

  /// A machine whose memory starts as a copy of `image`. Memory is never smaller than the
  /// configured size.
  pub fn with_memory(image: &[Word], config: MachineConfig) -> Machine {
    let mut machine = Machine::new(config);
    if image.len() > machine.memory.len() {
      machine.memory.resize(image.len(), Word::ZERO);
    }
    machine.memory[..image.len()].copy_from_slice(image);
    machine
  }

  pub fn attach(&mut self, devices: Box<dyn Peripherals>) {
    self.devices = devices;
  }

  /// Copies `words` into memory starting at `start`.
  pub fn load(&mut self, start: usize, words: &[Word]) -> MachineResult<()> {
    let end = start + words.len();
    if end > self.memory.len() {
      return Err(MachineError::MemoryLocation{ pc: self.pc, location: end as i64 - 1 });
    }
    self.memory[start..end].copy_from_slice(words);
    Ok(())
  }

  pub fn memory(&self) -> &[Word] {
    &self.memory
  }

  pub fn word(&self, location: usize) -> Option<Word> {
    self.memory.get(location).copied()
  }

  pub fn pc(&self) -> usize {
    self.pc
  }

  pub fn set_pc(&mut self, pc: usize) {
    self.pc = pc;
    self.halted = false;
  }

  pub fn clock(&self) -> u64 {
    self.clock
  }

  pub fn steps(&self) -> u64 {
    self.steps
  }

  pub fn is_halted(&self) -> bool {
    self.halted
  }

  pub fn anomalies(&self) -> &[MachineError] {
    &self.anomalies
  }

  // endregion

  // region Fetch-decode-execute

  /**
    Runs from `start` until `HLT`. Returns the number of instructions executed by this call.
    A fatal fault stops the run and is returned; the machine is left as the fault found it.
  */
  pub fn run(&mut self, start: usize) -> MachineResult<u64> {
    self.set_pc(start);
    let first_step = self.steps;
    debug!("running from {}", start);

    while !self.halted {
      if let Some(limit) = self.config.step_limit {
        if self.steps - first_step >= limit {
          return Err(MachineError::StepLimit{ limit });
        }
      }
      self.step()?;
    }

    debug!("halted at {} after {} steps, clock {}", self.pc, self.steps - first_step, self.clock);
    Ok(self.steps - first_step)
  }

  /// Executes the single instruction at `pc`.
  pub fn step(&mut self) -> MachineResult<Flow> {
    let here = self.pc;
    let word = match self.memory.get(here) {
      Some(word) => *word,
      None       => return Err(MachineError::MemoryLocation{ pc: here, location: here as i64 })
    };

    // Decoding happens here and not at load time: memory may have been rewritten.
    let instruction =
      try_decode_instruction(word)
        .map_err(|source| MachineError::IllegalInstruction{ pc: here, source })?;
    trace!("{:04}: {}  {}", here, word, instruction);

    // If the instruction is a jump, `pc` will be modified by it.
    self.pc    += 1;
    self.steps += 1;

    let flow = match self.execute(here, &instruction) {
      Ok(flow) => flow,

      Err(error) if error.is_field_error()
                 && self.config.field_error_policy == FieldErrorPolicy::Skip => {
        warn!("{}; instruction skipped", error);
        self.anomalies.push(error);
        Flow::Continue
      }

      Err(error) => return Err(error)
    };

    self.clock += instruction.operation.time(instruction.field);
    if flow == Flow::Halt {
      self.halted = true;
    }

    #[cfg(feature = "trace_computation")] trace!("\n{}", self);

    Ok(flow)
  }

  fn execute(&mut self, pc: usize, instruction: &Instruction) -> MachineResult<Flow> {
    let operation = instruction.operation;
    let f         = instruction.field;

    // Indexing takes place on every instruction.
    let m = instruction.address + self.registers.index_value(instruction.index);

    // Validate F before anything is touched, so a bad field has no effect.
    let spec = match operation.field_usage() {
      FieldUsage::Bytes => match FieldSpec::from_code(f) {
        Some(spec) => spec,
        None       => {
          return Err(MachineError::Field{
            pc,
            field  : f,
            reason : format!("({}:{}) is not a field of {}", f / 8, f % 8, operation)
          });
        }
      },

      FieldUsage::Variant(count) if f >= count => {
        return Err(MachineError::Field{
          pc,
          field  : f,
          reason : format!("expected 0-{} for {}", count - 1, operation)
        });
      }

      FieldUsage::Unit if f > MAX_UNIT => {
        return Err(MachineError::Field{
          pc,
          field  : f,
          reason : format!("no unit {}", f)
        });
      }

      _ => FieldSpec::WHOLE
    };

    match operation {
      Operation::Nop     => {}
      Operation::Add     => self.add(pc, m, spec, false)?,
      Operation::Sub     => self.add(pc, m, spec, true)?,
      Operation::Mul     => self.multiply(pc, m, spec)?,
      Operation::Div     => self.divide(pc, m, spec)?,
      Operation::Special => match f {
        0 => self.convert_to_num(),
        1 => self.convert_to_char(),
        _ => return Ok(Flow::Halt)
      },
      Operation::Shift   => self.shift(pc, m, f)?,
      Operation::Move    => self.move_words(pc, m, f)?,
      Operation::Stj     => {
        let value = self.registers.j_word();
        self.store(pc, m, spec, value)?;
      }
      Operation::Stz     => self.store(pc, m, spec, Word::ZERO)?,
      Operation::Jbus    => {
        let busy = self.devices.busy(f);
        self.jump_if(pc, busy, m)?;
      }
      Operation::Jred    => {
        let ready = !self.devices.busy(f);
        self.jump_if(pc, ready, m)?;
      }
      Operation::Ioc     => self.io_control(pc, m, f)?,
      Operation::In      => self.io_input(pc, m, f)?,
      Operation::Out     => self.io_output(pc, m, f)?,
      Operation::Jump    => self.jump(pc, m, f)?,

      _ => {
        let code = operation.code();
        let r    = code % 8;
        match code {
          8..=15  => self.load_register(pc, r, m, spec, false)?,
          16..=23 => self.load_register(pc, r, m, spec, true)?,
          24..=31 => {
            let value = self.registers.get(r);
            self.store(pc, m, spec, value)?;
          }
          40..=47 => self.register_jump(pc, r, m, f)?,
          48..=55 => self.address_transfer(pc, r, m, f),
          56..=63 => self.compare(pc, r, m, spec)?,
          _ => {
            // Every operation code is covered above.
            return Err(MachineError::IllegalInstruction{
              pc,
              source: DecodeError::OperationCode(code)
            });
          }
        }
      }
    }

    Ok(Flow::Continue)
  }

  // endregion

  // region Memory and register access

  fn location(&self, pc: usize, m: Address) -> MachineResult<usize> {
    m.location(self.memory.len())
     .ok_or(MachineError::MemoryLocation{ pc, location: m.value() })
  }

  fn read(&self, pc: usize, m: Address) -> MachineResult<Word> {
    let location = self.location(pc, m)?;
    Ok(self.memory[location])
  }

  /**
    Sets a register. Index registers only have two bytes; a value that does not fit is recorded
    as an anomaly and only its low two bytes are kept.
  */
  fn set_register(&mut self, pc: usize, register: u8, word: Word) {
    if is_index(register) && word.magnitude() > MAX_ADDRESS {
      let anomaly = MachineError::IndexAnomaly{ pc, register, value: word.value() };
      warn!("{}", anomaly);
      self.anomalies.push(anomaly);
      self.registers.set(register, Word::new(word.is_negative(), word.magnitude() & MAX_ADDRESS));
    } else {
      self.registers.set(register, word);
    }
  }

  // endregion

  // region Loads, stores, and comparison

  /// `LDr` and `LDrN`. If the field excludes the sign, the loaded value is positive before any
  /// negation.
  fn load_register(&mut self, pc: usize, register: u8, m: Address, spec: FieldSpec, negate: bool)
    -> MachineResult<()>
  {
    let mut value = field::extract(self.read(pc, m)?, spec);
    if negate {
      value = value.negated();
    }
    self.set_register(pc, register, value);
    Ok(())
  }

  /// Splices the right-hand bytes of `value` into the field of `CONTENTS(M)`.
  fn store(&mut self, pc: usize, m: Address, spec: FieldSpec, value: Word) -> MachineResult<()> {
    let location = self.location(pc, m)?;
    self.memory[location] = field::insert(self.memory[location], spec, value);
    Ok(())
  }

  /// Compares the same field of a register and of `CONTENTS(M)`. Minus zero equals plus zero.
  fn compare(&mut self, pc: usize, register: u8, m: Address, spec: FieldSpec)
    -> MachineResult<()>
  {
    let lhs = field::extract(self.registers.get(register), spec);
    let rhs = field::extract(self.read(pc, m)?, spec);
    self.registers.comparison =
      match lhs.value().cmp(&rhs.value()) {
        std::cmp::Ordering::Less    => Comparison::Less,
        std::cmp::Ordering::Equal   => Comparison::Equal,
        std::cmp::Ordering::Greater => Comparison::Greater
      };
    Ok(())
  }

  // endregion

  // region Arithmetic

  /**
    Adds a signed value to a five-byte register. A magnitude too large for the register sets the
    overflow toggle and keeps the low five bytes. A zero result keeps the register's sign.
  */
  fn add_to(&mut self, register: u8, addend: i64) {
    let current = self.registers.get(register);
    let sum     = current.value() + addend;
    let result  = match sum {
      0 => Word::new(current.is_negative(), 0),
      _ => {
        let (word, overflow) = Word::from_value_truncated(sum);
        if overflow {
          self.registers.overflow = true;
        }
        word
      }
    };
    self.registers.set(register, result);
  }

  fn add(&mut self, pc: usize, m: Address, spec: FieldSpec, negate: bool) -> MachineResult<()> {
    let v = field::extract(self.read(pc, m)?, spec);
    let v = if negate { v.negated() } else { v };
    self.add_to(A, v.value());
    Ok(())
  }

  /// The ten-byte product replaces rA (high half) and rX (low half). Both take the sign of
  /// the product.
  fn multiply(&mut self, pc: usize, m: Address, spec: FieldSpec) -> MachineResult<()> {
    let v        = field::extract(self.read(pc, m)?, spec);
    let a        = self.registers.a();
    let negative = a.is_negative() != v.is_negative();
    let product  = a.magnitude() as u64 * v.magnitude() as u64;
    let width    = BYTE_BITS * WORD_BYTES as u32;

    self.registers.set_a(Word::new(negative, (product >> width) as u32));
    self.registers.set_x(Word::new(negative, (product & MAGNITUDE_MASK as u64) as u32));
    Ok(())
  }

  /**
    Divides rAX, a ten-byte magnitude with the sign of rA, by `V`. The quotient goes to rA and
    the remainder to rX, which takes the old sign of rA. A zero divisor or a quotient that does
    not fit in five bytes sets the overflow toggle and leaves rA and rX alone.
  */
  fn divide(&mut self, pc: usize, m: Address, spec: FieldSpec) -> MachineResult<()> {
    let v = field::extract(self.read(pc, m)?, spec);
    let a = self.registers.a();
    let x = self.registers.x();

    if v.magnitude() == 0 || a.magnitude() >= v.magnitude() {
      self.registers.overflow = true;
      return Ok(());
    }

    let width     = BYTE_BITS * WORD_BYTES as u32;
    let dividend  = (a.magnitude() as u64) << width | x.magnitude() as u64;
    let divisor   = v.magnitude() as u64;
    let quotient  = dividend / divisor;
    let remainder = dividend % divisor;

    self.registers.set_a(Word::new(a.is_negative() != v.is_negative(), quotient as u32));
    self.registers.set_x(Word::new(a.is_negative(), remainder as u32));
    Ok(())
  }

  /// `INCr`, `DECr`, `ENTr`, `ENNr`, selected by `F` = 0 through 3.
  fn address_transfer(&mut self, pc: usize, register: u8, m: Address, f: u8) {
    match f {
      0 | 1 => {
        let amount = if f == 0 { m.value() } else { -m.value() };
        match is_index(register) {
          true  => {
            let current = self.registers.get(register);
            let result  = match current.value() + amount {
              0   => Word::new(current.is_negative(), 0),
              sum => Word::new(sum < 0, sum.unsigned_abs() as u32)
            };
            self.set_register(pc, register, result);
          }
          false => self.add_to(register, amount)
        }
      }
      2 => self.set_register(pc, register, m.to_word()),
      _ => self.set_register(pc, register, m.to_word().negated())
    }
  }

  // endregion

  // region Shifts and conversion

  /// Shift amounts are in bytes and come from `M`, which must not be negative.
  fn shift(&mut self, pc: usize, m: Address, f: u8) -> MachineResult<()> {
    if m.value() < 0 {
      return Err(MachineError::InvalidOperand{
        pc,
        reason: format!("negative shift amount {}", m)
      });
    }
    let bytes     = m.value() as u64;
    let width     = BYTE_BITS * WORD_BYTES as u32;
    let a         = self.registers.a();
    let x         = self.registers.x();
    let pair_mask = (1u64 << (2 * width)) - 1;
    let pair      = (a.magnitude() as u64) << width | x.magnitude() as u64;

    match f {
      // SLA, SRA
      0 | 1 => {
        let magnitude = match bytes >= WORD_BYTES as u64 {
          true  => 0,
          false => {
            let bits = bytes as u32 * BYTE_BITS;
            match f {
              0 => (a.magnitude() << bits) & MAGNITUDE_MASK,
              _ => a.magnitude() >> bits
            }
          }
        };
        self.registers.set_a(a.with_magnitude(magnitude));
      }

      // SLAX, SRAX, SLC, SRC
      _ => {
        let result = match f {
          2 | 3 if bytes >= 2 * WORD_BYTES as u64 => 0,
          2 => (pair << (bytes as u32 * BYTE_BITS)) & pair_mask,
          3 => pair >> (bytes as u32 * BYTE_BITS),
          _ => {
            let bits = (bytes % (2 * WORD_BYTES as u64)) as u32 * BYTE_BITS;
            match (f, bits) {
              (_, 0) => pair,
              (4, _) => ((pair << bits) | (pair >> (2 * width - bits))) & pair_mask,
              _      => ((pair >> bits) | (pair << (2 * width - bits))) & pair_mask
            }
          }
        };
        self.registers.set_a(a.with_magnitude((result >> width) as u32));
        self.registers.set_x(x.with_magnitude((result & MAGNITUDE_MASK as u64) as u32));
      }
    }
    Ok(())
  }

  /// rAX holds ten digits, one per byte, each byte taken modulo 10. Their value replaces the
  /// magnitude of rA, modulo 64^5. rX and both signs are unchanged.
  fn convert_to_num(&mut self) {
    let a = self.registers.a();
    let x = self.registers.x();
    let value =
      a.bytes().iter()
       .chain(x.bytes().iter())
       .fold(0u64, |acc, byte| acc * 10 + (*byte % 10) as u64);
    let magnitude = (value % (MAGNITUDE_MASK as u64 + 1)) as u32;
    self.registers.set_a(a.with_magnitude(magnitude));
  }

  /// The magnitude of rA becomes ten character-code digits across rA and rX. Signs are kept.
  fn convert_to_char(&mut self) {
    let a = self.registers.a();
    let x = self.registers.x();
    let mut value  = a.magnitude() as u64;
    let mut digits = [0u8; 2 * WORD_BYTES];
    for digit in digits.iter_mut().rev() {
      *digit = DIGIT_ZERO + (value % 10) as u8;
      value /= 10;
    }
    let mut high = [0u8; WORD_BYTES];
    let mut low  = [0u8; WORD_BYTES];
    high.copy_from_slice(&digits[..WORD_BYTES]);
    low.copy_from_slice(&digits[WORD_BYTES..]);
    self.registers.set_a(Word::from_bytes(a.is_negative(), high));
    self.registers.set_x(Word::from_bytes(x.is_negative(), low));
  }

  /// `MOVE`: copies `F` words from `M` to the location in rI1, one word at a time, advancing rI1.
  fn move_words(&mut self, pc: usize, m: Address, count: u8) -> MachineResult<()> {
    for k in 0..count as i64 {
      let from   = self.location(pc, m + k)?;
      let target = Address::from(self.registers.get(1));
      let to     = self.location(pc, target)?;
      self.memory[to] = self.memory[from];
      self.address_transfer(pc, 1, Address::from_value(1), 0);
    }
    Ok(())
  }

  // endregion

  // region Jumps

  /// Jumps to `m` if `condition` holds. rJ records the instruction after the jump either way,
  /// unless the target is outside memory, in which case nothing changes.
  fn jump_if(&mut self, pc: usize, condition: bool, m: Address) -> MachineResult<()> {
    let target = match condition {
      true  => Some(self.location(pc, m)?),
      false => None
    };
    // rJ holds two bytes.
    self.registers.j = self.pc as u32 & MAX_ADDRESS;
    if let Some(target) = target {
      self.pc = target;
    }
    Ok(())
  }

  /// Operation 39. `F` selects JMP, JSJ, JOV, JNOV, JL, JE, JG, JGE, JNE, or JLE.
  fn jump(&mut self, pc: usize, m: Address, f: u8) -> MachineResult<()> {
    let comparison = self.registers.comparison;
    let condition  = match f {
      0 => true,
      1 => {
        // JSJ leaves rJ alone.
        self.pc = self.location(pc, m)?;
        return Ok(());
      }
      2 => std::mem::replace(&mut self.registers.overflow, false),
      3 => !std::mem::replace(&mut self.registers.overflow, false),
      4 => comparison == Comparison::Less,
      5 => comparison == Comparison::Equal,
      6 => comparison == Comparison::Greater,
      7 => comparison != Comparison::Less,
      8 => comparison != Comparison::Equal,
      _ => comparison != Comparison::Greater
    };
    self.jump_if(pc, condition, m)
  }

  /// Operations 40 through 47: JrN, JrZ, JrP, JrNN, JrNZ, JrNP. Minus zero is zero.
  fn register_jump(&mut self, pc: usize, register: u8, m: Address, f: u8) -> MachineResult<()> {
    let value     = self.registers.get(register).value();
    let condition = match f {
      0 => value < 0,
      1 => value == 0,
      2 => value > 0,
      3 => value >= 0,
      4 => value != 0,
      _ => value <= 0
    };
    self.jump_if(pc, condition, m)
  }

  // endregion

  // region Input and output

  fn block(&self, pc: usize, m: Address, unit: u8) -> MachineResult<std::ops::Range<usize>> {
    let start = self.location(pc, m)?;
    let size  = block_size(unit).unwrap_or(0);
    match start + size <= self.memory.len() {
      true  => Ok(start..start + size),
      false => Err(MachineError::MemoryLocation{ pc, location: (start + size) as i64 - 1 })
    }
  }

  fn io_control(&mut self, pc: usize, m: Address, unit: u8) -> MachineResult<()> {
    let x = self.registers.x();
    self.devices
        .control(unit, m.value(), x)
        .map_err(|source| MachineError::Device{ pc, unit, source })
  }

  fn io_input(&mut self, pc: usize, m: Address, unit: u8) -> MachineResult<()> {
    let range = self.block(pc, m, unit)?;
    let x     = self.registers.x();
    self.devices
        .input(unit, &mut self.memory[range], x)
        .map_err(|source| MachineError::Device{ pc, unit, source })
  }

  fn io_output(&mut self, pc: usize, m: Address, unit: u8) -> MachineResult<()> {
    let range = self.block(pc, m, unit)?;
    let x     = self.registers.x();
    self.devices
        .output(unit, &self.memory[range], x)
        .map_err(|source| MachineError::Device{ pc, unit, source })
  }

  // endregion

  // region Display methods

  fn make_memory_table(&self, highlight: usize, radius: usize) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Address", ubl->"Contents", ubl->"Instruction"]);

    let start = highlight.saturating_sub(radius);
    let end   = (highlight + radius + 1).min(self.memory.len());
    for location in start..end {
      let word        = self.memory[location];
      let disassembly = match try_decode_instruction(word) {
        Ok(instruction) => format!("{}", instruction),
        Err(_)          => String::new()
      };
      match location == highlight {

        true  => {
          table.add_row(
            row![r->format!("* --> {:04}", location), format!("{}", word), disassembly]
          );
        }

        false => {
          table.add_row(
            row![r->format!("{:04}", location), format!("{}", word), disassembly]
          );
        }

      } // end match on highlight
    } // end for
    table
  }

  fn make_register_table(&self) -> Table {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->"Register", ubl->"Contents"]);

    for register in 0..8u8 {
      table.add_row(
        row![r->register_name(register), format!("{}", self.registers.get(register))]
      );
    }
    table.add_row(row![r->"rJ", format!("{:04}", self.registers.j)]);
    table.add_row(row![r->"OV", format!("{}", self.registers.overflow)]);
    table.add_row(row![r->"CI", format!("{}", self.registers.comparison)]);
    table
  }

  // endregion

}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl Display for Machine {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let r_table = self.make_register_table();
    let m_table = self.make_memory_table(self.pc, 4);

    let mut combined_table = table!([r_table, m_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Memory"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    let state = match self.halted {
      true  => "Halted.",
      false => "Running."
    };

    write!(f, "{}\tpc: {:04}\tclock: {}\n{}", state, self.pc, self.clock, combined_table)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::bytecode::pack;
  use crate::error::DeviceError;

  fn op(code: u8, address: i64, index: u8, field: u8) -> Word {
    pack(code, index, field, Address::from_value(address))
  }

  fn bytes(negative: bool, bytes: [u8; 5]) -> Word {
    Word::from_bytes(negative, bytes)
  }

  const HLT: (u8, u8) = (5, 2);

  fn halt() -> Word {
    op(HLT.0, 0, 0, HLT.1)
  }

  /// A machine with `program` at location 0.
  fn boot(program: &[Word]) -> Machine {
    Machine::with_memory(program, MachineConfig::default())
  }

  #[test]
  fn halt_stops_after_one_step(){
    let mut machine = boot(&[halt()]);
    assert_eq!(machine.run(0), Ok(1));
    assert!(machine.is_halted());
    assert_eq!(machine.pc(), 1);
    assert_eq!(machine.clock(), 10);
  }

  #[test]
  fn partial_loads(){
    // LDA 2000(0:3), LDA 2000(4:4), LDAN 2000(1:5), LD1 2000(4:5)
    let mut machine = boot(&[op(8, 2000, 0, 3), halt()]);
    machine.load(2000, &[bytes(true, [1, 2, 3, 4, 5])]).unwrap();

    machine.run(0).unwrap();
    assert!(machine.registers.a().same_bits(bytes(true, [0, 0, 1, 2, 3])));

    machine.load(0, &[op(8, 2000, 0, 36)]).unwrap();
    machine.run(0).unwrap();
    assert!(machine.registers.a().same_bits(bytes(false, [0, 0, 0, 0, 4])));

    machine.load(0, &[op(16, 2000, 0, 13)]).unwrap();
    machine.run(0).unwrap();
    assert!(machine.registers.a().same_bits(bytes(true, [1, 2, 3, 4, 5])));

    machine.load(0, &[op(9, 2000, 0, 37)]).unwrap();
    machine.run(0).unwrap();
    assert_eq!(machine.registers.get(1).value(), 4 * 64 + 5);
  }

  #[test]
  fn partial_stores(){
    let original = bytes(true, [1, 2, 3, 4, 5]);
    let cases = [
      (5u8,  bytes(false, [6, 7, 8, 9, 0])),
      (19u8, bytes(true,  [1, 9, 0, 4, 5])),
      (1u8,  bytes(false, [0, 2, 3, 4, 5])),
      (45u8, bytes(true,  [1, 2, 3, 4, 0])),
    ];
    for (field, expected) in cases.iter() {
      let mut machine = boot(&[op(24, 2000, 0, *field), halt()]);
      machine.load(2000, &[original]).unwrap();
      machine.registers.set_a(bytes(false, [6, 7, 8, 9, 0]));
      machine.run(0).unwrap();
      assert!(machine.word(2000).unwrap().same_bits(*expected), "field {}", field);
    }
  }

  #[test]
  fn store_jump_and_zero(){
    // JMP 2; HLT; STJ 2000; STZ 2001(1:5); HLT
    let mut machine = boot(&[op(39, 2, 0, 0), halt(), op(32, 2000, 0, 2), op(33, 2001, 0, 13), halt()]);
    machine.load(2000, &[bytes(true, [9, 9, 9, 9, 9]), bytes(true, [9, 9, 9, 9, 9])]).unwrap();
    machine.run(0).unwrap();
    assert!(machine.word(2000).unwrap().same_bits(bytes(false, [0, 1, 9, 9, 9])));
    assert!(machine.word(2001).unwrap().same_bits(Word::new(true, 0)));
  }

  #[test]
  fn addition_overflow_and_zero_sign(){
    let mut machine = boot(&[op(1, 2000, 0, 5), halt()]);
    machine.load(2000, &[Word::new(false, 1)]).unwrap();
    machine.registers.set_a(Word::new(false, crate::word::MAX_MAGNITUDE));
    machine.run(0).unwrap();
    assert!(machine.registers.overflow);
    assert!(machine.registers.a().same_bits(Word::ZERO));

    // -5 + 5 keeps the sign of rA.
    let mut machine = machine_with_a(&[op(1, 2000, 0, 5), halt()], Word::new(true, 5));
    machine.load(2000, &[Word::new(false, 5)]).unwrap();
    machine.run(0).unwrap();
    assert!(!machine.registers.overflow);
    assert!(machine.registers.a().same_bits(Word::new(true, 0)));

    // SUB
    let mut machine = machine_with_a(&[op(2, 2000, 0, 5), halt()], Word::new(false, 5));
    machine.load(2000, &[Word::new(false, 7)]).unwrap();
    machine.run(0).unwrap();
    assert_eq!(machine.registers.a().value(), -2);
  }

  fn machine_with_a(program: &[Word], a: Word) -> Machine {
    let mut machine = boot(program);
    machine.registers.set_a(a);
    machine
  }

  #[test]
  fn multiplication(){
    let mut machine = machine_with_a(&[op(3, 2000, 0, 5), halt()], bytes(false, [1, 1, 1, 1, 1]));
    machine.load(2000, &[bytes(false, [1, 1, 1, 1, 1])]).unwrap();
    machine.run(0).unwrap();
    assert!(machine.registers.a().same_bits(bytes(false, [0, 1, 2, 3, 4])));
    assert!(machine.registers.x().same_bits(bytes(false, [5, 4, 3, 2, 1])));

    // Both halves take the sign of the product, even when it is zero.
    let mut machine = machine_with_a(&[op(3, 2000, 0, 5), halt()], Word::new(true, 112));
    machine.load(2000, &[Word::new(false, 0)]).unwrap();
    machine.run(0).unwrap();
    assert!(machine.registers.a().same_bits(Word::new(true, 0)));
    assert!(machine.registers.x().same_bits(Word::new(true, 0)));
  }

  #[test]
  fn division(){
    let mut machine = machine_with_a(&[op(4, 2000, 0, 5), halt()], Word::new(true, 0));
    machine.registers.set_x(Word::new(false, 17));
    machine.load(2000, &[Word::new(false, 3)]).unwrap();
    machine.run(0).unwrap();
    assert!(machine.registers.a().same_bits(Word::new(true, 5)));
    assert!(machine.registers.x().same_bits(Word::new(true, 2)));
    assert!(!machine.registers.overflow);

    // Quotient too large: overflow, registers untouched.
    let mut machine = machine_with_a(&[op(4, 2000, 0, 5), halt()], Word::new(false, 5));
    machine.load(2000, &[Word::new(false, 3)]).unwrap();
    machine.run(0).unwrap();
    assert!(machine.registers.overflow);
    assert_eq!(machine.registers.a().value(), 5);

    // Division by zero.
    let mut machine = boot(&[op(4, 2000, 0, 5), halt()]);
    machine.run(0).unwrap();
    assert!(machine.registers.overflow);
  }

  #[test]
  fn shifts(){
    // SRAX 1, SLA 2, SRC 4, SRA 2, SLC 501
    let program = [
      op(6, 1, 0, 3),
      op(6, 2, 0, 0),
      op(6, 4, 0, 5),
      op(6, 2, 0, 1),
      op(6, 501, 0, 4),
      halt()
    ];
    let mut machine = machine_with_a(&program, bytes(false, [1, 2, 3, 4, 5]));
    machine.registers.set_x(bytes(true, [6, 7, 8, 9, 10]));

    let expected = [
      (bytes(false, [0, 1, 2, 3, 4]), bytes(true, [5, 6, 7, 8, 9])),
      (bytes(false, [2, 3, 4, 0, 0]), bytes(true, [5, 6, 7, 8, 9])),
      (bytes(false, [6, 7, 8, 9, 2]), bytes(true, [3, 4, 0, 0, 5])),
      (bytes(false, [0, 0, 6, 7, 8]), bytes(true, [3, 4, 0, 0, 5])),
      (bytes(false, [0, 6, 7, 8, 3]), bytes(true, [4, 0, 0, 5, 0])),
    ];
    for (a, x) in expected.iter() {
      machine.step().unwrap();
      assert!(machine.registers.a().same_bits(*a), "rA = {}", machine.registers.a());
      assert!(machine.registers.x().same_bits(*x), "rX = {}", machine.registers.x());
    }

    // A negative amount is rejected.
    let mut machine = boot(&[op(6, -1, 0, 0)]);
    assert!(matches!(machine.step(), Err(MachineError::InvalidOperand{ pc: 0, .. })));
  }

  #[test]
  fn num_and_char(){
    // NUM; INCA 1; CHAR; HLT
    let program = [op(5, 0, 0, 0), op(48, 1, 0, 0), op(5, 0, 0, 1), halt()];
    let mut machine = machine_with_a(&program, bytes(true, [0, 0, 31, 32, 39]));
    machine.registers.set_x(bytes(false, [37, 57, 47, 30, 30]));

    machine.step().unwrap();
    assert_eq!(machine.registers.a().value(), -12977700);
    assert!(machine.registers.x().same_bits(bytes(false, [37, 57, 47, 30, 30])));

    machine.run(1).unwrap();
    assert!(machine.registers.a().same_bits(bytes(true, [30, 30, 31, 32, 39])));
    assert!(machine.registers.x().same_bits(bytes(false, [37, 37, 36, 39, 39])));
  }

  #[test]
  fn move_advances_index_one(){
    let mut machine = boot(&[op(7, 2000, 0, 3), halt()]);
    machine.registers.set(1, Word::new(false, 1000));
    machine.load(2000, &[Word::new(false, 1), Word::new(false, 2), Word::new(true, 3)]).unwrap();
    machine.run(0).unwrap();
    assert_eq!(machine.word(1000), Some(Word::new(false, 1)));
    assert_eq!(machine.word(1002), Some(Word::new(true, 3)));
    assert_eq!(machine.registers.get(1).value(), 1003);
    assert_eq!(machine.clock(), 7 + 10);
  }

  #[test]
  fn jumps_record_the_return_address(){
    // JMP 3; HLT; HLT; JSJ 5; HLT; HLT
    let mut machine = boot(&[op(39, 3, 0, 0), halt(), halt(), op(39, 5, 0, 1), halt(), halt()]);
    machine.run(0).unwrap();
    assert_eq!(machine.pc(), 6);
    assert_eq!(machine.registers.j, 1);

    // JOV not taken still records rJ and clears nothing.
    let mut machine = boot(&[op(39, 3, 0, 2), halt()]);
    machine.run(0).unwrap();
    assert_eq!(machine.pc(), 2);
    assert_eq!(machine.registers.j, 1);

    // JNOV clears the toggle.
    let mut machine = boot(&[op(39, 3, 0, 3), halt(), halt(), halt()]);
    machine.registers.overflow = true;
    machine.run(0).unwrap();
    assert_eq!(machine.pc(), 2);
    assert!(!machine.registers.overflow);
  }

  #[test]
  fn register_jumps_treat_minus_zero_as_zero(){
    // J1Z 3; HLT; HLT; HLT
    let mut machine = boot(&[op(41, 3, 0, 1), halt(), halt(), halt()]);
    machine.registers.set(1, Word::new(true, 0));
    machine.run(0).unwrap();
    assert_eq!(machine.pc(), 4);

    // JAN not taken
    let mut machine = boot(&[op(40, 3, 0, 0), halt(), halt(), halt()]);
    machine.registers.set_a(Word::new(true, 0));
    machine.run(0).unwrap();
    assert_eq!(machine.pc(), 2);
  }

  #[test]
  fn every_jump_variant(){
    let comparisons = [Comparison::Less, Comparison::Equal, Comparison::Greater];
    for f in 0..=9u8 {
      for &comparison in comparisons.iter() {
        for &overflow in [false, true].iter() {
          let mut machine = boot(&[op(39, 4, 0, f)]);
          machine.registers.comparison = comparison;
          machine.registers.overflow   = overflow;
          machine.step().unwrap();

          let taken = match f {
            0 | 1 => true,
            2     => overflow,
            3     => !overflow,
            4     => comparison == Comparison::Less,
            5     => comparison == Comparison::Equal,
            6     => comparison == Comparison::Greater,
            7     => comparison != Comparison::Less,
            8     => comparison != Comparison::Equal,
            _     => comparison != Comparison::Greater
          };
          let case = format!("F = {}, {}, overflow {}", f, comparison, overflow);
          assert_eq!(machine.pc(), if taken { 4 } else { 1 }, "{}", case);
          assert_eq!(machine.registers.j, if f == 1 { 0 } else { 1 }, "{}", case);
          assert_eq!(machine.registers.overflow, overflow && f != 2 && f != 3, "{}", case);
          assert_eq!(machine.registers.comparison, comparison, "{}", case);
        }
      }
    }
  }

  #[test]
  fn every_register_jump_variant(){
    let values = [Word::new(true, 1), Word::new(true, 0), Word::new(false, 0), Word::new(false, 1)];
    for register in A..=X {
      for &value in values.iter() {
        for f in 0..=5u8 {
          let mut machine = boot(&[op(40 + register, 4, 0, f)]);
          machine.registers.set(register, value);
          machine.step().unwrap();

          let v     = value.value();
          let taken = match f {
            0 => v < 0,
            1 => v == 0,
            2 => v > 0,
            3 => v >= 0,
            4 => v != 0,
            _ => v <= 0
          };
          let case = format!("{} = {}, F = {}", register_name(register), value, f);
          assert_eq!(machine.pc(), if taken { 4 } else { 1 }, "{}", case);
          assert_eq!(machine.registers.j, 1, "{}", case);
        }
      }
    }
  }

  #[test]
  fn jump_outside_memory_keeps_rj(){
    let mut machine = boot(&[op(39, 4000, 0, 0)]);
    machine.registers.j = 7;
    assert_eq!(machine.step(), Err(MachineError::MemoryLocation{ pc: 0, location: 4000 }));
    assert_eq!(machine.registers.j, 7);

    // Not taken, the target is never resolved.
    let mut machine = boot(&[op(39, 4000, 0, 4)]);
    machine.step().unwrap();
    assert_eq!(machine.pc(), 1);
    assert_eq!(machine.registers.j, 1);
  }

  #[test]
  fn rj_keeps_two_bytes_in_large_memory(){
    let config      = MachineConfig{ memory_size: 5000, ..MachineConfig::default() };
    let mut machine = Machine::new(config);
    machine.load(4500, &[op(39, 10, 0, 0)]).unwrap();
    machine.set_pc(4500);
    machine.step().unwrap();
    assert_eq!(machine.pc(), 10);
    assert_eq!(machine.registers.j, 4501 & MAX_ADDRESS);
  }

  #[test]
  fn comparison_of_zeros(){
    // CMPA 2000; JE 3; HLT; HLT
    let mut machine = machine_with_a(&[op(56, 2000, 0, 5), op(39, 3, 0, 5), halt(), halt()], Word::new(true, 0));
    machine.run(0).unwrap();
    assert_eq!(machine.registers.comparison, Comparison::Equal);
    assert_eq!(machine.pc(), 4);

    // CMPX 2000(4:5) compares the field only.
    let mut machine = boot(&[op(63, 2000, 0, 37), halt()]);
    machine.registers.set_x(bytes(true, [9, 9, 9, 0, 1]));
    machine.load(2000, &[bytes(false, [0, 0, 0, 0, 2])]).unwrap();
    machine.run(0).unwrap();
    assert_eq!(machine.registers.comparison, Comparison::Less);
  }

  #[test]
  fn address_transfer(){
    // ENTA -0; ENNX 5; INC2 7; DEC2 10; HLT
    let program = [
      pack(48, 0, 2, Address::new(true, 0)),
      op(55, 5, 0, 3),
      op(50, 7, 0, 0),
      op(50, 10, 0, 1),
      halt()
    ];
    let mut machine = machine_with_a(&program, Word::new(false, 99));
    machine.run(0).unwrap();
    assert!(machine.registers.a().same_bits(Word::new(true, 0)));
    assert_eq!(machine.registers.x().value(), -5);
    assert_eq!(machine.registers.get(2).value(), -3);
  }

  #[test]
  fn indexing_and_index_anomaly(){
    // ENT1 4095,2 with rI2 = 4095 does not fit in two bytes.
    let mut machine = boot(&[op(49, 4095, 2, 2), halt()]);
    machine.registers.set(2, Word::new(false, 4095));
    machine.run(0).unwrap();
    assert_eq!(machine.registers.get(1).value(), 4094);
    assert_eq!(
      machine.anomalies(),
      &[MachineError::IndexAnomaly{ pc: 0, register: 1, value: 8190 }]
    );

    // LDA 1000,3 with rI3 = -10
    let mut machine = boot(&[op(8, 1000, 3, 5), halt()]);
    machine.registers.set(3, Word::new(true, 10));
    machine.load(990, &[Word::new(false, 42)]).unwrap();
    machine.run(0).unwrap();
    assert_eq!(machine.registers.a().value(), 42);
  }

  #[test]
  fn faults(){
    // Index modifier 7 cannot be decoded.
    let mut machine = boot(&[Word::from_bits(7 << 12 | 8)]);
    assert_eq!(
      machine.step(),
      Err(MachineError::IllegalInstruction{ pc: 0, source: DecodeError::Index(7) })
    );

    let mut machine = boot(&[op(8, -1, 0, 5)]);
    assert_eq!(machine.step(), Err(MachineError::MemoryLocation{ pc: 0, location: -1 }));

    let mut machine = boot(&[op(8, 4000, 0, 5)]);
    assert_eq!(machine.step(), Err(MachineError::MemoryLocation{ pc: 0, location: 4000 }));

    // Running off the end of memory.
    let mut machine = boot(&[]);
    assert_eq!(machine.run(3999), Err(MachineError::MemoryLocation{ pc: 4000, location: 4000 }));
  }

  #[test]
  fn field_error_policy(){
    // LDA 2000(5:3)
    let program = [op(8, 2000, 0, 43), halt()];
    let mut machine = machine_with_a(&program, Word::new(false, 7));
    assert!(matches!(machine.run(0), Err(MachineError::Field{ pc: 0, field: 43, .. })));
    assert_eq!(machine.registers.a().value(), 7);

    let config = MachineConfig{ field_error_policy: FieldErrorPolicy::Skip, ..MachineConfig::default() };
    let mut machine = Machine::with_memory(&program, config);
    assert_eq!(machine.run(0), Ok(2));
    assert_eq!(machine.anomalies().len(), 1);
    assert!(machine.anomalies()[0].is_field_error());

    // JMP with F = 10 has no meaning.
    let mut machine = boot(&[op(39, 0, 0, 10)]);
    assert!(matches!(machine.step(), Err(MachineError::Field{ field: 10, .. })));
  }

  #[test]
  fn step_limit(){
    let config = MachineConfig{ step_limit: Some(10), ..MachineConfig::default() };
    let mut machine = Machine::with_memory(&[op(39, 0, 0, 0)], config);
    assert_eq!(machine.run(0), Err(MachineError::StepLimit{ limit: 10 }));
    assert_eq!(machine.steps(), 10);
  }

  #[derive(Default)]
  struct Printer {
    lines : Vec<Vec<Word>>
  }

  impl Peripherals for Printer {
    fn control(&mut self, unit: u8, _m: i64, _x: Word) -> Result<(), DeviceError> {
      Err(DeviceError::NoSuchUnit(unit))
    }

    fn input(&mut self, _unit: u8, block: &mut [Word], _x: Word) -> Result<(), DeviceError> {
      for (k, word) in block.iter_mut().enumerate() {
        *word = Word::new(false, k as u32);
      }
      Ok(())
    }

    fn output(&mut self, _unit: u8, block: &[Word], _x: Word) -> Result<(), DeviceError> {
      self.lines.push(block.to_vec());
      Ok(())
    }
  }

  #[test]
  fn input_and_output(){
    // IN 100(16); OUT 100(18); HLT
    let mut machine = boot(&[op(36, 100, 0, 16), op(37, 100, 0, 18), halt()]);
    machine.attach(Box::new(Printer::default()));
    machine.run(0).unwrap();
    assert_eq!(machine.word(115), Some(Word::new(false, 15)));
    assert_eq!(machine.word(116), Some(Word::ZERO));

    // A block that would run past the end of memory.
    let mut machine = boot(&[op(37, 3990, 0, 18)]);
    machine.attach(Box::new(Printer::default()));
    assert!(matches!(machine.step(), Err(MachineError::MemoryLocation{ .. })));

    let mut machine = boot(&[op(37, 100, 0, 18)]);
    assert_eq!(
      machine.step(),
      Err(MachineError::Device{ pc: 0, unit: 18, source: DeviceError::NotAttached(18) })
    );

    // JRED with nothing busy jumps.
    let mut machine = boot(&[op(38, 2, 0, 18), halt(), halt()]);
    machine.run(0).unwrap();
    assert_eq!(machine.pc(), 3);
  }

  #[test]
  fn display_shows_registers_and_memory(){
    let mut machine = boot(&[op(8, 2000, 2, 11), halt()]);
    machine.step().ok();
    let text = format!("{}", machine);
    assert!(text.contains("rI6"));
    assert!(text.contains("LDA 2000,2(1:3)"));
    assert!(text.contains("HLT"));
  }
}
