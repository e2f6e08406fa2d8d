/*!
  The peripheral collaborator. Device emulation is not part of the machine; `IN`, `OUT`, `IOC`,
  `JBUS` and `JRED` call through this trait, and whatever is attached decides what a tape or a
  card reader does.

  | Unit    | Device               | Block size |
  |---------|----------------------|------------|
  | 0..=7   | Tape                 | 100 words  |
  | 8..=15  | Disk or drum         | 100 words  |
  | 16      | Card reader          | 16 words   |
  | 17      | Card punch           | 16 words   |
  | 18      | Line printer         | 24 words   |
  | 19      | Typewriter terminal  | 14 words   |
  | 20      | Paper tape           | 14 words   |
*/

use crate::error::DeviceError;
use crate::word::Word;

pub const MAX_UNIT: u8 = 20;

pub fn block_size(unit: u8) -> Option<usize> {
  match unit {
    0..=15  => Some(100),
    16 | 17 => Some(16),
    18      => Some(24),
    19 | 20 => Some(14),
    _       => None
  }
}

pub trait Peripherals {
  /// Whether `unit` is still busy with an earlier operation. `JBUS` jumps on this, `JRED` on
  /// its negation.
  fn busy(&self, _unit: u8) -> bool {
    false
  }

  /// `IOC`: `m` is the effective address, `x` the contents of rX.
  fn control(&mut self, unit: u8, m: i64, x: Word) -> Result<(), DeviceError>;

  /// `IN`: fill `block`, which is exactly one block of memory starting at the effective address.
  fn input(&mut self, unit: u8, block: &mut [Word], x: Word) -> Result<(), DeviceError>;

  /// `OUT`: consume one block of memory.
  fn output(&mut self, unit: u8, block: &[Word], x: Word) -> Result<(), DeviceError>;
}

/// No devices at all. Every request fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unattached;

impl Peripherals for Unattached {
  fn control(&mut self, unit: u8, _m: i64, _x: Word) -> Result<(), DeviceError> {
    Err(DeviceError::NotAttached(unit))
  }

  fn input(&mut self, unit: u8, _block: &mut [Word], _x: Word) -> Result<(), DeviceError> {
    Err(DeviceError::NotAttached(unit))
  }

  fn output(&mut self, unit: u8, _block: &[Word], _x: Word) -> Result<(), DeviceError> {
    Err(DeviceError::NotAttached(unit))
  }
}
