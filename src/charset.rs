//! The MIX character code. Codes 0 through 55 are assigned; the rest have no printable form.

/// Characters in code order. `Δ`, `Σ` and `Π` occupy codes 10, 20 and 21.
pub const ALPHABET: [char; 56] = [
  ' ', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I',
  'Δ', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
  'Σ', 'Π', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
  '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
  '.', ',', '(', ')', '+', '-', '*', '/', '=', '$',
  '<', '>', '@', ';', ':', '\''
];

/// Code of the digit `0`; digit `d` is `DIGIT_ZERO + d`.
pub const DIGIT_ZERO: u8 = 30;

pub fn encode(c: char) -> Option<u8> {
  ALPHABET.iter().position(|a| *a == c).map(|p| p as u8)
}

pub fn decode(code: u8) -> Option<char> {
  ALPHABET.get(code as usize).copied()
}
