/*!
  The MIXAL assembler.

  Assembly is two passes over the program, though only the first reads the source. The first
  pass handles one line at a time: it defines the line's label, evaluates the address field, and
  stores the assembled word at the location counter. A symbol that is not yet defined may appear
  only as the entire A-part of an instruction (optionally signed), as the W-value of `CON`, or
  as the operand of `END`; such a use leaves a zero address behind and is remembered as a
  *future reference*. Literal constants `=W=` are remembered the same way.

  The second pass resolves what was remembered. A symbol still undefined is given the next free
  location, which is filled with zero, and a warning is issued. Then each literal gets a word of
  its own. Finally every remembered location is patched.

  A line with an error is skipped and reported; the rest of the program is still assembled.
*/

mod symboltable;
pub mod syntax;

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;
use strum_macros::Display as StrumDisplay;
use tracing::{debug, warn};

use crate::address::{Address, MAX_ADDRESS};
use crate::bytecode::{lookup_mnemonic, pack, OpSpec, ALF, CON, END, EQU, ORIG, MAX_INDEX};
use crate::charset;
use crate::config::MEMORY_SIZE;
use crate::error::AssemblyError;
use crate::field::{self, FieldSpec};
use crate::word::{Word, BYTE_SIZE, MAX_MAGNITUDE, WORD_BYTES};

pub use symboltable::SymbolTable;
use syntax::{AddressPart, Atom, BinaryOperator, Expression, Line, WValue};

type AssemblyResult<T> = Result<T, AssemblyError>;

#[derive(StrumDisplay, Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Severity {
  #[strum(serialize = "error")]
  Error,
  #[strum(serialize = "warning")]
  Warning
}

/// A problem with one line of the program.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
  /// Counted from 1.
  pub line     : usize,
  pub text     : String,
  pub severity : Severity,
  pub error    : AssemblyError
}

impl Display for Diagnostic {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "line {}: {}: {}\n    {}", self.line, self.severity, self.error, self.text)
  }
}

/// The product of assembly.
#[derive(Clone, Debug)]
pub struct Assembly {
  pub memory      : Vec<Word>,
  pub symbols     : SymbolTable,
  /// The location named by `END`, if there was one.
  pub entry       : Option<usize>,
  pub diagnostics : Vec<Diagnostic>,
  /// False if any diagnostic is an error. Warnings do not count.
  pub succeeded   : bool
}

impl Assembly {
  pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
    self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
  }

  pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
    self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
  }
}

/// Assembles `text` into a fresh memory image of the standard size.
pub fn assemble(text: &str) -> Assembly {
  Assembler::new().assemble(text)
}

/// A location whose address (or whole word) waits for a value.
#[derive(Clone, Copy, Debug)]
struct Patch {
  location : usize,
  /// The reference was written `-SYMBOL`.
  negative : bool,
  field    : FieldSpec,
  line     : usize
}

/// Per-run state. Nothing here outlives one call to `assemble`.
pub struct Assembler {
  location     : usize,
  memory       : Vec<Word>,
  symbols      : SymbolTable,
  /// Future references by symbol, and the symbols in the order they were first referenced.
  future       : HashMap<DefaultAtom, Vec<Patch>>,
  future_order : Vec<DefaultAtom>,
  literals     : Vec<(Word, Patch)>,
  /// The entry point, or the symbol naming it if that was a future reference.
  entry        : Option<usize>,
  entry_symbol : Option<(DefaultAtom, usize)>,
  end_label    : Option<(String, usize)>,
  diagnostics  : Vec<Diagnostic>
}

impl Default for Assembler {
  fn default() -> Assembler {
    Assembler::with_memory_size(MEMORY_SIZE)
  }
}

impl Assembler {

  pub fn new() -> Assembler {
    Assembler::default()
  }

  pub fn with_memory_size(size: usize) -> Assembler {
    Assembler{
      location     : 0,
      memory       : vec![Word::ZERO; size],
      symbols      : SymbolTable::new(),
      future       : HashMap::new(),
      future_order : Vec::new(),
      literals     : Vec::new(),
      entry        : None,
      entry_symbol : None,
      end_label    : None,
      diagnostics  : Vec::new()
    }
  }

  pub fn assemble(mut self, text: &str) -> Assembly {
    let lines: Vec<&str> = text.lines().collect();

    for (number, line) in lines.iter().enumerate() {
      let number = number + 1;
      if syntax::is_comment(line) {
        continue;
      }

      match self.assemble_line(line, number) {
        Ok(true)   => {
          debug!("END at line {}", number);
          break;
        }
        Ok(false)  => debug!("{:>5} {:04} {}", number, self.location, line.trim_end()),
        Err(error) => self.report(number, line, Severity::Error, error)
      }
    }

    self.resolve(&lines);

    let succeeded = self.diagnostics.iter().all(|d| d.severity != Severity::Error);
    debug!(
      "assembled {} symbols, {} diagnostics, succeeded: {}",
      self.symbols.len(), self.diagnostics.len(), succeeded
    );

    Assembly{
      memory      : self.memory,
      symbols     : self.symbols,
      entry       : self.entry,
      diagnostics : self.diagnostics,
      succeeded
    }
  }

  fn report(&mut self, line: usize, text: &str, severity: Severity, error: AssemblyError) {
    warn!("line {}: {}: {}", line, severity, error);
    self.diagnostics.push(Diagnostic{ line, text: text.to_string(), severity, error });
  }

  // region First pass

  /// Returns `true` at `END`.
  fn assemble_line(&mut self, text: &str, number: usize) -> AssemblyResult<bool> {
    let line = syntax::split_line(text)?;
    let spec =
      lookup_mnemonic(line.operation)
        .ok_or_else(|| AssemblyError::UnknownOperation(line.operation.to_string()))?;

    match spec.code {
      EQU => {
        let value = self.w_value(&syntax::parse_w_value(line.operand)?)?;
        if let Some(label) = line.label {
          self.define(label, value.value())?;
        }
      }

      ORIG => {
        self.define_label(&line)?;
        let value = self.w_value(&syntax::parse_w_value(line.operand)?)?.value();
        if value < 0 || value as usize >= self.memory.len() {
          return Err(AssemblyError::OutOfRange{ what: "location", value });
        }
        self.location = value as usize;
      }

      CON => {
        self.define_label(&line)?;
        self.constant(line.operand, number)?;
      }

      ALF => {
        self.define_label(&line)?;
        let word = alf_word(&syntax::alf_text(line.rest))?;
        self.emit(word)?;
      }

      END => {
        if let Some(label) = line.label {
          if let Some(value) = self.symbols.get(label) {
            return Err(AssemblyError::DuplicateSymbol{ name: label.to_string(), value });
          }
          self.end_label = Some((label.to_string(), number));
        }
        self.end(line.operand, number)?;
        return Ok(true);
      }

      _ => {
        self.define_label(&line)?;
        self.instruction(spec, line.operand, number)?;
      }
    }

    Ok(false)
  }

  fn define(&mut self, name: &str, value: i64) -> AssemblyResult<()> {
    self.symbols
        .insert(name, value)
        .map_err(|existing| AssemblyError::DuplicateSymbol{ name: name.to_string(), value: existing })
  }

  /// The label of an ordinary line names the location counter.
  fn define_label(&mut self, line: &Line) -> AssemblyResult<()> {
    match line.label {
      Some(label) => self.define(label, self.location as i64),
      None        => Ok(())
    }
  }

  fn emit(&mut self, word: Word) -> AssemblyResult<()> {
    match self.memory.get_mut(self.location) {
      Some(cell) => {
        *cell = word;
        self.location += 1;
        Ok(())
      }
      None => Err(AssemblyError::OutOfRange{ what: "location", value: self.location as i64 })
    }
  }

  fn remember(&mut self, name: &str, patch: Patch) {
    let atom = DefaultAtom::from(name);
    if !self.future.contains_key(&atom) {
      self.future_order.push(atom.clone());
    }
    self.future.entry(atom).or_insert_with(Vec::new).push(patch);
  }

  fn instruction(&mut self, spec: OpSpec, operand: &str, number: usize) -> AssemblyResult<()> {
    let operand = syntax::parse_operand(operand)?;

    let index = match &operand.index {
      Some(expression) => self.evaluate(expression)?,
      None             => 0
    };
    if index < 0 || index > MAX_INDEX as i64 {
      return Err(AssemblyError::OutOfRange{ what: "index", value: index });
    }

    let field = match &operand.field {
      Some(expression) => self.evaluate(expression)?,
      None             => spec.field as i64
    };
    if field < 0 || field >= BYTE_SIZE as i64 {
      return Err(AssemblyError::OutOfRange{ what: "field", value: field });
    }

    let patch = Patch{ location: self.location, negative: false, field: FieldSpec::ADDRESS, line: number };
    let address = match &operand.address {
      AddressPart::Empty => Address::default(),

      AddressPart::Expression(expression) => {
        match expression.lone_symbol() {
          Some((name, negative)) if !self.symbols.contains(name) => {
            let word = pack(spec.code, index as u8, field as u8, Address::new(negative, 0));
            self.emit(word)?;
            self.remember(name, Patch{ negative, ..patch });
            return Ok(());
          }
          _ => {
            let value = self.evaluate(expression)?;
            match (value, expression.negative) {
              // `-0` is minus zero.
              (0, true) => Address::new(true, 0),
              _         => address(value)?
            }
          }
        }
      }

      AddressPart::Literal(w_value) => {
        let value = self.w_value(w_value)?;
        self.emit(pack(spec.code, index as u8, field as u8, Address::default()))?;
        self.literals.push((value, patch));
        return Ok(());
      }
    };

    self.emit(pack(spec.code, index as u8, field as u8, address))
  }

  /// `CON`: a lone undefined symbol is a future reference to the whole word.
  fn constant(&mut self, operand: &str, number: usize) -> AssemblyResult<()> {
    let w_value = syntax::parse_w_value(operand)?;
    if let [part] = w_value.as_slice() {
      if let (Some((name, negative)), None) = (part.value.lone_symbol(), &part.field) {
        if !self.symbols.contains(name) {
          let patch = Patch{ location: self.location, negative, field: FieldSpec::WHOLE, line: number };
          self.emit(Word::new(negative, 0))?;
          self.remember(name, patch);
          return Ok(());
        }
      }
    }
    let word = self.w_value(&w_value)?;
    self.emit(word)
  }

  fn end(&mut self, operand: &str, number: usize) -> AssemblyResult<()> {
    let w_value = syntax::parse_w_value(operand)?;
    if let [part] = w_value.as_slice() {
      if let (Some((name, false)), None) = (part.value.lone_symbol(), &part.field) {
        if !self.symbols.contains(name) {
          self.entry_symbol = Some((DefaultAtom::from(name), number));
          return Ok(());
        }
      }
    }
    let value = self.w_value(&w_value)?.value();
    if value < 0 || value as usize >= self.memory.len() {
      return Err(AssemblyError::OutOfRange{ what: "entry point", value });
    }
    self.entry = Some(value as usize);
    Ok(())
  }

  // endregion

  // region Expressions

  fn atom(&self, atom: &Atom) -> AssemblyResult<i64> {
    match atom {
      Atom::Number(n) if *n > MAX_MAGNITUDE as i64 => {
        Err(AssemblyError::OutOfRange{ what: "number", value: *n })
      }
      Atom::Number(n)    => Ok(*n),
      Atom::Here         => Ok(self.location as i64),
      Atom::Symbol(name) => {
        self.symbols
            .get(name)
            .ok_or_else(|| AssemblyError::FutureReference(name.to_string()))
      }
    }
  }

  /// Left to right, with every intermediate value kept within a word.
  fn evaluate(&self, expression: &Expression) -> AssemblyResult<i64> {
    let mut value = self.atom(&expression.first)?;
    if expression.negative {
      value = -value;
    }

    for (operator, atom) in expression.rest.iter() {
      let rhs = self.atom(atom)?;
      value = match operator {
        BinaryOperator::Add       => value + rhs,
        BinaryOperator::Subtract  => value - rhs,
        BinaryOperator::Multiply  => value * rhs,
        BinaryOperator::Divide    => {
          if rhs == 0 {
            return Err(AssemblyError::DivisionByZero);
          }
          value / rhs
        }
        BinaryOperator::FractionDivide => {
          if rhs == 0 {
            return Err(AssemblyError::DivisionByZero);
          }
          ((value as i128 * (MAX_MAGNITUDE as i128 + 1)) / rhs as i128) as i64
        }
        BinaryOperator::Field     => 8 * value + rhs
      };
      if value.abs() > MAX_MAGNITUDE as i64 {
        return Err(AssemblyError::OutOfRange{ what: "expression", value });
      }
    }

    Ok(value)
  }

  /// Each part `E(F)` is stored into field `F` of a word that starts as `+0`. `F` defaults to
  /// `(0:5)`.
  fn w_value(&self, w_value: &WValue) -> AssemblyResult<Word> {
    let mut word = Word::ZERO;
    for part in w_value.iter() {
      let value = self.evaluate(&part.value)?;
      let spec  = match &part.field {
        Some(expression) => {
          let code = self.evaluate(expression)?;
          match code {
            0..=63 => FieldSpec::from_code(code as u8),
            _      => None
          }.ok_or(AssemblyError::OutOfRange{ what: "field", value: code })?
        }
        None => FieldSpec::WHOLE
      };
      let source = Word::from_value(value)
                     .ok_or(AssemblyError::OutOfRange{ what: "W-value", value })?;
      word = field::insert(word, spec, source);
    }
    Ok(word)
  }

  // endregion

  // region Second pass

  fn resolve(&mut self, lines: &[&str]) {
    let source = |line: usize| lines.get(line - 1).copied().unwrap_or("");

    // Undefined symbols, in order of first reference, then the symbol named by END.
    let mut undefined: Vec<(DefaultAtom, usize)> =
      self.future_order
          .iter()
          .filter(|atom| !self.symbols.contains(atom))
          .map(|atom| (atom.clone(), self.future[atom][0].line))
          .collect();
    if let Some((atom, line)) = &self.entry_symbol {
      if !self.symbols.contains(atom) && !undefined.iter().any(|(a, _)| a == atom) {
        undefined.push((atom.clone(), *line));
      }
    }

    for (atom, line) in undefined {
      let location = self.location;
      let result   = self.emit(Word::ZERO).and_then(|_| self.define(&atom, location as i64));
      match result {
        Ok(()) => {
          let warning = AssemblyError::UndefinedSymbol{ name: atom.to_string(), location };
          self.report(line, source(line), Severity::Warning, warning);
        }
        Err(error) => self.report(line, source(line), Severity::Error, error)
      }
    }

    for (value, patch) in std::mem::replace(&mut self.literals, Vec::new()) {
      let location = self.location;
      match self.emit(value) {
        Ok(())     => self.patch(patch, location as i64, source(patch.line)),
        Err(error) => self.report(patch.line, source(patch.line), Severity::Error, error)
      }
    }

    for atom in std::mem::replace(&mut self.future_order, Vec::new()) {
      let value   = self.symbols.get(&atom);
      let patches = self.future.remove(&atom).unwrap_or_default();
      if let Some(value) = value {
        for patch in patches {
          self.patch(patch, value, source(patch.line));
        }
      }
    }

    if let Some((atom, line)) = self.entry_symbol.take() {
      match self.symbols.get(&atom) {
        Some(value) if value >= 0 && (value as usize) < self.memory.len() => {
          self.entry = Some(value as usize);
        }
        Some(value) => {
          let error = AssemblyError::OutOfRange{ what: "entry point", value };
          self.report(line, source(line), Severity::Error, error);
        }
        None => {}
      }
    }

    if let Some((label, line)) = self.end_label.take() {
      if let Err(error) = self.define(&label, self.location as i64) {
        self.report(line, source(line), Severity::Error, error);
      }
    }
  }

  /// Splices a resolved value into a remembered location.
  fn patch(&mut self, patch: Patch, value: i64, text: &str) {
    let value = if patch.negative { -value } else { value };
    // `-SYMBOL` with a zero value is minus zero.
    let word = match Word::from_value(value) {
      Some(word) if value == 0 => Some(word.with_sign(patch.negative)),
      word                     => word
    };
    let fits = patch.field != FieldSpec::ADDRESS || value.abs() <= MAX_ADDRESS as i64;

    match (word, fits) {
      (Some(word), true) => {
        let cell = &mut self.memory[patch.location];
        *cell = field::insert(*cell, patch.field, word);
      }
      _ => {
        let error = AssemblyError::OutOfRange{ what: "address", value };
        self.report(patch.line, text, Severity::Error, error);
      }
    }
  }

  // endregion

}

fn address(value: i64) -> AssemblyResult<Address> {
  match value.abs() <= MAX_ADDRESS as i64 {
    true  => Ok(Address::from_value(value)),
    false => Err(AssemblyError::OutOfRange{ what: "address", value })
  }
}

fn alf_word(text: &str) -> AssemblyResult<Word> {
  let mut bytes = [0u8; WORD_BYTES];
  for (byte, c) in bytes.iter_mut().zip(text.chars()) {
    *byte = charset::encode(c).ok_or(AssemblyError::BadCharacter(c))?;
  }
  Ok(Word::from_bytes(false, bytes))
}
