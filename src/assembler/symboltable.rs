use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use prettytable::{format as TableFormat, Table};
use string_cache::DefaultAtom;

/**
  A symbol table maps MIXAL symbols to their values: an address for a label, anything that fits
  in a word for `EQU`. A symbol is defined at most once. Names are case sensitive.

  Definition order is kept so that listings read like the program.
*/
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
  table : HashMap<DefaultAtom, i64>,
  order : Vec<DefaultAtom>
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable::default()
  }

  pub fn get(&self, name: &str) -> Option<i64> {
    self.table.get(&DefaultAtom::from(name)).copied()
  }

  pub fn contains(&self, name: &str) -> bool {
    self.table.contains_key(&DefaultAtom::from(name))
  }

  /// Defines `name`. If it is already defined, the existing value is returned as the error.
  pub fn insert(&mut self, name: &str, value: i64) -> Result<(), i64> {
    let atom = DefaultAtom::from(name);
    match self.table.get(&atom) {
      Some(existing) => Err(*existing),
      None => {
        self.table.insert(atom.clone(), value);
        self.order.push(atom);
        Ok(())
      }
    }
  }

  pub fn len(&self) -> usize {
    self.order.len()
  }

  pub fn is_empty(&self) -> bool {
    self.order.is_empty()
  }

  /// Symbols in definition order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
    self.order
        .iter()
        .map(move |atom| (&**atom, self.table[atom]))
  }
}

impl Display for SymbolTable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mut table = Table::new();

    table.set_format(*TableFormat::consts::FORMAT_CLEAN);
    table.set_titles(row![ubl->"Symbol", ubr->"Value"]);
    for (name, value) in self.iter() {
      table.add_row(row![name, r->value]);
    }

    write!(f, "{}", table)
  }
}
