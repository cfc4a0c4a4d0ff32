use std::collections::HashMap;

use string_cache::DefaultAtom;

use crate::error::{CompileError, Location};

/// A label definition: a name bound to the address of the next instruction emitted after it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Label {
  pub name     : DefaultAtom,
  pub address  : usize,
  pub location : Location,
}

/// A `JUMP` whose operand could not be filled in when it was emitted because its target label
/// was not defined yet.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnresolvedReference {
  pub patch_site : usize,
  pub symbol     : DefaultAtom,
  pub location   : Location,
}

/**
  A symbol table maps label names to the label definition. Several labels may name the same
  address, so unlike the register table this is not a bijection.
*/
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
  table: HashMap<DefaultAtom, Label>
}

impl SymbolTable {

  pub fn new() -> SymbolTable {
    SymbolTable::default()
  }

  pub fn get_address(&self, name: &DefaultAtom) -> Option<usize> {
    self.table.get(name).map(|label| label.address)
  }

  /// Labels are never redefined. The error names both definitions.
  pub fn insert(&mut self, label: Label) -> Result<(), CompileError> {
    if let Some(first) = self.table.get(&label.name) {
      return Err(CompileError::DuplicateLabel {
        name     : label.name,
        location : label.location,
        first    : first.location.clone()
      });
    }

    self.table.insert(label.name.clone(), label);
    Ok(())
  }

  /// `(name, address)` pairs ordered by address, then name.
  pub fn addresses(&self) -> Vec<(DefaultAtom, usize)> {
    let mut pairs: Vec<(DefaultAtom, usize)> =
      self.table.values().map(|label| (label.name.clone(), label.address)).collect();
    pairs.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| (&*a.0).cmp(&*b.0)));
    pairs
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}
