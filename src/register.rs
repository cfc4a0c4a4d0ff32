//! Register names and the table mapping between a register's textual name and the register it
//! denotes.

use std::fmt::{Display, Formatter};

use bimap::BiMap;
use string_cache::DefaultAtom;

use crate::bytecode::Word;

/// The number a general register is addressed by in `PUSH_REG` and `POP_TO_REG`.
pub type RegisterId = Word;

/// The machine has exactly two general registers, `v0` and `v1`.
pub const GENERAL_REGISTER_COUNT: RegisterId = 2;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub enum Register {
  General(RegisterId),
  /// The pseudo-registers can be pushed but never written.
  InstructionPointer,
  BasePointer,
  StackPointer
}

impl Register {
  pub fn general_id(&self) -> Option<RegisterId> {
    match self {
      Register::General(id) => Some(*id),
      _                     => None
    }
  }
}

impl Display for Register {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Register::General(id)        => write!(f, "v{}", id),
      Register::InstructionPointer => write!(f, "ip"),
      Register::BasePointer        => write!(f, "bp"),
      Register::StackPointer       => write!(f, "sp"),
    }
  }
}

/// Whether `word` is spelled like a register: `v` followed by digits, or one of the
/// pseudo-registers. Whether such a register exists is a question for `RegisterTable`.
pub fn looks_like_register(word: &str) -> bool {
  match word {
    "ip" | "bp" | "sp" => true,
    _ => {
      match word.strip_prefix('v') {
        Some(digits) => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        None         => false
      }
    }
  }
}

/**
  The fixed name <-> register table. It is built once and handed by reference to the assembler,
  which resolves names to registers, and to the machine, which resolves registers back to names
  for tracing. A register table is really just a convenience wrapper around a BiMap.
*/
#[derive(Clone, Debug)]
pub struct RegisterTable {
  table: BiMap<DefaultAtom, Register>
}

impl RegisterTable {

  pub fn new() -> RegisterTable {
    RegisterTable {
      table: BiMap::new()
    }
  }

  pub fn get_register(&self, name: &str) -> Option<Register> {
    self.table.get_by_left(&DefaultAtom::from(name)).cloned()
  }

  pub fn get_name(&self, register: &Register) -> Option<&DefaultAtom> {
    self.table.get_by_right(register)
  }

  /// Neither the name nor the register may already be present.
  pub fn insert(&mut self, name: &str, register: Register) -> Result<(), (DefaultAtom, Register)> {
    self.table.insert_no_overwrite(DefaultAtom::from(name), register)
  }

  pub fn len(&self) -> usize {
    self.table.len()
  }

  pub fn is_empty(&self) -> bool {
    self.table.is_empty()
  }
}

impl Default for RegisterTable {
  fn default() -> RegisterTable {
    let mut table = BiMap::new();

    for id in 0..GENERAL_REGISTER_COUNT {
      let register = Register::General(id);
      table.insert(DefaultAtom::from(register.to_string()), register);
    }
    for register in [Register::InstructionPointer, Register::BasePointer, Register::StackPointer] {
      table.insert(DefaultAtom::from(register.to_string()), register);
    }

    RegisterTable { table }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_table_resolves_both_ways() {
    let table = RegisterTable::default();

    assert_eq!(table.len(), 5);
    assert_eq!(table.get_register("v0"), Some(Register::General(0)));
    assert_eq!(table.get_register("v1"), Some(Register::General(1)));
    assert_eq!(table.get_register("sp"), Some(Register::StackPointer));
    assert_eq!(table.get_register("v2"), None);
    assert_eq!(table.get_name(&Register::General(1)).map(|n| &**n), Some("v1"));
  }

  #[test]
  fn insert_refuses_to_overwrite() {
    let mut table = RegisterTable::default();
    assert!(table.insert("v0", Register::General(7)).is_err());
    assert!(table.insert("acc", Register::General(0)).is_err());
    assert!(table.insert("v7", Register::General(7)).is_ok());
    assert_eq!(table.get_register("v7"), Some(Register::General(7)));
  }

  #[test]
  fn register_spelling() {
    assert!(looks_like_register("v0"));
    assert!(looks_like_register("v12"));
    assert!(looks_like_register("bp"));
    assert!(!looks_like_register("v"));
    assert!(!looks_like_register("value"));
    assert!(!looks_like_register("main"));
  }
}
