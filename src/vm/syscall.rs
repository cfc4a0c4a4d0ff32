//! The closed set of system calls. A `SYSCALL` instruction dispatches on the value of `v0`.

use std::collections::HashMap;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, IntoStaticStr};

use crate::bytecode::Word;

#[derive(
  StrumDisplay, IntoStaticStr, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,       PartialEq,        Debug,        Hash
)]
#[strum(serialize_all = "snake_case")]
#[repr(i32)]
pub enum Syscall {
  /// Write the machine state to the output stream.
  Dump  = 0,
  /// Write `v1` and a newline to the output stream.
  Print = 1,
  /// Stop the machine with exit code `v1`.
  Exit  = 2,
}

impl Syscall {
  pub fn number(&self) -> Word {
    Into::<Word>::into(*self)
  }
}

/// Maps syscall numbers to syscalls. Numbers missing from the table fault with `IllegalSyscall`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SyscallTable {
  table: HashMap<Word, Syscall>
}

impl SyscallTable {
  pub fn new() -> SyscallTable {
    SyscallTable {
      table: HashMap::new()
    }
  }

  pub fn get(&self, number: Word) -> Option<Syscall> {
    self.table.get(&number).copied()
  }

  /// Leaves `syscall` out of the table, e.g. to run untrusted code without `exit`.
  pub fn without(mut self, syscall: Syscall) -> SyscallTable {
    self.table.retain(|_, s| *s != syscall);
    self
  }

  pub fn with(mut self, syscall: Syscall) -> SyscallTable {
    self.table.insert(syscall.number(), syscall);
    self
  }
}

impl Default for SyscallTable {
  fn default() -> SyscallTable {
    use strum::IntoEnumIterator;

    Syscall::iter().fold(SyscallTable::new(), SyscallTable::with)
  }
}
