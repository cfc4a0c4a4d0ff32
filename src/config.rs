//! Machine and assembler limits. A `Config` is built once at startup and passed by reference to
//! both the generator and the machine; neither keeps any configuration of its own.

use crate::error::ConfigError;
use crate::register::RegisterTable;
use crate::vm::SyscallTable;

/// Instructions the machine's code area holds.
pub const DEFAULT_CODE_CAPACITY    : usize = 12232;
/// Bytes of machine memory. The stack lives in it.
pub const DEFAULT_MEMORY_CAPACITY  : usize = 64000;
/// Where the stack starts, as a byte offset into memory.
pub const DEFAULT_STACK_ORIGIN     : usize = 21000;
/// Instructions the generator emits before giving up.
pub const DEFAULT_MAX_INSTRUCTIONS : usize = 65000;

#[derive(Clone, Debug)]
pub struct Config {
  pub registers        : RegisterTable,
  pub syscalls         : SyscallTable,
  pub max_instructions : usize,
  pub code_capacity    : usize,
  pub memory_capacity  : usize,
  pub stack_origin     : usize,
}

impl Default for Config {
  fn default() -> Config {
    Config {
      registers        : RegisterTable::default(),
      syscalls         : SyscallTable::default(),
      max_instructions : DEFAULT_MAX_INSTRUCTIONS,
      code_capacity    : DEFAULT_CODE_CAPACITY,
      memory_capacity  : DEFAULT_MEMORY_CAPACITY,
      stack_origin     : DEFAULT_STACK_ORIGIN,
    }
  }
}

impl Config {
  pub fn with_max_instructions(mut self, max_instructions: usize) -> Config {
    self.max_instructions = max_instructions;
    self
  }

  pub fn with_code_capacity(mut self, code_capacity: usize) -> Config {
    self.code_capacity = code_capacity;
    self
  }

  pub fn with_memory_capacity(mut self, memory_capacity: usize) -> Config {
    self.memory_capacity = memory_capacity;
    self
  }

  pub fn with_stack_origin(mut self, stack_origin: usize) -> Config {
    self.stack_origin = stack_origin;
    self
  }

  pub fn with_syscalls(mut self, syscalls: SyscallTable) -> Config {
    self.syscalls = syscalls;
    self
  }

  /// Addresses and stack offsets are pushed as 32 bit words, so every limit has to fit in one.
  pub fn validate(&self) -> Result<(), ConfigError> {
    let word_max = i32::MAX as usize;

    for (name, value) in [
      ("code capacity", self.code_capacity),
      ("memory capacity", self.memory_capacity),
      ("instruction limit", self.max_instructions),
    ] {
      if value > word_max {
        return Err(ConfigError::CapacityTooLarge { name, value });
      }
    }

    if self.stack_origin > self.memory_capacity {
      return Err(ConfigError::StackOriginOutOfBounds {
        origin   : self.stack_origin,
        capacity : self.memory_capacity
      });
    }

    Ok(())
  }
}
