/*!
  An assembler and stack machine for Yula bytecode.

  The assembler turns line oriented assembly source into bytecode in two passes over the emitted
  code: jumps to labels that are already defined are resolved as they are emitted, and jumps to
  labels defined later are patched once the whole program is known. The machine loads bytecode
  into a fixed capacity code area and executes it against an operand stack of 32 bit words.
*/

#[macro_use] extern crate prettytable;
#[macro_use] extern crate lazy_static;

pub mod bytecode;
pub mod compiler;
pub mod config;
pub mod error;
pub mod register;
pub mod vm;

pub use bytecode::{Bytecode, Instruction, Opcode, Word};
pub use compiler::{assemble, compile, Compilation};
pub use config::Config;
pub use error::{CompileError, ConfigError, Fault, FormatError, LoadError, Location, VmError};
pub use vm::{execute, execute_bytes, ExitStatus, Machine};
