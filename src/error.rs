//! Error types for every stage of the pipeline. Every fatal condition surfaces as its own named
//! variant, and none of them is recovered from internally: compilation yields either a complete,
//! fully resolved artifact or one of these.

use std::fmt::{Display, Formatter};
use std::io;

use string_cache::DefaultAtom;
use thiserror::Error;

/// A position in a source file. Lines and columns count from 1.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Location {
  pub file   : DefaultAtom,
  pub line   : usize,
  pub column : usize,
}

impl Location {
  pub fn new(file: &DefaultAtom, line: usize, column: usize) -> Location {
    Location {
      file: file.clone(),
      line,
      column
    }
  }
}

impl Display for Location {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}:{}", self.file, self.line, self.column)
  }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CompileError {
  /// Wrong token where a construct is expected, or a character the tokenizer does not know.
  #[error("{location} ERROR: {message}")]
  Syntax {
    location : Location,
    message  : String
  },

  #[error("{location} ERROR: `{text}` is not a 32 bit integer")]
  InvalidLiteral {
    location : Location,
    text     : String
  },

  /// An operand of the wrong kind, e.g. a literal on the left of a `mov`.
  #[error("{location} ERROR: {message}")]
  TypeMismatch {
    location : Location,
    message  : String
  },

  #[error("{location} ERROR: undefined symbol `{symbol}`")]
  UndefinedSymbol {
    symbol   : DefaultAtom,
    location : Location
  },

  #[error("{location} ERROR: label `{name}` is already defined at {first}")]
  DuplicateLabel {
    name     : DefaultAtom,
    location : Location,
    first    : Location
  },

  #[error("ERROR: no entry point declared")]
  NoEntryPoint,

  #[error("{location} ERROR: entry point is already declared at {first}")]
  DuplicateEntryPoint {
    location : Location,
    first    : Location
  },

  #[error("{location} ERROR: program exceeds the maximum of {capacity} instructions")]
  TooManyInstructions {
    capacity : usize,
    location : Location
  },
}

impl CompileError {
  /// The source position the error refers to, if it has one.
  pub fn location(&self) -> Option<&Location> {
    match self {
      | CompileError::Syntax { location, .. }
      | CompileError::InvalidLiteral { location, .. }
      | CompileError::TypeMismatch { location, .. }
      | CompileError::UndefinedSymbol { location, .. }
      | CompileError::DuplicateLabel { location, .. }
      | CompileError::DuplicateEntryPoint { location, .. }
      | CompileError::TooManyInstructions { location, .. } => Some(location),

      CompileError::NoEntryPoint => None
    }
  }
}

/// A byte buffer that is not a well formed bytecode container.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum FormatError {
  #[error("not valid bytecode: {size} bytes is shorter than the 8 byte header")]
  TooShort { size: usize },

  #[error("not valid bytecode: {size} bytes is not a header plus whole 8 byte records")]
  BadSize { size: usize },

  #[error("not valid bytecode: bad magic {found:?}")]
  BadMagic { found: [u8; 2] },

  #[error("not valid bytecode: reserved header bytes are not zero")]
  NonZeroReserved,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum LoadError {
  #[error(transparent)]
  Format(#[from] FormatError),

  #[error("code has {count} instructions but the machine holds at most {capacity}")]
  CodeTooLarge {
    count    : usize,
    capacity : usize
  },
}

/// A fatal run-time condition. The machine never continues past one.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum Fault {
  #[error("stack overflow")]
  StackOverflow,

  #[error("stack underflow")]
  StackUnderflow,

  #[error("illegal instruction")]
  IllegalInstruction,

  #[error("illegal syscall {0}")]
  IllegalSyscall(i32),

  #[error("illegal register {0}")]
  IllegalRegister(i32),

  #[error("division by zero")]
  DivisionByZero,
}

#[derive(Debug, Error)]
pub enum VmError {
  #[error(transparent)]
  Load(#[from] LoadError),

  #[error("SIGNAL: {fault} (ip = {ip})")]
  Fault {
    fault : Fault,
    ip    : usize
  },

  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("i/o error: {0}")]
  Io(#[from] io::Error),
}

impl VmError {
  /// The fault that stopped the machine, if that is what happened.
  pub fn fault(&self) -> Option<Fault> {
    match self {
      VmError::Fault { fault, .. } => Some(*fault),
      _                            => None
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
  #[error("{name} of {value} does not fit in a 32 bit word")]
  CapacityTooLarge {
    name  : &'static str,
    value : usize
  },

  #[error("stack origin {origin} lies outside the {capacity} byte memory")]
  StackOriginOutOfBounds {
    origin   : usize,
    capacity : usize
  },
}
