//! The statements of an assembly program, as they come out of the parser. Operands are kept
//! unresolved: literal text is not yet parsed and register names are not yet looked up, so that
//! every semantic error is reported by the generator with the offending operand's location.

use std::fmt::{Display, Formatter};

use string_cache::DefaultAtom;

use crate::bytecode::Opcode;
use crate::error::Location;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
  Integer {
    text     : String,
    location : Location
  },
  Register {
    name     : DefaultAtom,
    location : Location
  },
  Identifier {
    name     : DefaultAtom,
    location : Location
  },
}

impl Operand {
  pub fn location(&self) -> &Location {
    match self {
      | Operand::Integer { location, .. }
      | Operand::Register { location, .. }
      | Operand::Identifier { location, .. } => location
    }
  }
}

impl Display for Operand {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Operand::Integer { text, .. }    => write!(f, "{}", text),
      Operand::Register { name, .. }   => write!(f, "{}", name),
      Operand::Identifier { name, .. } => write!(f, "{}", name),
    }
  }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ArithmeticOperator {
  Add,
  Sub,
  Mul,
  Div,
}

impl ArithmeticOperator {
  pub fn opcode(&self) -> Opcode {
    match self {
      ArithmeticOperator::Add => Opcode::Add,
      ArithmeticOperator::Sub => Opcode::Sub,
      ArithmeticOperator::Mul => Opcode::Mul,
      ArithmeticOperator::Div => Opcode::Div,
    }
  }
}

impl Display for ArithmeticOperator {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let mnemonic =
      match self {
        ArithmeticOperator::Add => "add",
        ArithmeticOperator::Sub => "sub",
        ArithmeticOperator::Mul => "mul",
        ArithmeticOperator::Div => "div",
      };
    write!(f, "{}", mnemonic)
  }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Statement {
  Push {
    operand  : Operand,
    location : Location
  },
  Pop {
    register : Operand,
    location : Location
  },
  Mov {
    target   : Operand,
    value    : Operand,
    location : Location
  },
  Syscall {
    location : Location
  },
  Arithmetic {
    operator : ArithmeticOperator,
    location : Location
  },
  Label {
    name     : DefaultAtom,
    location : Location
  },
  Jump {
    target   : DefaultAtom,
    location : Location
  },
  JumpIndirect {
    location : Location
  },
  Entry {
    label    : DefaultAtom,
    location : Location
  },
}

impl Statement {
  pub fn location(&self) -> &Location {
    match self {
      | Statement::Push { location, .. }
      | Statement::Pop { location, .. }
      | Statement::Mov { location, .. }
      | Statement::Syscall { location }
      | Statement::Arithmetic { location, .. }
      | Statement::Label { location, .. }
      | Statement::Jump { location, .. }
      | Statement::JumpIndirect { location }
      | Statement::Entry { location, .. } => location
    }
  }
}

/// Renders the statement back into source form.
impl Display for Statement {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Statement::Push { operand, .. }        => write!(f, "push {}", operand),
      Statement::Pop { register, .. }        => write!(f, "pop {}", register),
      Statement::Mov { target, value, .. }   => write!(f, "mov {}, {}", target, value),
      Statement::Syscall { .. }              => write!(f, "syscall"),
      Statement::Arithmetic { operator, .. } => write!(f, "{}", operator),
      Statement::Label { name, .. }          => write!(f, "{}:", name),
      Statement::Jump { target, .. }         => write!(f, "jmp {}", target),
      Statement::JumpIndirect { .. }         => write!(f, "jmpi"),
      Statement::Entry { label, .. }         => write!(f, "entry {}", label),
    }
  }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Program {
  pub statements: Vec<Statement>,
}

impl Display for Program {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    for statement in self.statements.iter() {
      match statement {
        Statement::Label { .. } => writeln!(f, "{}", statement)?,
        _                       => writeln!(f, "    {}", statement)?,
      }
    }
    Ok(())
  }
}
