/*!

  The instruction set shared by the assembler and the machine. Every instruction is a fixed width
  pair of an opcode and a single 32 bit operand, so a record is always 8 bytes:

    Opcode:  32 bits, little-endian, the ordinal of the `Opcode` variant
    Operand: 32 bits, little-endian, two's complement

  Instructions that take no operand carry a zero operand. There is no variable length encoding.

  The opcode ordinals double as the wire encoding. New opcodes may only be appended to the end of
  `Opcode`. Inserting or reordering variants silently changes the meaning of every binary that
  has already been assembled.

*/

mod binary;
pub mod assembly;

pub use binary::{encode_instruction, try_decode_instruction, Bytecode, DoubleWord, Word,
                 HEADER_SIZE, MAGIC, RECORD_SIZE};

use std::fmt::{Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString, IntoStaticStr};

/**
  Opcodes of the virtual machine.

  The order the opcodes are listed below is significant: it is the binary encoding. Append only.
*/
#[derive(
  StrumDisplay, IntoStaticStr, EnumString, EnumIter, TryFromPrimitive, IntoPrimitive,
  Clone,        Copy,          Eq,         PartialEq, Debug,            Hash
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Opcode {
  PushConst,         // push_const( value )
  PopToReg,          // pop_to_reg( register )
  Syscall,           // syscall
  #[strum(serialize = "MOV_REG0")]
  MovReg0,           // mov_reg0( value )
  #[strum(serialize = "MOV_REG1")]
  MovReg1,           // mov_reg1( value )
  Jump,              // jump( address )
  Add,
  Sub,
  Mul,
  Div,
  PushReg,           // push_reg( register )
  PushIp,
  PushBp,
  PushSp,
  JumpIndirect,
}

impl Opcode {
  pub fn code(&self) -> Word {
    Into::<Word>::into(*self)
  }

  /// Whether the operand of this opcode means anything. The rest always carry zero.
  pub fn has_operand(&self) -> bool {
    match self {
      | Opcode::PushConst
      | Opcode::PopToReg
      | Opcode::MovReg0
      | Opcode::MovReg1
      | Opcode::Jump
      | Opcode::PushReg => true,

      | Opcode::Syscall
      | Opcode::Add
      | Opcode::Sub
      | Opcode::Mul
      | Opcode::Div
      | Opcode::PushIp
      | Opcode::PushBp
      | Opcode::PushSp
      | Opcode::JumpIndirect => false,
    }
  }
}

/// The unencoded components of an instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Instruction {
  pub opcode  : Opcode,
  pub operand : Word,
}

impl Instruction {
  /// The operand is dropped for opcodes that take none.
  pub fn new(opcode: Opcode, operand: Word) -> Instruction {
    match opcode.has_operand() {
      true  => Instruction { opcode, operand },
      false => Instruction { opcode, operand: 0 }
    }
  }

  pub fn nullary(opcode: Opcode) -> Instruction {
    Instruction { opcode, operand: 0 }
  }
}

impl Display for Instruction {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self.opcode.has_operand() {
      true  => write!(f, "{} {}", self.opcode, self.operand),
      false => write!(f, "{}", self.opcode)
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn opcode_ordinals_are_the_wire_encoding() {
    let expected = [
      "PUSH_CONST", "POP_TO_REG", "SYSCALL", "MOV_REG0", "MOV_REG1", "JUMP", "ADD", "SUB", "MUL",
      "DIV", "PUSH_REG", "PUSH_IP", "PUSH_BP", "PUSH_SP", "JUMP_INDIRECT",
    ];
    let opcodes: Vec<Opcode> = Opcode::iter().collect();
    assert_eq!(opcodes.len(), expected.len());
    for (ordinal, (opcode, name)) in opcodes.iter().zip(expected.iter()).enumerate() {
      assert_eq!(opcode.code(), ordinal as Word);
      assert_eq!(opcode.to_string(), *name);
      assert_eq!(Opcode::from_str(name), Ok(*opcode));
    }
  }

  #[test]
  fn unknown_ordinals_do_not_decode() {
    assert!(Opcode::try_from(15).is_err());
    assert!(Opcode::try_from(-1).is_err());
    assert_eq!(Opcode::try_from(14).ok(), Some(Opcode::JumpIndirect));
  }

  #[test]
  fn nullary_operands_are_zeroed() {
    assert_eq!(Instruction::new(Opcode::Add, 99).operand, 0);
    assert_eq!(Instruction::new(Opcode::PushConst, 99).operand, 99);
    assert_eq!(Instruction::new(Opcode::Add, 99).to_string(), "ADD");
    assert_eq!(Instruction::new(Opcode::Jump, 4).to_string(), "JUMP 4");
  }
}
