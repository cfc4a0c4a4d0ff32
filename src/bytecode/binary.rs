/*!
  This module is responsible for the encoding and decoding of binary instructions and of the
  bytecode container that holds them.

  The container is byte-exact:
  ```text
  offset 0..2   : magic "YM"
  offset 2..8   : reserved, zero
  offset 8..    : N records, each [opcode: i32 LE][operand: i32 LE]
  ```
  A reader rejects any buffer whose size is not `8 + 8 * N` or whose header is wrong, before a
  single instruction is looked at.
*/
use std::fs;
use std::io;
use std::path::Path;

use super::{Instruction, Opcode};
use crate::error::FormatError;

// If you change these you must also change `encode_instruction` and `try_decode_instruction`.
pub type Word = i32;
pub type DoubleWord = u64;

pub const MAGIC       : [u8; 2] = *b"YM";
pub const HEADER_SIZE : usize   = 8;
pub const RECORD_SIZE : usize   = 8;

/// Packs an instruction into one record. The opcode is the low word, so the little-endian bytes
/// of the record are the opcode followed by the operand.
pub fn encode_instruction(instruction: &Instruction) -> DoubleWord {
  (instruction.opcode.code() as u32 as DoubleWord)
    | ((instruction.operand as u32 as DoubleWord) << 32)
}

/// Returns `None` if the low word is not the ordinal of any `Opcode`.
pub fn try_decode_instruction(record: DoubleWord) -> Option<Instruction> {
  let opcode  = Opcode::try_from((record & 0xFFFF_FFFF) as u32 as Word).ok()?;
  let operand = (record >> 32) as u32 as Word;

  Some(Instruction::new(opcode, operand))
}

/// An ordered sequence of encoded instruction records.
///
/// Records are kept encoded. Whether a record holds a defined opcode is only decided when it is
/// decoded, which for the machine means when it is fetched.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Bytecode {
  code: Vec<DoubleWord>,
}

impl Bytecode {
  pub fn new() -> Bytecode {
    Bytecode::default()
  }

  pub fn from_records(code: Vec<DoubleWord>) -> Bytecode {
    Bytecode { code }
  }

  pub fn from_instructions(instructions: &[Instruction]) -> Bytecode {
    Bytecode {
      code: instructions.iter().map(encode_instruction).collect()
    }
  }

  pub fn push(&mut self, instruction: &Instruction) {
    self.code.push(encode_instruction(instruction));
  }

  pub fn records(&self) -> &[DoubleWord] {
    &self.code
  }

  /// Decodes every record, yielding `None` for records with an undefined opcode.
  pub fn instructions(&self) -> impl Iterator<Item = Option<Instruction>> + '_ {
    self.code.iter().map(|record| try_decode_instruction(*record))
  }

  pub fn len(&self) -> usize {
    self.code.len()
  }

  pub fn is_empty(&self) -> bool {
    self.code.is_empty()
  }

  pub fn size_in_bytes(&self) -> usize {
    HEADER_SIZE + RECORD_SIZE * self.code.len()
  }

  pub fn to_bytes(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(self.size_in_bytes());

    bytes.extend_from_slice(&MAGIC);
    bytes.resize(HEADER_SIZE, 0);
    for record in self.code.iter() {
      bytes.extend_from_slice(&record.to_le_bytes());
    }

    bytes
  }

  pub fn from_bytes(bytes: &[u8]) -> Result<Bytecode, FormatError> {
    let size = bytes.len();

    if size < HEADER_SIZE {
      return Err(FormatError::TooShort { size });
    }
    if (size - HEADER_SIZE) % RECORD_SIZE != 0 {
      return Err(FormatError::BadSize { size });
    }
    if bytes[..2] != MAGIC {
      return Err(FormatError::BadMagic { found: [bytes[0], bytes[1]] });
    }
    if bytes[2..HEADER_SIZE].iter().any(|b| *b != 0) {
      return Err(FormatError::NonZeroReserved);
    }

    let code =
      bytes[HEADER_SIZE..]
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| {
          let mut record = [0u8; RECORD_SIZE];
          record.copy_from_slice(chunk);
          DoubleWord::from_le_bytes(record)
        })
        .collect();

    Ok(Bytecode { code })
  }

  /// Reads and validates a container. A malformed container is reported as `InvalidData`.
  pub fn read<P: AsRef<Path>>(path: P) -> io::Result<Bytecode> {
    let bytes = fs::read(path)?;
    Bytecode::from_bytes(&bytes).map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
  }

  /// Writes the serialized container to `path`, replacing anything already there.
  pub fn write<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
    fs::write(path, self.to_bytes())
  }
}
