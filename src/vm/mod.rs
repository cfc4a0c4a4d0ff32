/*!
  The Yula virtual machine, a stack machine that executes bytecode containers.

  The machine state is a byte addressed memory holding the stack, two general registers `v0` and
  `v1`, the stack base and stack top offsets, the instruction pointer, and the loaded code. Every
  step fetches the record at `ip`, decodes it, and executes it. An instruction either advances
  `ip` by one, overwrites it (jumps), stops the machine (the `exit` syscall), or faults.

  Invariants, at every observable point:
    - `stack_base <= stack_top <= memory_capacity`
    - `ip <= code.len()`; reaching `code.len()` is the normal end of the program.
*/

mod step;
mod syscall;

pub use step::{LineGate, StepGate};
pub use syscall::{Syscall, SyscallTable};

use std::fmt::{Display, Formatter};
use std::io::{self, Write};

use prettytable::{format as TableFormat, Table};
use tracing::{debug, trace, warn};

use crate::bytecode::{try_decode_instruction, Bytecode, DoubleWord, Instruction, Opcode, Word};
use crate::config::Config;
use crate::error::{Fault, LoadError, VmError};
use crate::register::{Register, RegisterId};

/// Width of a stack slot in bytes.
pub const WORD_SIZE: usize = 4;

/// How the machine stopped, when it did not fault.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ExitStatus {
  /// Execution ran off the end of the code.
  Halted,
  /// The `exit` syscall, with the code it was given.
  Exited(Word)
}

impl ExitStatus {
  pub fn code(&self) -> i32 {
    match self {
      ExitStatus::Halted       => 0,
      ExitStatus::Exited(code) => *code
    }
  }
}

/// The outcome of a single step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
  Continue,
  Finished(ExitStatus)
}

/// What an executed instruction does to the instruction pointer.
enum Flow {
  Next,
  Jump(usize),
  Exit(Word)
}

/// Why an instruction did not complete. Turned into a `VmError` once the faulting `ip` is known.
enum Trap {
  Fault(Fault),
  Io(io::Error)
}

impl From<Fault> for Trap {
  fn from(fault: Fault) -> Trap {
    Trap::Fault(fault)
  }
}

impl From<io::Error> for Trap {
  fn from(error: io::Error) -> Trap {
    Trap::Io(error)
  }
}

pub struct Machine<'c> {
  config     : &'c Config,

  // Memory Stores
  memory     : Vec<u8>,          // Grows on demand up to `config.memory_capacity`
  code       : Vec<DoubleWord>,  // Encoded records, decoded on fetch

  // Registers //
  stack_base : usize,
  stack_top  : usize,
  reg0       : Word,
  reg1       : Word,
  ip         : usize,
}

impl<'c> Machine<'c> {

  // region Construction and loading

  pub fn new(config: &'c Config) -> Result<Machine<'c>, VmError> {
    config.validate()?;

    Ok(Machine {
      config,
      memory     : vec![0; config.stack_origin],
      code       : Vec::new(),
      stack_base : config.stack_origin,
      stack_top  : config.stack_origin,
      reg0       : 0,
      reg1       : 0,
      ip         : 0,
    })
  }

  /**
    Copies the records of `bytecode` into the code area and resets the rest of the state. Code
    that does not fit is refused outright, never truncated.
  */
  pub fn load(&mut self, bytecode: &Bytecode) -> Result<(), LoadError> {
    if bytecode.len() > self.config.code_capacity {
      return Err(LoadError::CodeTooLarge {
        count    : bytecode.len(),
        capacity : self.config.code_capacity
      });
    }

    self.code.clear();
    self.code.extend_from_slice(bytecode.records());
    self.reset();

    debug!(instructions = self.code.len(), "bytecode loaded");
    Ok(())
  }

  /// Loads a serialized container, rejecting malformed buffers before anything is loaded.
  pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
    let bytecode = Bytecode::from_bytes(bytes)?;
    self.load(&bytecode)
  }

  /// Restores the initial state, keeping the loaded code.
  pub fn reset(&mut self) {
    self.memory.clear();
    self.memory.resize(self.config.stack_origin, 0);
    self.stack_base = self.config.stack_origin;
    self.stack_top  = self.config.stack_origin;
    self.reg0       = 0;
    self.reg1       = 0;
    self.ip         = 0;
  }

  // endregion

  // region Accessors

  pub fn reg0(&self) -> Word {
    self.reg0
  }

  pub fn reg1(&self) -> Word {
    self.reg1
  }

  pub fn ip(&self) -> usize {
    self.ip
  }

  pub fn stack_base(&self) -> usize {
    self.stack_base
  }

  pub fn stack_top(&self) -> usize {
    self.stack_top
  }

  pub fn code_size(&self) -> usize {
    self.code.len()
  }

  /// The live stack, bottom first.
  pub fn stack(&self) -> Vec<Word> {
    self.memory[self.stack_base..self.stack_top]
      .chunks_exact(WORD_SIZE)
      .map(|chunk| {
        let mut word = [0u8; WORD_SIZE];
        word.copy_from_slice(chunk);
        Word::from_le_bytes(word)
      })
      .collect()
  }

  // endregion

  // region Low-level utility methods

  fn push(&mut self, value: Word) -> Result<(), Fault> {
    let end = self.stack_top + WORD_SIZE;
    if end > self.config.memory_capacity {
      return Err(Fault::StackOverflow);
    }
    if end > self.memory.len() {
      self.memory.resize(end, 0);
    }

    self.memory[self.stack_top..end].copy_from_slice(&value.to_le_bytes());
    self.stack_top = end;
    Ok(())
  }

  fn pop(&mut self) -> Result<Word, Fault> {
    if self.stack_top <= self.stack_base {
      return Err(Fault::StackUnderflow);
    }

    self.stack_top -= WORD_SIZE;
    let mut word = [0u8; WORD_SIZE];
    word.copy_from_slice(&self.memory[self.stack_top..self.stack_top + WORD_SIZE]);
    Ok(Word::from_le_bytes(word))
  }

  fn register(&self, id: RegisterId) -> Result<Word, Fault> {
    match id {
      0 => Ok(self.reg0),
      1 => Ok(self.reg1),
      _ => Err(Fault::IllegalRegister(id))
    }
  }

  fn register_mut(&mut self, id: RegisterId) -> Result<&mut Word, Fault> {
    match id {
      0 => Ok(&mut self.reg0),
      1 => Ok(&mut self.reg1),
      _ => Err(Fault::IllegalRegister(id))
    }
  }

  /// A jump may land anywhere in the code or exactly at its end, which halts normally.
  fn jump_target(&self, address: Word) -> Result<usize, Fault> {
    match usize::try_from(address) {
      Ok(target) if target <= self.code.len() => Ok(target),
      _                                       => Err(Fault::IllegalInstruction)
    }
  }

  /// `None` at the end of the code.
  fn fetch(&self) -> Result<Option<Instruction>, Fault> {
    match self.code.get(self.ip) {
      Some(record) => try_decode_instruction(*record).map(Some).ok_or(Fault::IllegalInstruction),
      None if self.ip == self.code.len() => Ok(None),
      None => Err(Fault::IllegalInstruction)
    }
  }

  // endregion

  // region Execution

  /// Runs until the end of the code, an `exit` syscall, or a fault.
  pub fn run(&mut self, out: &mut dyn Write) -> Result<ExitStatus, VmError> {
    loop {
      if let Step::Finished(status) = self.step(out)? {
        return Ok(status);
      }
    }
  }

  /// Like `run`, but hands a trace of each instruction to `gate` and waits for it before
  /// executing the instruction.
  pub fn run_stepping(&mut self, out: &mut dyn Write, gate: &mut dyn StepGate)
    -> Result<ExitStatus, VmError>
  {
    loop {
      if let Some(trace_line) = self.trace_line() {
        gate.wait(&trace_line)?;
      }
      if let Step::Finished(status) = self.step(out)? {
        return Ok(status);
      }
    }
  }

  /// Executes the instruction at `ip`. Syscall output goes to `out`.
  pub fn step(&mut self, out: &mut dyn Write) -> Result<Step, VmError> {
    let ip = self.ip;

    let outcome =
      match self.fetch() {
        Ok(None)              => return Ok(Step::Finished(ExitStatus::Halted)),
        Ok(Some(instruction)) => {
          trace!(ip, %instruction, "execute");
          self.execute_instruction(instruction, out)
        }
        Err(fault)            => Err(Trap::Fault(fault)),
      };

    match outcome {
      Ok(Flow::Next) => {
        self.ip += 1;
        Ok(Step::Continue)
      }

      Ok(Flow::Jump(target)) => {
        self.ip = target;
        Ok(Step::Continue)
      }

      Ok(Flow::Exit(code)) => {
        debug!(code, "exit syscall");
        Ok(Step::Finished(ExitStatus::Exited(code)))
      }

      Err(Trap::Fault(fault)) => {
        warn!(%fault, ip, "machine fault");
        Err(VmError::Fault { fault, ip })
      }

      Err(Trap::Io(error)) => Err(VmError::Io(error))
    }
  }

  fn execute_instruction(&mut self, instruction: Instruction, out: &mut dyn Write)
    -> Result<Flow, Trap>
  {
    let operand = instruction.operand;

    let flow =
      match instruction.opcode {

        Opcode::PushConst => {
          self.push(operand)?;
          Flow::Next
        }

        Opcode::PushReg => {
          let value = self.register(operand)?;
          self.push(value)?;
          Flow::Next
        }

        Opcode::PopToReg => {
          // Check the register before touching the stack.
          self.register(operand)?;
          let value = self.pop()?;
          *self.register_mut(operand)? = value;
          Flow::Next
        }

        Opcode::MovReg0 => {
          self.reg0 = operand;
          Flow::Next
        }

        Opcode::MovReg1 => {
          self.reg1 = operand;
          Flow::Next
        }

        Opcode::Jump => Flow::Jump(self.jump_target(operand)?),

        Opcode::JumpIndirect => {
          let address = self.pop()?;
          Flow::Jump(self.jump_target(address)?)
        }

        // Capacities are validated to fit in a word, so these casts are lossless.
        Opcode::PushIp => {
          self.push((self.ip + 1) as Word)?;
          Flow::Next
        }

        Opcode::PushBp => {
          self.push(self.stack_base as Word)?;
          Flow::Next
        }

        Opcode::PushSp => {
          self.push(self.stack_top as Word)?;
          Flow::Next
        }

        Opcode::Add => self.binary_operation(|one, two| Ok(one.wrapping_add(two)))?,
        Opcode::Sub => self.binary_operation(|one, two| Ok(one.wrapping_sub(two)))?,
        Opcode::Mul => self.binary_operation(|one, two| Ok(one.wrapping_mul(two)))?,
        Opcode::Div => {
          self.binary_operation(|one, two| {
            match two {
              0 => Err(Fault::DivisionByZero),
              _ => Ok(one.wrapping_div(two))
            }
          })?
        }

        Opcode::Syscall => self.invoke_syscall(out)?,

      };

    Ok(flow)
  }

  /// Pops `two`, then `one`, and pushes `one <op> two`.
  fn binary_operation<F>(&mut self, operation: F) -> Result<Flow, Fault>
    where F: Fn(Word, Word) -> Result<Word, Fault>
  {
    let two    = self.pop()?;
    let one    = self.pop()?;
    let result = operation(one, two)?;

    self.push(result)?;
    Ok(Flow::Next)
  }

  fn invoke_syscall(&mut self, out: &mut dyn Write) -> Result<Flow, Trap> {
    match self.config.syscalls.get(self.reg0) {

      Some(Syscall::Dump) => {
        self.dump_state(out)?;
        Ok(Flow::Next)
      }

      Some(Syscall::Print) => {
        writeln!(out, "{}", self.reg1)?;
        Ok(Flow::Next)
      }

      Some(Syscall::Exit) => Ok(Flow::Exit(self.reg1)),

      None => Err(Trap::Fault(Fault::IllegalSyscall(self.reg0)))

    }
  }

  // endregion

  // region Display methods

  /// Writes the state block of the `dump` syscall.
  pub fn dump_state(&self, stream: &mut dyn Write) -> io::Result<()> {
    writeln!(stream, "dump(YVM_STATE) {{")?;
    writeln!(stream, "    bp: {},", self.stack_base)?;
    writeln!(stream, "    sp: {},", self.stack_top)?;
    writeln!(stream, "    ip: {},", self.ip)?;
    writeln!(stream, "    code_size: {},", self.code.len())?;
    writeln!(stream, "    registers {{")?;
    writeln!(stream, "        v0: {},", self.reg0)?;
    writeln!(stream, "        v1: {}", self.reg1)?;
    writeln!(stream, "    }}")?;
    writeln!(stream, "}}")
  }

  fn register_name(&self, register: Register) -> String {
    match self.config.registers.get_name(&register) {
      Some(name) => name.to_string(),
      None       => register.to_string()
    }
  }

  /**
    Describes the instruction at `ip` for step mode: the address, the instruction, and what its
    operand resolves to. Returns `None` at the end of the code.
  */
  pub fn trace_line(&self) -> Option<String> {
    let record = match self.code.get(self.ip) {
      Some(record) => *record,
      None         => return None
    };

    let description =
      match try_decode_instruction(record) {

        None => format!(".word {} (illegal instruction)", record as u32 as Word),

        Some(instruction @ Instruction { opcode: Opcode::PushReg, operand })
        | Some(instruction @ Instruction { opcode: Opcode::PopToReg, operand }) => {
          format!("{} ({})", instruction, self.register_name(Register::General(operand)))
        }

        Some(instruction @ Instruction { opcode: Opcode::Syscall, .. }) => {
          let meaning =
            match self.config.syscalls.get(self.reg0) {
              Some(syscall) => syscall.to_string(),
              None          => "illegal".to_string()
            };
          format!("{} v0 = {} ({})", instruction, self.reg0, meaning)
        }

        Some(instruction) => instruction.to_string()

      };

    Some(format!("[{:04}] {}", self.ip, description))
  }

  fn make_register_table<T>(
      name      : &str,
      registers : &[(String, T)],
      highlight : Option<usize>
    ) -> Table
    where T: Display
  {
    let mut table = Table::new();

    table.set_format(*TABLE_DISPLAY_FORMAT);
    table.set_titles(row![ubr->name, ubl->"Contents"]);

    for (i, (label, value)) in registers.iter().enumerate() {
      match Some(i) == highlight {
        true  => table.add_row(row![r->format!("* --> {} =", label), value]),
        false => table.add_row(row![r->format!("{} =", label), value]),
      };
    }
    table
  }

  // endregion

}

lazy_static! {
  static ref TABLE_DISPLAY_FORMAT: TableFormat::TableFormat =
    TableFormat::FormatBuilder::new()
      .column_separator('│')
      .borders(' ')
      .separator(
        TableFormat::LinePosition::Title,
        TableFormat::LineSeparator::new('─', '┼', ' ', ' ')
      )
      .separator(
        TableFormat::LinePosition::Bottom,
        TableFormat::LineSeparator::new('─', '┴', ' ', ' ')
      )
      .padding(1, 1)
      .build();
}

impl<'c> Display for Machine<'c> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    let registers = vec![
      (self.register_name(Register::General(0)), self.reg0 as i64),
      (self.register_name(Register::General(1)), self.reg1 as i64),
      (self.register_name(Register::InstructionPointer), self.ip as i64),
      (self.register_name(Register::BasePointer), self.stack_base as i64),
      (self.register_name(Register::StackPointer), self.stack_top as i64),
    ];
    let stack: Vec<(String, Word)> =
      self.stack()
          .into_iter()
          .enumerate()
          .map(|(i, word)| (format!("[{}]", self.stack_base + i * WORD_SIZE), word))
          .collect();
    let top = stack.len().checked_sub(1);

    let r_table = Machine::make_register_table("Register", &registers, None);
    let s_table = Machine::make_register_table("Offset", &stack, top);

    let mut combined_table = table!([r_table, s_table]);

    combined_table.set_titles(row![ub->"Registers", ub->"Stack"]);
    combined_table.set_format(*TABLE_DISPLAY_FORMAT);

    write!(f, "Code size: {}\n{}", self.code.len(), combined_table)
  }
}

/// Loads `bytecode` into a fresh machine and runs it to completion.
pub fn execute(bytecode: &Bytecode, config: &Config, out: &mut dyn Write)
  -> Result<ExitStatus, VmError>
{
  let mut machine = Machine::new(config)?;
  machine.load(bytecode)?;
  machine.run(out)
}

/// Like `execute`, for a serialized container.
pub fn execute_bytes(bytes: &[u8], config: &Config, out: &mut dyn Write)
  -> Result<ExitStatus, VmError>
{
  let mut machine = Machine::new(config)?;
  machine.load_bytes(bytes)?;
  machine.run(out)
}

#[cfg(test)]
mod tests;
