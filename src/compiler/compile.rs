/*!
  Functions to produce a compilation artifact from a parsed program.

  The compilation pipeline is this:
  ```text
  text -> [`tokenize`] -> `Token`s -> [`parse`] -> `Program` -> [`compile`] -> `Compilation`
  ```
  Code generation is a single walk over the statements. Labels get the address of the next
  instruction emitted. A jump to a label that is already defined gets its address right away;
  a jump to a label defined further down is emitted with a zero operand and remembered. Once
  every statement is emitted, each remembered jump is patched in place.
*/

use std::time::Instant;

use string_cache::DefaultAtom;
use tracing::{debug, info, trace};

use super::ast::{Operand, Program, Statement};
use super::lexer::tokenize;
use super::parser::parse;
use super::symboltable::{Label, SymbolTable, UnresolvedReference};
use crate::bytecode::{assembly::render_listing, Bytecode, Instruction, Opcode, Word};
use crate::config::Config;
use crate::error::{CompileError, Location};
use crate::register::Register;

/// A `Compilation` is the result of `compile` and holds the fully resolved code together with
/// the labels that were defined in it.
#[derive(Clone, Debug)]
pub struct Compilation {
  pub code            : Vec<Instruction>,
  pub labels          : SymbolTable,
  /// The label named by the `entry` directive.
  pub entry           : DefaultAtom,
  /// Whether the program transfers control to a label other than through `entry`.
  pub has_jump_target : bool,
}

impl Compilation {
  pub fn bytecode(&self) -> Bytecode {
    Bytecode::from_instructions(&self.code)
  }

  /// The address execution actually begins at after the initial jump.
  pub fn entry_address(&self) -> Option<usize> {
    self.labels.get_address(&self.entry)
  }

  /// A human readable listing of the code with labels interleaved.
  pub fn listing(&self) -> String {
    render_listing(&self.bytecode(), &self.labels.addresses())
  }
}

/// Tokenizes, parses and compiles `source`. `file` only labels error locations.
pub fn assemble(source: &str, file: &str, config: &Config) -> Result<Compilation, CompileError> {
  let tokens = tokenize(source, file)?;
  debug!(tokens = tokens.len(), file, "tokenized");
  let program = parse(tokens)?;
  compile(&program, config)
}

/**
  Generates code for `program`. Either every jump is resolved and exactly one entry point was
  declared, or an error is returned; no partial artifact escapes.
*/
pub fn compile(program: &Program, config: &Config) -> Result<Compilation, CompileError> {
  let start_time = Instant::now();

  let mut generator = Generator {
    config,
    code            : Vec::new(),
    labels          : SymbolTable::new(),
    references      : Vec::new(),
    entry           : None,
    has_jump_target : false,
  };

  for statement in program.statements.iter() {
    generator.gen_statement(statement)?;
  }
  generator.resolve()?;

  let entry =
    match generator.entry {
      Some((label, _)) => label,
      None             => return Err(CompileError::NoEntryPoint)
    };

  info!(
    instructions = generator.code.len(),
    labels = generator.labels.len(),
    elapsed = ?start_time.elapsed(),
    "compiled"
  );

  Ok(Compilation {
    code            : generator.code,
    labels          : generator.labels,
    entry,
    has_jump_target : generator.has_jump_target,
  })
}

struct Generator<'c> {
  config          : &'c Config,
  code            : Vec<Instruction>,
  labels          : SymbolTable,
  references      : Vec<UnresolvedReference>,
  entry           : Option<(DefaultAtom, Location)>,
  has_jump_target : bool,
}

impl<'c> Generator<'c> {

  fn gen_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
    trace!(%statement, address = self.code.len(), "generate");

    match statement {

      Statement::Push { operand, location } => {
        match operand {
          Operand::Integer { text, location } => {
            let value = parse_literal(text, location)?;
            self.emit(Instruction::new(Opcode::PushConst, value), location)
          }

          Operand::Register { name, location } => {
            let instruction =
              match self.resolve_register(name, location)? {
                Register::General(id)        => Instruction::new(Opcode::PushReg, id),
                Register::InstructionPointer => Instruction::nullary(Opcode::PushIp),
                Register::BasePointer        => Instruction::nullary(Opcode::PushBp),
                Register::StackPointer       => Instruction::nullary(Opcode::PushSp),
              };
            self.emit(instruction, location)
          }

          // Pushing a label name transfers control to it.
          Operand::Identifier { name, .. } => {
            self.has_jump_target = true;
            self.emit_jump(name, location)
          }
        }
      }

      Statement::Pop { register, location } => {
        let id = self.writable_register(register, "pop")?;
        self.emit(Instruction::new(Opcode::PopToReg, id), location)
      }

      Statement::Mov { target, value, location } => {
        let id = self.writable_register(target, "mov")?;
        let opcode =
          match id {
            0 => Opcode::MovReg0,
            1 => Opcode::MovReg1,
            _ => {
              return Err(CompileError::TypeMismatch {
                location : target.location().clone(),
                message  : format!("`mov` cannot write register `{}`", target)
              });
            }
          };

        let literal =
          match value {
            Operand::Integer { text, location } => parse_literal(text, location)?,
            _ => {
              return Err(CompileError::TypeMismatch {
                location : value.location().clone(),
                message  : format!("right operand of `mov` must be an integer literal, but got `{}`", value)
              });
            }
          };

        self.emit(Instruction::new(opcode, literal), location)
      }

      Statement::Syscall { location } => self.emit(Instruction::nullary(Opcode::Syscall), location),

      Statement::Arithmetic { operator, location } => {
        self.emit(Instruction::nullary(operator.opcode()), location)
      }

      Statement::JumpIndirect { location } => {
        self.emit(Instruction::nullary(Opcode::JumpIndirect), location)
      }

      Statement::Label { name, location } => {
        let label = Label {
          name     : name.clone(),
          address  : self.code.len(),
          location : location.clone()
        };
        debug!(label = %name, address = label.address, "label defined");
        self.labels.insert(label)
      }

      Statement::Jump { target, location } => {
        self.has_jump_target = true;
        self.emit_jump(target, location)
      }

      Statement::Entry { label, location } => {
        if let Some((_, first)) = &self.entry {
          return Err(CompileError::DuplicateEntryPoint {
            location : location.clone(),
            first    : first.clone()
          });
        }
        self.entry = Some((label.clone(), location.clone()));
        self.emit_jump(label, location)
      }
    }
  }

  /// Appends `instruction` unless the program is already at the instruction limit.
  fn emit(&mut self, instruction: Instruction, location: &Location) -> Result<(), CompileError> {
    if self.code.len() >= self.config.max_instructions {
      return Err(CompileError::TooManyInstructions {
        capacity : self.config.max_instructions,
        location : location.clone()
      });
    }
    self.code.push(instruction);
    Ok(())
  }

  /// Emits a `JUMP` to `symbol`, resolved now if the label is already defined and remembered for
  /// patching otherwise.
  fn emit_jump(&mut self, symbol: &DefaultAtom, location: &Location) -> Result<(), CompileError> {
    match self.labels.get_address(symbol) {
      Some(address) => {
        debug!(site = self.code.len(), %symbol, address, "resolved");
        self.emit(Instruction::new(Opcode::Jump, address as Word), location)
      }

      None => {
        self.references.push(UnresolvedReference {
          patch_site : self.code.len(),
          symbol     : symbol.clone(),
          location   : location.clone()
        });
        self.emit(Instruction::new(Opcode::Jump, 0), location)
      }
    }
  }

  /// Patches every forward reference. The first one naming an undefined label is an error.
  fn resolve(&mut self) -> Result<(), CompileError> {
    for reference in self.references.drain(..) {
      match self.labels.get_address(&reference.symbol) {
        Some(address) => {
          debug!(
            site = reference.patch_site,
            symbol = %reference.symbol,
            address,
            deferred = true,
            "resolved"
          );
          self.code[reference.patch_site].operand = address as Word;
        }

        None => {
          return Err(CompileError::UndefinedSymbol {
            symbol   : reference.symbol,
            location : reference.location
          });
        }
      }
    }
    Ok(())
  }

  fn resolve_register(&self, name: &DefaultAtom, location: &Location) -> Result<Register, CompileError> {
    self.config.registers.get_register(name).ok_or_else(|| {
      CompileError::TypeMismatch {
        location : location.clone(),
        message  : format!("unknown register `{}`", name)
      }
    })
  }

  /// The id of the general register named by `operand`, which `mnemonic` writes to.
  fn writable_register(&self, operand: &Operand, mnemonic: &str) -> Result<Word, CompileError> {
    let register =
      match operand {
        Operand::Register { name, location } => self.resolve_register(name, location)?,
        _ => {
          return Err(CompileError::TypeMismatch {
            location : operand.location().clone(),
            message  : format!("`{}` expects a register, but got `{}`", mnemonic, operand)
          });
        }
      };

    register.general_id().ok_or_else(|| {
      CompileError::TypeMismatch {
        location : operand.location().clone(),
        message  : format!("`{}` cannot write the pseudo-register `{}`", mnemonic, register)
      }
    })
  }
}

fn parse_literal(text: &str, location: &Location) -> Result<Word, CompileError> {
  text.parse::<Word>().map_err(|_| {
    CompileError::InvalidLiteral {
      location : location.clone(),
      text     : text.to_string()
    }
  })
}
