//! The `yula` command line tool.
//!
//! Usage:
//!   `yula asm <input.yasm> [-o out.bin] [--listing]`
//!   `yula run <input.bin> [--step] [--code-capacity N] [--memory-capacity N] [--stack-origin N]`
//!   `yula disasm <input.bin>`

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use yula::bytecode::assembly::render_listing;
use yula::vm::LineGate;
use yula::{assemble, Bytecode, Config, Machine, VmError};

#[derive(Parser, Debug)]
#[command(name = "yula")]
#[command(about = "Assemble and run Yula bytecode")]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Assemble a source file into a bytecode container
  Asm {
    /// Assembly source
    input: PathBuf,

    /// Where to write the container
    #[arg(short, long, default_value = "out.bin")]
    output: PathBuf,

    /// Print the assembly listing to stdout
    #[arg(long)]
    listing: bool,
  },

  /// Execute a bytecode container
  Run {
    /// Bytecode container
    input: PathBuf,

    /// Trace each instruction and wait for a line on stdin before executing it
    #[arg(long)]
    step: bool,

    /// Instructions the code area holds
    #[arg(long)]
    code_capacity: Option<usize>,

    /// Bytes of machine memory
    #[arg(long)]
    memory_capacity: Option<usize>,

    /// Byte offset in memory where the stack starts
    #[arg(long)]
    stack_origin: Option<usize>,
  },

  /// Print the listing of a bytecode container
  Disasm {
    /// Bytecode container
    input: PathBuf,
  },
}

fn init_logging() {
  let filter =
    EnvFilter::try_from_env("YULA_LOG")
      .or_else(|_| EnvFilter::try_from_default_env())
      .unwrap_or_else(|_| EnvFilter::new("warn"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .with_target(false)
    .init();
}

fn main() {
  init_logging();

  let args = Args::parse();

  let code =
    match args.command {
      Command::Asm { input, output, listing } => assemble_file(&input, &output, listing),

      Command::Run { input, step, code_capacity, memory_capacity, stack_origin } => {
        let mut config = Config::default();
        if let Some(capacity) = code_capacity {
          config = config.with_code_capacity(capacity);
        }
        if let Some(capacity) = memory_capacity {
          config = config.with_memory_capacity(capacity);
        }
        if let Some(origin) = stack_origin {
          config = config.with_stack_origin(origin);
        }
        run_file(&input, &config, step)
      }

      Command::Disasm { input } => disassemble_file(&input),
    };

  process::exit(code);
}

fn assemble_file(input: &Path, output: &Path, listing: bool) -> i32 {
  let source =
    match fs::read_to_string(input) {
      Ok(source) => source,
      Err(e) => {
        error!("Error reading file '{}': {}", input.display(), e);
        return 1;
      }
    };

  let config = Config::default();
  let compilation =
    match assemble(&source, &input.display().to_string(), &config) {
      Ok(compilation) => compilation,
      Err(e) => {
        eprintln!("{}", e);
        return 1;
      }
    };

  if listing {
    print!("{}", compilation.listing());
  }

  let bytecode = compilation.bytecode();
  if let Err(e) = bytecode.write(output) {
    error!("Error writing file '{}': {}", output.display(), e);
    return 1;
  }

  info!(
    "Wrote {} instructions ({} bytes) to {}",
    bytecode.len(),
    bytecode.size_in_bytes(),
    output.display()
  );
  0
}

fn run_file(input: &Path, config: &Config, step: bool) -> i32 {
  let bytes =
    match fs::read(input) {
      Ok(bytes) => bytes,
      Err(e) => {
        error!("Error reading file '{}': {}", input.display(), e);
        return 1;
      }
    };

  let mut machine =
    match Machine::new(config) {
      Ok(machine) => machine,
      Err(e) => {
        eprintln!("{}", e);
        return 1;
      }
    };

  if let Err(e) = machine.load_bytes(&bytes) {
    eprintln!("{}: {}", input.display(), e);
    return 1;
  }

  let stdout = io::stdout();
  let mut out = stdout.lock();

  let result =
    match step {
      true => {
        let stdin = io::stdin();
        let mut gate = LineGate::new(stdin.lock(), io::stderr());
        machine.run_stepping(&mut out, &mut gate)
      }
      false => machine.run(&mut out),
    };
  let _ = out.flush();

  match result {
    Ok(status) => status.code(),

    Err(VmError::Fault { fault, ip }) => {
      eprintln!("SIGNAL: {} (ip = {})", fault, ip);
      eprintln!("{}", machine);
      1
    }

    Err(e) => {
      eprintln!("{}", e);
      1
    }
  }
}

fn disassemble_file(input: &Path) -> i32 {
  match Bytecode::read(input) {
    Ok(bytecode) => {
      print!("{}", render_listing(&bytecode, &[]));
      0
    }
    Err(e) => {
      eprintln!("{}: {}", input.display(), e);
      1
    }
  }
}
