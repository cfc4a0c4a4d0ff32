//! Single-step execution. Before each instruction the machine hands a trace line to a
//! `StepGate`, which decides when execution may go on. Stepping changes the pacing of execution,
//! never its semantics.

use std::io::{self, BufRead, Write};

pub trait StepGate {
  /// Called with the trace of the instruction about to execute. Returns once it may execute.
  fn wait(&mut self, trace_line: &str) -> io::Result<()>;
}

/**
  Writes each trace line to `output`, then blocks until a line arrives on `input`. Once `input`
  is exhausted the gate stays open and only traces.
*/
pub struct LineGate<R: BufRead, W: Write> {
  input    : R,
  output   : W,
  released : bool,
}

impl<R: BufRead, W: Write> LineGate<R, W> {
  pub fn new(input: R, output: W) -> LineGate<R, W> {
    LineGate {
      input,
      output,
      released: false
    }
  }

  pub fn is_released(&self) -> bool {
    self.released
  }
}

impl<R: BufRead, W: Write> StepGate for LineGate<R, W> {
  fn wait(&mut self, trace_line: &str) -> io::Result<()> {
    writeln!(self.output, "{}", trace_line)?;
    self.output.flush()?;

    if !self.released {
      let mut line = String::new();
      if self.input.read_line(&mut line)? == 0 {
        self.released = true;
      }
    }
    Ok(())
  }
}
