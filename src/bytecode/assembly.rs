/*!
  The human readable textual form of bytecode. A listing shows one record per line with its
  address, the decoded instruction, and the encoded record, with label definitions interleaved
  where they point:
  ```text
  main:
      0: MOV_REG0 0                 %  0x0000000000000003
  ```
  Records with an undefined opcode are shown as raw words so that corrupt binaries can still be
  inspected.
*/

use std::fmt::Write;

use string_cache::DefaultAtom;

use crate::bytecode::{Bytecode, try_decode_instruction};

/// Renders a listing of `bytecode`. `labels` pairs label names with the address they name, in
/// any order.
pub fn render_listing(bytecode: &Bytecode, labels: &[(DefaultAtom, usize)]) -> String {
  let mut sorted_labels: Vec<&(DefaultAtom, usize)> = labels.iter().collect();
  sorted_labels.sort_by_key(|(_, address)| *address);
  let mut pending = sorted_labels.into_iter().peekable();

  let mut buffer = String::new();

  for (address, record) in bytecode.records().iter().enumerate() {
    while let Some((name, _)) = pending.next_if(|(_, label_address)| *label_address == address) {
      // Writing into a `String` cannot fail.
      let _ = writeln!(buffer, "{}:", name);
    }

    let text =
      match try_decode_instruction(*record) {
        Some(instruction) => format!("{:>5}: {}", address, instruction),
        None              => format!("{:>5}: .word {}", address, *record as u32 as i32),
      };
    let _ = writeln!(buffer, "{:30}% {:#018x}", text, record);
  }

  // Labels may point one past the last instruction.
  for (name, _) in pending {
    let _ = writeln!(buffer, "{}:", name);
  }

  buffer
}
