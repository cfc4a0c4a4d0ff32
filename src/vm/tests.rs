use indoc::indoc;
use pretty_assertions::assert_eq;

use super::*;
use crate::error::{ConfigError, FormatError};
use crate::test_utils::init_test_logging;

fn machine_with<'c>(config: &'c Config, code: &[Instruction]) -> Machine<'c> {
  init_test_logging();
  let mut machine = Machine::new(config).unwrap();
  machine.load(&Bytecode::from_instructions(code)).unwrap();
  machine
}

fn push(value: Word) -> Instruction {
  Instruction::new(Opcode::PushConst, value)
}

fn op(opcode: Opcode) -> Instruction {
  Instruction::nullary(opcode)
}

/// Runs `code` with the default configuration and returns the final stack.
fn final_stack(code: &[Instruction]) -> Vec<Word> {
  let config = Config::default();
  let mut machine = machine_with(&config, code);
  assert_eq!(machine.run(&mut io::sink()).unwrap(), ExitStatus::Halted);
  machine.stack()
}

fn fault_of(config: &Config, code: &[Instruction]) -> (Fault, usize) {
  let mut machine = machine_with(config, code);
  match machine.run(&mut io::sink()) {
    Err(VmError::Fault { fault, ip }) => (fault, ip),
    other => panic!("expected a fault, got {:?}", other),
  }
}

#[test]
fn fresh_machine_state() {
  let config = Config::default();
  let machine = machine_with(&config, &[]);

  assert_eq!(machine.ip(), 0);
  assert_eq!(machine.stack_base(), 21000);
  assert_eq!(machine.stack_top(), 21000);
  assert_eq!((machine.reg0(), machine.reg1()), (0, 0));
  assert!(machine.stack().is_empty());
}

#[test]
fn empty_code_halts_immediately() {
  assert_eq!(
    execute(&Bytecode::new(), &Config::default(), &mut io::sink()).unwrap(),
    ExitStatus::Halted
  );
}

#[test]
fn arithmetic_operand_order() {
  assert_eq!(final_stack(&[push(10), push(3), op(Opcode::Sub)]), vec![7]);
  assert_eq!(final_stack(&[push(3), push(10), op(Opcode::Sub)]), vec![-7]);
  assert_eq!(final_stack(&[push(7), push(2), op(Opcode::Div)]), vec![3]);
  assert_eq!(final_stack(&[push(-7), push(2), op(Opcode::Div)]), vec![-3]);
  assert_eq!(final_stack(&[push(6), push(7), op(Opcode::Mul), push(1), op(Opcode::Add)]), vec![43]);
}

#[test]
fn arithmetic_wraps() {
  assert_eq!(final_stack(&[push(i32::MAX), push(1), op(Opcode::Add)]), vec![i32::MIN]);
  assert_eq!(final_stack(&[push(i32::MIN), push(-1), op(Opcode::Div)]), vec![i32::MIN]);
}

#[test]
fn division_by_zero_faults() {
  let config = Config::default();
  assert_eq!(
    fault_of(&config, &[push(1), push(0), op(Opcode::Div)]),
    (Fault::DivisionByZero, 2)
  );
}

#[test]
fn stack_underflow() {
  let config = Config::default();
  assert_eq!(
    fault_of(&config, &[Instruction::new(Opcode::PopToReg, 0)]),
    (Fault::StackUnderflow, 0)
  );
  assert_eq!(fault_of(&config, &[push(1), op(Opcode::Add)]), (Fault::StackUnderflow, 1));
  assert_eq!(fault_of(&config, &[op(Opcode::JumpIndirect)]), (Fault::StackUnderflow, 0));
}

#[test]
fn stack_overflow_at_memory_capacity() {
  let config = Config::default().with_memory_capacity(8).with_stack_origin(0);
  assert_eq!(fault_of(&config, &[push(1), push(2), push(3)]), (Fault::StackOverflow, 2));
}

#[test]
fn registers_round_trip_through_the_stack() {
  let config = Config::default();
  let mut machine = machine_with(&config, &[
    Instruction::new(Opcode::MovReg0, 11),
    Instruction::new(Opcode::PushReg, 0),
    Instruction::new(Opcode::PopToReg, 1),
  ]);
  machine.run(&mut io::sink()).unwrap();

  assert_eq!((machine.reg0(), machine.reg1()), (11, 11));
  assert_eq!(machine.stack_top(), machine.stack_base());
}

#[test]
fn illegal_register_leaves_the_stack_alone() {
  let config = Config::default();
  let mut machine = machine_with(&config, &[push(5), Instruction::new(Opcode::PopToReg, 2)]);

  assert_eq!(
    machine.run(&mut io::sink()).unwrap_err().fault(),
    Some(Fault::IllegalRegister(2))
  );
  assert_eq!(machine.stack(), vec![5]);
  assert_eq!(machine.ip(), 1);
}

#[test]
fn pseudo_registers() {
  assert_eq!(
    final_stack(&[op(Opcode::PushSp), op(Opcode::PushBp), op(Opcode::PushIp)]),
    vec![21000, 21000, 3]
  );
}

#[test]
fn jumps() {
  let config = Config::default();

  // Jumping to the end of the code halts normally.
  assert_eq!(final_stack(&[Instruction::new(Opcode::Jump, 2), push(1)]), Vec::<Word>::new());
  assert_eq!(final_stack(&[push(3), op(Opcode::JumpIndirect), push(1), push(2)]), vec![2]);

  assert_eq!(fault_of(&config, &[Instruction::new(Opcode::Jump, 2)]), (Fault::IllegalInstruction, 0));
  assert_eq!(fault_of(&config, &[Instruction::new(Opcode::Jump, -1)]), (Fault::IllegalInstruction, 0));
}

#[test]
fn undefined_opcode_faults_when_fetched() {
  let config = Config::default();
  let mut machine = Machine::new(&config).unwrap();
  let bad_record: DoubleWord = 99;
  machine.load(&Bytecode::from_records(vec![
    crate::bytecode::encode_instruction(&push(1)),
    bad_record,
  ])).unwrap();

  match machine.run(&mut io::sink()) {
    Err(VmError::Fault { fault: Fault::IllegalInstruction, ip: 1 }) => {}
    other => panic!("expected an illegal instruction at 1, got {:?}", other),
  }
  assert_eq!(machine.stack(), vec![1]);
}

#[test]
fn print_and_exit_syscalls() {
  let config = Config::default();
  let mut machine = machine_with(&config, &[
    Instruction::new(Opcode::MovReg0, 1),
    Instruction::new(Opcode::MovReg1, 42),
    op(Opcode::Syscall),
    Instruction::new(Opcode::MovReg0, 2),
    Instruction::new(Opcode::MovReg1, 3),
    op(Opcode::Syscall),
    push(99),
  ]);
  let mut out = Vec::new();

  let status = machine.run(&mut out).unwrap();
  assert_eq!(status, ExitStatus::Exited(3));
  assert_eq!(status.code(), 3);
  assert_eq!(String::from_utf8(out).unwrap(), "42\n");
  assert!(machine.stack().is_empty());
}

#[test]
fn dump_syscall() {
  let config = Config::default();
  let mut machine = machine_with(&config, &[push(8), op(Opcode::Syscall)]);
  let mut out = Vec::new();

  machine.run(&mut out).unwrap();
  assert_eq!(
    String::from_utf8(out).unwrap(),
    indoc! {"
      dump(YVM_STATE) {
          bp: 21000,
          sp: 21004,
          ip: 1,
          code_size: 2,
          registers {
              v0: 0,
              v1: 0
          }
      }
    "}
  );
}

#[test]
fn unknown_and_withheld_syscalls() {
  let config = Config::default();
  assert_eq!(
    fault_of(&config, &[Instruction::new(Opcode::MovReg0, 7), op(Opcode::Syscall)]),
    (Fault::IllegalSyscall(7), 1)
  );

  let config = Config::default().with_syscalls(SyscallTable::default().without(Syscall::Exit));
  assert_eq!(
    fault_of(&config, &[Instruction::new(Opcode::MovReg0, 2), op(Opcode::Syscall)]),
    (Fault::IllegalSyscall(2), 1)
  );
}

#[test]
fn code_capacity_is_enforced_at_load() {
  let config = Config::default().with_code_capacity(2);
  let mut machine = Machine::new(&config).unwrap();

  assert_eq!(
    machine.load(&Bytecode::from_instructions(&[push(1), push(2), push(3)])),
    Err(LoadError::CodeTooLarge { count: 3, capacity: 2 })
  );
  assert_eq!(machine.code_size(), 0);
  assert!(machine.load(&Bytecode::from_instructions(&[push(1), push(2)])).is_ok());
}

#[test]
fn malformed_containers_are_not_loaded() {
  let config = Config::default();
  match execute_bytes(b"XM\0\0\0\0\0\0", &config, &mut io::sink()) {
    Err(VmError::Load(LoadError::Format(FormatError::BadMagic { found }))) => {
      assert_eq!(&found, b"XM");
    }
    other => panic!("expected a format error, got {:?}", other),
  }
}

#[test]
fn invalid_configuration() {
  let config = Config::default().with_memory_capacity(100);
  match Machine::new(&config) {
    Err(VmError::Config(ConfigError::StackOriginOutOfBounds { origin: 21000, capacity: 100 })) => {}
    Err(other) => panic!("expected a configuration error, got {:?}", other),
    Ok(_)      => panic!("expected a configuration error"),
  }
}

#[test]
fn reset_keeps_code() {
  let config = Config::default();
  let mut machine = machine_with(&config, &[Instruction::new(Opcode::MovReg1, 4), push(1)]);
  machine.run(&mut io::sink()).unwrap();
  machine.reset();

  assert_eq!((machine.ip(), machine.reg1(), machine.stack().len()), (0, 0, 0));
  assert_eq!(machine.code_size(), 2);
  assert_eq!(machine.run(&mut io::sink()).unwrap(), ExitStatus::Halted);
  assert_eq!(machine.reg1(), 4);
}

#[test]
fn stepping_traces_every_instruction() {
  let config = Config::default();
  let code = [
    Instruction::new(Opcode::MovReg1, 5),
    Instruction::new(Opcode::MovReg0, 1),
    op(Opcode::Syscall),
  ];

  let mut stepped = machine_with(&config, &code);
  let mut traces = Vec::new();
  let mut out = Vec::new();
  {
    // One line of input, then end of input releases the gate.
    let mut gate = LineGate::new(&b"\n"[..], &mut traces);
    assert_eq!(stepped.run_stepping(&mut out, &mut gate).unwrap(), ExitStatus::Halted);
    assert!(gate.is_released());
  }

  assert_eq!(
    String::from_utf8(traces).unwrap(),
    indoc! {"
      [0000] MOV_REG1 5
      [0001] MOV_REG0 1
      [0002] SYSCALL v0 = 1 (print)
    "}
  );

  // Stepping never changes what the program does.
  let mut free = machine_with(&config, &code);
  let mut free_out = Vec::new();
  free.run(&mut free_out).unwrap();
  assert_eq!(out, free_out);
  assert_eq!(String::from_utf8(out).unwrap(), "5\n");
}

#[test]
fn trace_line_names_registers() {
  let config = Config::default();
  let machine = machine_with(&config, &[Instruction::new(Opcode::PopToReg, 1)]);
  assert_eq!(machine.trace_line().as_deref(), Some("[0000] POP_TO_REG 1 (v1)"));
}

#[test]
fn state_table() {
  let config = Config::default();
  let mut machine = machine_with(&config, &[push(12), push(34)]);
  machine.run(&mut io::sink()).unwrap();

  let text = machine.to_string();
  assert!(text.starts_with("Code size: 2\n"));
  assert!(text.contains("Registers"));
  assert!(text.contains("Stack"));
  assert!(text.contains("* --> [21004] ="));
  assert!(text.contains("34"));
}
