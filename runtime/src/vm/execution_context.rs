use std::fmt;
use crate::bytecode::{Instruction, Program};
use crate::utils::{Cursor, CursorError};

/// Snapshot of the machine, handed to breakpoint observers and hosts
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MachineState {
    pub accumulator: i64,
    pub stack: Vec<i64>,
    pub cursor: usize,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A: {} S: {:?} Index: {}", self.accumulator, self.stack, self.cursor)
    }
}

/// Mutable state of one running program: accumulator, stack and instruction cursor
pub struct ExecutionContext {
    cursor: Cursor<Instruction>,
    accumulator: i64,
    stack: Vec<i64>,
}

impl ExecutionContext {
    pub fn new(program: &Program) -> Self {
        Self {
            cursor: program.cursor(),
            accumulator: 0,
            stack: Vec::new(),
        }
    }

    /// Index of the next instruction to execute
    pub fn pc(&self) -> usize {
        self.cursor.position()
    }

    /// Read the next instruction and advance past it
    pub fn next_instruction(&mut self) -> Result<Instruction, CursorError> {
        self.cursor.read().cloned()
    }

    /// Set the cursor directly; `target == len` means "at end"
    pub fn jump_to(&mut self, target: usize) -> Result<(), CursorError> {
        self.cursor.jump_to(target)
    }

    pub fn has_more_instructions(&self) -> bool {
        !self.cursor.at_end()
    }

    pub fn program_len(&self) -> usize {
        self.cursor.len()
    }

    pub fn accumulator(&self) -> i64 {
        self.accumulator
    }

    pub fn set_accumulator(&mut self, value: i64) {
        self.accumulator = value;
    }

    pub fn accumulate(&mut self, amount: i64) {
        self.accumulator = self.accumulator.wrapping_add(amount);
    }

    pub fn push(&mut self, value: i64) {
        self.stack.push(value);
    }

    /// Pop the top of the stack; an empty stack yields 0
    pub fn pop_or_zero(&mut self) -> i64 {
        self.stack.pop().unwrap_or(0)
    }

    pub fn clear_stack(&mut self) {
        self.stack.clear();
    }

    pub fn stack(&self) -> &[i64] {
        &self.stack
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Rewind to the first instruction with a zeroed accumulator and empty stack
    pub fn reset(&mut self) {
        let position = self.cursor.position();
        self.cursor.unread_by(position);
        self.accumulator = 0;
        self.stack.clear();
    }

    pub fn snapshot(&self) -> MachineState {
        MachineState {
            accumulator: self.accumulator,
            stack: self.stack.clone(),
            cursor: self.pc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{OpCode, Operand};

    fn create_test_context() -> ExecutionContext {
        let program = Program::from_instructions(vec![
            Instruction::new(OpCode::Accumulate).with_operand(Operand::Literal(1)),
            Instruction::new(OpCode::OutputNumber),
        ]);
        ExecutionContext::new(&program)
    }

    #[test]
    fn test_context_creation() {
        let context = create_test_context();
        assert_eq!(context.pc(), 0);
        assert_eq!(context.accumulator(), 0);
        assert_eq!(context.stack_depth(), 0);
        assert_eq!(context.program_len(), 2);
        assert!(context.has_more_instructions());
    }

    #[test]
    fn test_next_instruction_advances() {
        let mut context = create_test_context();
        assert_eq!(context.next_instruction().unwrap().opcode, OpCode::Accumulate);
        assert_eq!(context.pc(), 1);
        assert_eq!(context.next_instruction().unwrap().opcode, OpCode::OutputNumber);
        assert!(!context.has_more_instructions());
        assert!(context.next_instruction().is_err());
    }

    #[test]
    fn test_stack_operations() {
        let mut context = create_test_context();
        context.push(10);
        context.push(20);
        assert_eq!(context.stack(), &[10, 20]);
        assert_eq!(context.pop_or_zero(), 20);
        assert_eq!(context.pop_or_zero(), 10);
        assert_eq!(context.pop_or_zero(), 0);

        context.push(1);
        context.clear_stack();
        assert_eq!(context.stack_depth(), 0);
    }

    #[test]
    fn test_accumulate_wraps() {
        let mut context = create_test_context();
        context.set_accumulator(i64::MAX);
        context.accumulate(1);
        assert_eq!(context.accumulator(), i64::MIN);
    }

    #[test]
    fn test_jump_bounds() {
        let mut context = create_test_context();
        assert!(context.jump_to(2).is_ok());
        assert!(!context.has_more_instructions());
        assert!(context.jump_to(3).is_err());
        assert_eq!(context.pc(), 2);
    }

    #[test]
    fn test_reset_and_snapshot() {
        let mut context = create_test_context();
        context.next_instruction().unwrap();
        context.set_accumulator(7);
        context.push(3);

        let state = context.snapshot();
        assert_eq!(state, MachineState { accumulator: 7, stack: vec![3], cursor: 1 });
        assert_eq!(state.to_string(), "A: 7 S: [3] Index: 1");

        context.reset();
        assert_eq!(context.snapshot(), MachineState::default());
    }
}
